//! Store error types

/// Credential could not be used to obtain an access token
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Malformed service account credential: {0}")]
    MalformedCredential(#[source] serde_json::Error),

    #[error("Service account credential is missing `{0}`")]
    MissingField(&'static str),

    #[error("Invalid service account private key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to sign token assertion: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Token request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Token endpoint rejected credential (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to parse token response: {0}")]
    Parse(#[source] reqwest::Error),
}

/// Transport-level failure talking to the Sheets API
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(#[source] reqwest::Error),
}

/// Startup failure opening the configured spreadsheet
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid spreadsheet locator: {0:?}")]
    Locator(String),

    #[error("Invalid Sheets API base URL: {0:?}")]
    ApiBase(String),

    #[error("Failed to open spreadsheet: {0}")]
    Spreadsheet(StoreError),

    #[error("Spreadsheet has no sheets")]
    NoSheets,
}

impl From<StoreError> for ConnectError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Auth(auth) => ConnectError::Auth(auth),
            other => ConnectError::Spreadsheet(other),
        }
    }
}

/// Reading the inventory failed
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read sheet: {0}")]
    Store(#[from] StoreError),

    #[error("Header row is missing column `{0}`")]
    MissingColumn(&'static str),

    #[error("Row {row} has an invalid quantity: {value:?}")]
    InvalidQuantity { row: usize, value: String },
}

/// Writing the inventory failed. There is no partial-write protection, so the
/// variant tells which state the shared sheet was left in.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Failed to clear sheet, shared copy left unchanged: {0}")]
    Clear(#[source] StoreError),

    #[error("Sheet was cleared but rows could not be written: {0}")]
    Write(#[source] StoreError),
}
