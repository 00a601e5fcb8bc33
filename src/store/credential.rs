//! Service account credential parsing

use std::fmt;

use jsonwebtoken::EncodingKey;
use serde::Deserialize;

use super::error::AuthError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Service account key as downloaded from the cloud console.
/// Unknown fields are ignored.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse a credential JSON document.
    ///
    /// Keys pasted through secret managers often arrive with `\n` escaped as a
    /// literal backslash-n; those are turned back into line breaks so the PEM
    /// block parses.
    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let mut key: Self = serde_json::from_str(raw).map_err(AuthError::MalformedCredential)?;
        key.private_key = normalize_line_breaks(&key.private_key);

        if key.client_email.trim().is_empty() {
            return Err(AuthError::MissingField("client_email"));
        }
        if key.private_key.trim().is_empty() {
            return Err(AuthError::MissingField("private_key"));
        }

        Ok(key)
    }

    /// RS256 signing key from the PEM material
    pub fn encoding_key(&self) -> Result<EncodingKey, AuthError> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(AuthError::InvalidKey)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

pub fn normalize_line_breaks(pem: &str) -> String {
    pem.replace("\\n", "\n")
}
