//! Google Sheets v4 REST client for the inventory sheet
//!
//! Reads and writes the whole first sheet of one spreadsheet. Every save
//! clears the sheet and rewrites it from A1, so concurrent writers race and
//! the last one wins.

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::auth::TokenSource;
use super::credential::ServiceAccountKey;
use super::error::{ConnectError, LoadError, SaveError, StoreError};
use super::locator::spreadsheet_id;
use super::rows::{encode_rows, parse_rows};
use super::RecordStore;
use crate::inventory::Item;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

/// Sheets client bound to the first sheet of one spreadsheet.
/// Cheap to clone; clones share the cached access token.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    tokens: TokenSource,
    api_base: Url,
    spreadsheet_id: String,
    sheet_title: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<Value>>,
}

impl SheetsClient {
    /// Authenticate and resolve the spreadsheet's first sheet.
    ///
    /// A rejected credential surfaces here rather than on the first load.
    pub async fn connect(
        key: ServiceAccountKey,
        locator: &str,
        api_base: &str,
    ) -> Result<Self, ConnectError> {
        let spreadsheet_id = spreadsheet_id(locator)?;
        let api_base = Url::parse(api_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ConnectError::ApiBase(api_base.to_string()))?;

        let http = Client::new();
        let tokens = TokenSource::new(http.clone(), key)?;
        tokens.access_token().await?;

        let mut client = Self {
            http,
            tokens,
            api_base,
            spreadsheet_id,
            sheet_title: String::new(),
        };
        client.sheet_title = client.first_sheet_title().await?;

        info!(
            spreadsheet = %client.spreadsheet_id,
            sheet = %client.sheet_title,
            "Connected to inventory spreadsheet"
        );
        Ok(client)
    }

    pub fn sheet_title(&self) -> &str {
        &self.sheet_title
    }

    async fn first_sheet_title(&self) -> Result<String, ConnectError> {
        let request = self
            .http
            .get(self.endpoint(&[]))
            .query(&[("fields", "sheets.properties(sheetId,title,index)")]);
        let metadata: SpreadsheetMetadata = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(StoreError::Parse)?;

        metadata
            .sheets
            .into_iter()
            .min_by_key(|sheet| sheet.properties.index)
            .map(|sheet| sheet.properties.title)
            .ok_or(ConnectError::NoSheets)
    }

    /// `{api_base}/v4/spreadsheets/{id}/{segments...}`, each segment
    /// percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        // cannot_be_a_base URLs are rejected in connect
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
                .extend(segments);
        }
        url
    }

    /// A1 reference to the whole sheet, title quoted
    fn sheet_range(&self) -> String {
        format!("'{}'", self.sheet_title.replace('\'', "''"))
    }

    /// Attach the bearer token, send, and turn non-2xx into `StoreError::Api`
    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status: status.as_u16(), body });
        }

        Ok(response)
    }
}

impl RecordStore for SheetsClient {
    async fn load(&self) -> Result<Vec<Item>, LoadError> {
        let request = self
            .http
            .get(self.endpoint(&["values", &self.sheet_range()]))
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "UNFORMATTED_VALUE"),
            ]);
        let range: ValueRange = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(StoreError::Parse)?;

        let items = parse_rows(range.values)?;
        debug!(sheet = %self.sheet_title, rows = items.len(), "Loaded inventory");
        Ok(items)
    }

    async fn save(&self, items: &[Item]) -> Result<(), SaveError> {
        let range = self.sheet_range();

        let clear = self
            .http
            .post(self.endpoint(&["values", &format!("{}:clear", range)]))
            .json(&serde_json::json!({}));
        self.send(clear).await.map_err(SaveError::Clear)?;

        let target = format!("{}!A1", range);
        let body = ValueRangeUpdate {
            range: &target,
            major_dimension: "ROWS",
            values: encode_rows(items),
        };
        let write = self
            .http
            .put(self.endpoint(&["values", &target]))
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        self.send(write).await.map_err(SaveError::Write)?;

        info!(sheet = %self.sheet_title, rows = items.len(), "Saved inventory");
        Ok(())
    }
}
