//! Configuration module - environment variable parsing

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::app::sessions::DEFAULT_SESSION_IDLE_SECS;
use crate::store::sheets::DEFAULT_API_BASE;
use crate::util::rate_limit::DEFAULT_MUTATIONS_PER_MINUTE;

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Spreadsheet URL or bare ID holding the inventory
    pub spreadsheet: String,
    /// Service account credential JSON
    pub service_account_json: String,
    /// Sheets API base URL
    pub sheets_api_base: String,

    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: Option<String>,
    /// Saves allowed per minute across all sessions
    pub mutations_per_minute: u32,
    /// Sessions unused for this long are evicted
    pub session_idle: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Render-style PORT wins over SERVER_ADDR
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let service_account_json = match lookup("GCP_SERVICE_ACCOUNT_JSON") {
            Some(json) => json,
            None => {
                let path = lookup("GCP_SERVICE_ACCOUNT_FILE")
                    .map(PathBuf::from)
                    .ok_or(ConfigError::Missing("GCP_SERVICE_ACCOUNT_JSON or GCP_SERVICE_ACCOUNT_FILE"))?;
                std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Unreadable { path, source })?
            }
        };

        let mutations_per_minute = match lookup("MUTATIONS_PER_MINUTE") {
            Some(raw) => raw
                .trim()
                .parse()
                .ok()
                .filter(|n: &u32| *n > 0)
                .ok_or(ConfigError::Invalid("MUTATIONS_PER_MINUTE"))?,
            None => DEFAULT_MUTATIONS_PER_MINUTE,
        };

        let session_idle_secs = match lookup("SESSION_IDLE_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .ok()
                .filter(|n: &u64| *n > 0)
                .ok_or(ConfigError::Invalid("SESSION_IDLE_SECS"))?,
            None => DEFAULT_SESSION_IDLE_SECS,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            spreadsheet: lookup("SPREADSHEET_URL").ok_or(ConfigError::Missing("SPREADSHEET_URL"))?,
            service_account_json,
            sheets_api_base: lookup("SHEETS_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),

            client_origin: lookup("CLIENT_ORIGIN").filter(|origins| !origins.trim().is_empty()),
            mutations_per_minute,
            session_idle: Duration::from_secs(session_idle_secs),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_addr", &self.server_addr)
            .field("log_level", &self.log_level)
            .field("spreadsheet", &self.spreadsheet)
            .field("service_account_json", &"<redacted>")
            .field("sheets_api_base", &self.sheets_api_base)
            .field("client_origin", &self.client_origin)
            .field("mutations_per_minute", &self.mutations_per_minute)
            .field("session_idle", &self.session_idle)
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {0}")]
    Invalid(&'static str),

    #[error("Cannot read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
