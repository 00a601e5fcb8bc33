//! OAuth 2.0 JWT-bearer grant for the service account
//!
//! A signed RS256 assertion is exchanged at the credential's `token_uri` for a
//! short-lived access token. The token is cached and shared by every clone of
//! the [`TokenSource`] until it is close to expiry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credential::ServiceAccountKey;
use super::error::AuthError;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are re-minted
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Mints and caches access tokens for one service account
#[derive(Clone)]
pub struct TokenSource {
    http: Client,
    key: Arc<ServiceAccountKey>,
    signer: Arc<EncodingKey>,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl TokenSource {
    pub fn new(http: Client, key: ServiceAccountKey) -> Result<Self, AuthError> {
        let signer = key.encoding_key()?;
        Ok(Self {
            http,
            key: Arc::new(key),
            signer: Arc::new(signer),
            cached: Arc::new(Mutex::new(None)),
        })
    }

    /// Current access token, minting a new one if the cached token is
    /// missing or about to expire
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let now = Utc::now();
        let cached = self.cached.lock().clone();
        if let Some(token) = cached {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let token = self.mint(now).await?;
        let value = token.value.clone();
        *self.cached.lock() = Some(token);
        Ok(value)
    }

    pub(crate) fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: SPREADSHEETS_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.signer).map_err(AuthError::Signing)
    }

    async fn mint(&self, now: DateTime<Utc>) -> Result<CachedToken, AuthError> {
        let assertion = self.sign_assertion(now)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(AuthError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status: status.as_u16(), body });
        }

        let token: TokenResponse = response.json().await.map_err(AuthError::Parse)?;
        debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Minted access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
