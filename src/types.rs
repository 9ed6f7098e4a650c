use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::KakaoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub authorization_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: String,
}

impl AuthorizationResponse {
    /// Parses the raw query string of the redirect callback.
    pub fn from_query(query: &str) -> Result<Self, KakaoError> {
        let code = form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .filter(|code| !code.is_empty())
            .ok_or(KakaoError::MissingAuthorizationCode)?;

        Ok(Self { code })
    }
}

/// Body returned by the token endpoint. `refresh_token` is only present on a
/// refresh when the provider rotated it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: u64,
    pub refresh_token_expires_in: Option<u64>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub issued_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn expires_in_hours(&self) -> f64 {
        self.expires_in as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    TokenExpired,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResult {
    Success(String),
    Failure { kind: FailureKind, detail: String },
}

impl SendResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
