use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KakaoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid redirect uri: {0}")]
    InvalidRedirectUri(String),

    #[error("{key} is not configured")]
    ConfigurationMissing { key: &'static str },

    #[error("missing authorization code in callback url")]
    MissingAuthorizationCode,

    #[error("token exchange failed with http status {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String, body: String },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error(
        "token store is locked by another process; delete {} if none is running",
        .0.display()
    )]
    StoreLocked(PathBuf),

    #[error("failed to bind local server to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "local-server")]
    #[error("local server timed out after {timeout:?}")]
    LocalServerTimeout { timeout: std::time::Duration },
}

impl KakaoError {
    /// Provider detail suitable for showing to a person, pretty-printed when
    /// the body is JSON.
    pub fn detail(&self) -> String {
        match self {
            Self::TokenExchangeFailed { body, .. } | Self::InvalidResponse { body, .. }
                if !body.is_empty() =>
            {
                pretty_body(body)
            }
            other => other.to_string(),
        }
    }
}

pub(crate) fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}
