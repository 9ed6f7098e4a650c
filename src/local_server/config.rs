use std::time::Duration;

use url::Url;

use crate::KakaoError;

/// Time left for the browser to render the success page before the server
/// stops.
pub const DEFAULT_SHUTDOWN_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LocalServerConfig {
    pub host: String,
    pub port: u16,
    pub callback_path: String,
    pub timeout: Option<Duration>,
    pub shutdown_delay: Duration,
}

impl LocalServerConfig {
    pub fn new(host: impl Into<String>, port: u16, callback_path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            callback_path: normalize_path(callback_path.into()),
            timeout: None,
            shutdown_delay: DEFAULT_SHUTDOWN_DELAY,
        }
    }

    pub fn from_redirect_uri(redirect_uri: &str) -> Result<Self, KakaoError> {
        let url = Url::parse(redirect_uri)?;
        if url.scheme() != "http" {
            return Err(KakaoError::InvalidRedirectUri(
                "redirect uri must use http scheme".to_string(),
            ));
        }

        let host = url.host_str().ok_or_else(|| {
            KakaoError::InvalidRedirectUri("redirect uri is missing host".to_string())
        })?;

        let port = url.port_or_known_default().ok_or_else(|| {
            KakaoError::InvalidRedirectUri("redirect uri is missing port".to_string())
        })?;

        if url.path() == "/" {
            return Err(KakaoError::InvalidRedirectUri(
                "redirect uri path must not be the login page".to_string(),
            ));
        }

        Ok(Self::new(host, port, url.path()))
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.callback_path)
    }

    /// Address of the login page served at `/`.
    pub fn login_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_shutdown_delay(mut self, delay: Duration) -> Self {
        self.shutdown_delay = delay;
        self
    }
}

fn normalize_path(path: String) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}
