use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::KakaoError;
use crate::provider::KakaoEndpoints;

pub const REST_API_KEY: &str = "KAKAO_REST_API_KEY";
pub const ACCESS_TOKEN_KEY: &str = "KAKAO_ACCESS_TOKEN";
pub const REFRESH_TOKEN_KEY: &str = "KAKAO_REFRESH_TOKEN";
pub const MEMO_LINK_URL_KEY: &str = "KAKAO_MEMO_LINK_URL";

pub const DEFAULT_STORE_PATH: &str = ".env";

/// Settings read once at startup and handed to each component.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub store_path: PathBuf,
    pub rest_api_key: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub memo_link_url: Option<String>,
    pub endpoints: KakaoEndpoints,
}

impl Config {
    /// Reads the token store at `store_path`. Process environment variables
    /// with the same names win over file entries. A missing file yields an
    /// empty configuration.
    pub fn load(store_path: impl Into<PathBuf>) -> Result<Self, KakaoError> {
        let store_path = store_path.into();
        let mut values = read_store_values(&store_path)?;
        for key in [REST_API_KEY, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, MEMO_LINK_URL_KEY] {
            if let Ok(value) = std::env::var(key) {
                values.insert(key.to_string(), value);
            }
        }
        Ok(Self::from_values(store_path, values))
    }

    pub fn from_values(store_path: impl Into<PathBuf>, mut values: HashMap<String, String>) -> Self {
        let mut take = |key: &str| values.remove(key).filter(|value| !value.trim().is_empty());
        Self {
            store_path: store_path.into(),
            rest_api_key: take(REST_API_KEY),
            access_token: take(ACCESS_TOKEN_KEY),
            refresh_token: take(REFRESH_TOKEN_KEY),
            memo_link_url: take(MEMO_LINK_URL_KEY),
            endpoints: KakaoEndpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: KakaoEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn require_rest_api_key(&self) -> Result<&str, KakaoError> {
        require(&self.rest_api_key, REST_API_KEY)
    }

    pub fn require_access_token(&self) -> Result<&str, KakaoError> {
        require(&self.access_token, ACCESS_TOKEN_KEY)
    }

    pub fn require_refresh_token(&self) -> Result<&str, KakaoError> {
        require(&self.refresh_token, REFRESH_TOKEN_KEY)
    }

    pub fn memo_link_url(&self) -> &str {
        self.memo_link_url
            .as_deref()
            .unwrap_or(KakaoEndpoints::default_memo_link_url())
    }
}

fn require<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, KakaoError> {
    value
        .as_deref()
        .ok_or(KakaoError::ConfigurationMissing { key })
}

/// Reads `KEY=VALUE` entries one line at a time. Lines the dotenv parser
/// rejects are skipped so an unrelated entry never blocks the tools.
fn read_store_values(path: &Path) -> Result<HashMap<String, String>, KakaoError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "token store not found, starting empty");
            return Ok(HashMap::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut values = HashMap::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match dotenvy::from_read_iter(line.as_bytes()).next() {
            Some(Ok((key, value))) => {
                values.insert(key, value);
            }
            Some(Err(err)) => {
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %err,
                    "skipping unreadable token store entry"
                );
            }
            None => {}
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reads_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# comment\nKAKAO_TEST_ONLY=1\nKAKAO_ACCESS_TOKEN=access-1\nKAKAO_REFRESH_TOKEN=refresh-1\n",
        )
        .unwrap();

        let config = Config::from_values(&path, read_store_values(&path).unwrap());
        assert_eq!(config.access_token.as_deref(), Some("access-1"));
        assert_eq!(config.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(config.rest_api_key, None);
    }

    #[test]
    fn unparseable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "GREETING=hello world\nKAKAO_ACCESS_TOKEN=tok\nFOO=bar\n",
        )
        .unwrap();

        let values = read_store_values(&path).unwrap();
        assert_eq!(values.get("KAKAO_ACCESS_TOKEN").map(String::as_str), Some("tok"));
        assert_eq!(values.get("FOO").map(String::as_str), Some("bar"));
        assert!(!values.contains_key("GREETING"));

        let config = Config::load(&path).unwrap();
        assert!(config.access_token.is_some());
    }

    #[test]
    fn missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let values = read_store_values(&dir.path().join("absent.env")).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let values = HashMap::from([(REST_API_KEY.to_string(), "  ".to_string())]);
        let config = Config::from_values(".env", values);
        assert!(matches!(
            config.require_rest_api_key(),
            Err(KakaoError::ConfigurationMissing { key: REST_API_KEY })
        ));
    }

    #[test]
    fn memo_link_defaults_to_news_section() {
        let config = Config::from_values(".env", HashMap::new());
        assert_eq!(config.memo_link_url(), KakaoEndpoints::default_memo_link_url());
    }
}
