//! Kakao REST API endpoints.

const AUTHORIZE_URL: &str = "https://kauth.kakao.com/oauth/authorize";
const TOKEN_URL: &str = "https://kauth.kakao.com/oauth/token";
const MEMO_URL: &str = "https://kapi.kakao.com/v2/api/talk/memo/default/send";

const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/callback";
const DEFAULT_MEMO_LINK_URL: &str = "https://news.naver.com/main/main.naver?mode=LSD&mid=shm&sid1=101";

/// Where the OAuth and messaging calls are sent. Production hosts by default;
/// tests point these at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KakaoEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub memo_url: String,
}

impl Default for KakaoEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            memo_url: MEMO_URL.to_string(),
        }
    }
}

impl KakaoEndpoints {
    /// Every endpoint rooted at `base`, keeping the production paths.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{base}/oauth/authorize"),
            token_url: format!("{base}/oauth/token"),
            memo_url: format!("{base}/v2/api/talk/memo/default/send"),
        }
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_memo_url(mut self, url: impl Into<String>) -> Self {
        self.memo_url = url.into();
        self
    }

    pub fn default_redirect_uri() -> &'static str {
        DEFAULT_REDIRECT_URI
    }

    pub fn default_memo_link_url() -> &'static str {
        DEFAULT_MEMO_LINK_URL
    }
}

#[cfg(test)]
mod tests {
    use super::KakaoEndpoints;

    #[test]
    fn base_url_keeps_production_paths() {
        let endpoints = KakaoEndpoints::with_base_url("http://127.0.0.1:9000/");
        assert_eq!(endpoints.token_url, "http://127.0.0.1:9000/oauth/token");
        assert_eq!(
            endpoints.memo_url,
            "http://127.0.0.1:9000/v2/api/talk/memo/default/send"
        );
    }
}
