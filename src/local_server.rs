mod config;
mod http;
mod pages;
mod server;

pub use config::{DEFAULT_SHUTDOWN_DELAY, LocalServerConfig};
pub use http::{CallbackHandler, FlowState};
pub use pages::Page;
pub use server::LocalServer;

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::http::{Method, StatusCode};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{KakaoEndpoints, OAuthClient, OAuthClientConfig, TokenStore};

    async fn handler_for(server: &MockServer, store: TokenStore) -> CallbackHandler {
        let config = OAuthClientConfig::new("rest-key", "http://localhost:3000/callback")
            .with_endpoints(KakaoEndpoints::with_base_url(&server.uri()));
        let client = OAuthClient::new(config).unwrap();
        let (handler, _token_rx) = CallbackHandler::new(client, store, "/callback");
        handler
    }

    #[tokio::test]
    async fn root_serves_login_page() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_for(&server, TokenStore::new(dir.path().join(".env"))).await;

        let page = handler.handle(&Method::GET, "/", None).await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.html.contains("/oauth/authorize?client_id=rest-key"));
        assert!(page.html.contains("response_type=code"));
    }

    #[tokio::test]
    async fn unknown_paths_and_methods_are_rejected() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_for(&server, TokenStore::new(dir.path().join(".env"))).await;

        let page = handler.handle(&Method::GET, "/favicon.ico", None).await;
        assert_eq!(page.status, StatusCode::NOT_FOUND);

        let page = handler.handle(&Method::POST, "/callback", Some("code=x")).await;
        assert_eq!(page.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(handler.state(), FlowState::Listening);
    }

    #[tokio::test]
    async fn failed_exchange_keeps_listening_and_retry_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid_client"}"#),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 7200
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join(".env");
        fs::write(&store_path, "KAKAO_REST_API_KEY=rest-key\n").unwrap();
        let handler = handler_for(&server, TokenStore::new(&store_path)).await;

        let page = handler.handle(&Method::GET, "/callback", None).await;
        assert_eq!(page.status, StatusCode::BAD_REQUEST);
        assert_eq!(handler.state(), FlowState::Failed);

        let page = handler.handle(&Method::GET, "/callback", Some("code=one")).await;
        assert_eq!(page.status, StatusCode::BAD_GATEWAY);
        assert!(page.html.contains("invalid_client"));
        assert_eq!(handler.state(), FlowState::Failed);

        let page = handler.handle(&Method::GET, "/callback", Some("code=two")).await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.html.contains("access-1"));
        assert!(page.html.contains("2.0 hours"));
        assert_eq!(handler.state(), FlowState::Persisted);

        let content = fs::read_to_string(&store_path).unwrap();
        assert!(content.starts_with("KAKAO_REST_API_KEY=rest-key\n"));
        assert!(content.contains("KAKAO_ACCESS_TOKEN=access-1\n"));
        assert!(content.contains("KAKAO_REFRESH_TOKEN=refresh-1\n"));

        let page = handler.handle(&Method::GET, "/callback", Some("code=three")).await;
        assert_eq!(page.status, StatusCode::CONFLICT);
    }
}
