use std::io::Read;
use std::path::Path;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::pretty_body;
use crate::message::{MAX_MESSAGE_CHARS, resolve_message_source, truncate};
use crate::{Config, FailureKind, KakaoError, SendResult};

#[derive(Debug, Serialize)]
struct TextTemplate<'a> {
    object_type: &'static str,
    text: &'a str,
    link: Link<'a>,
}

#[derive(Debug, Serialize)]
struct Link<'a> {
    web_url: &'a str,
    mobile_web_url: &'a str,
}

/// Client for the "send to me" memo endpoint.
#[derive(Debug, Clone)]
pub struct MemoClient {
    memo_url: String,
    link_url: String,
    http: Client,
}

impl MemoClient {
    pub fn new(memo_url: impl Into<String>, link_url: impl Into<String>) -> Result<Self, KakaoError> {
        Ok(Self::with_http_client(
            memo_url,
            link_url,
            Client::builder().build()?,
        ))
    }

    pub fn from_config(config: &Config) -> Result<Self, KakaoError> {
        Self::new(config.endpoints.memo_url.clone(), config.memo_link_url())
    }

    pub fn with_http_client(
        memo_url: impl Into<String>,
        link_url: impl Into<String>,
        http: Client,
    ) -> Self {
        Self {
            memo_url: memo_url.into(),
            link_url: link_url.into(),
            http,
        }
    }

    /// Posts `message` as a text template. The message is sent as given, so
    /// callers truncate it first.
    pub async fn send(&self, message: &str, access_token: &str) -> SendResult {
        let template = TextTemplate {
            object_type: "text",
            text: message,
            link: Link {
                web_url: &self.link_url,
                mobile_web_url: &self.link_url,
            },
        };
        let template_object = match serde_json::to_string(&template) {
            Ok(json) => json,
            Err(err) => return failure(FailureKind::Other, err.to_string()),
        };

        debug!(url = %self.memo_url, chars = message.chars().count(), "sending memo");
        let response = match self
            .http
            .post(&self.memo_url)
            .bearer_auth(access_token)
            .form(&[("template_object", template_object.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "memo request failed");
                return failure(FailureKind::Other, err.to_string());
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return failure(FailureKind::Other, err.to_string()),
        };

        if status == StatusCode::UNAUTHORIZED {
            warn!("access token rejected");
            return failure(FailureKind::TokenExpired, pretty_body(&body));
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "memo endpoint returned an error");
            let detail = if body.is_empty() {
                format!("http status {}", status.as_u16())
            } else {
                pretty_body(&body)
            };
            return failure(FailureKind::Other, detail);
        }

        SendResult::Success(body)
    }
}

/// Resolves, truncates and sends one memo with the stored access token.
pub async fn send_memo<R: Read>(
    config: &Config,
    path: Option<&Path>,
    stdin_is_terminal: bool,
    stdin: R,
) -> Result<SendResult, KakaoError> {
    let access_token = config.require_access_token()?;
    let client = MemoClient::from_config(config)?;

    let message = resolve_message_source(path, stdin_is_terminal, stdin)?;
    let message = if message.chars().count() > MAX_MESSAGE_CHARS {
        info!(
            chars = message.chars().count(),
            max = MAX_MESSAGE_CHARS,
            "message truncated"
        );
        truncate(&message, MAX_MESSAGE_CHARS)
    } else {
        message
    };

    Ok(client.send(&message, access_token).await)
}

fn failure(kind: FailureKind, detail: String) -> SendResult {
    SendResult::Failure { kind, detail }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    const MEMO_PATH: &str = "/v2/api/talk/memo/default/send";

    async fn client_with(status: u16, body: &str) -> (MockServer, MemoClient) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MEMO_PATH))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
        let client = MemoClient::new(
            format!("{}{MEMO_PATH}", server.uri()),
            "https://example.com/news",
        )
        .unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn success_returns_provider_body() {
        let (_server, client) = client_with(200, r#"{"result_code":0}"#).await;
        let result = client.send("hi", "token-1").await;
        assert_eq!(result, SendResult::Success(r#"{"result_code":0}"#.to_string()));
    }

    #[tokio::test]
    async fn unauthorized_is_token_expired() {
        let (_server, client) =
            client_with(401, r#"{"msg":"this access token does not exist","code":-401}"#).await;
        let result = client.send("hi", "token-1").await;
        assert!(matches!(
            result,
            SendResult::Failure {
                kind: FailureKind::TokenExpired,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn server_error_is_other_failure() {
        let (_server, client) = client_with(500, r#"{"msg":"internal error"}"#).await;
        match client.send("hi", "token-1").await {
            SendResult::Failure {
                kind: FailureKind::Other,
                detail,
            } => assert!(detail.contains("internal error")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn network_failure_is_other_failure() {
        let server = MockServer::start().await;
        let url = format!("{}{MEMO_PATH}", server.uri());
        drop(server);

        let client = MemoClient::new(url, "https://example.com/news").unwrap();
        let result = client.send("hi", "token-1").await;
        assert!(matches!(
            result,
            SendResult::Failure {
                kind: FailureKind::Other,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn payload_is_a_text_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MEMO_PATH))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("template_object="))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let client = MemoClient::new(
            format!("{}{MEMO_PATH}", server.uri()),
            "https://example.com/news",
        )
        .unwrap();
        assert!(client.send("안녕 & bye", "token-1").await.is_success());

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let form: Vec<(String, String)> =
            url::form_urlencoded::parse(&requests[0].body).into_owned().collect();
        assert_eq!(form.len(), 1);
        assert_eq!(form[0].0, "template_object");

        let template: serde_json::Value = serde_json::from_str(&form[0].1).unwrap();
        assert_eq!(
            template,
            serde_json::json!({
                "object_type": "text",
                "text": "안녕 & bye",
                "link": {
                    "web_url": "https://example.com/news",
                    "mobile_web_url": "https://example.com/news"
                }
            })
        );
    }
}
