use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::{KakaoError, OAuthClient, TokenRecord, TokenStore};

use super::pages::{self, Page};

type TokenSender = oneshot::Sender<TokenRecord>;
type TokenReceiver = oneshot::Receiver<TokenRecord>;

/// Where the acquirer is in its single authorization round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Listening,
    Exchanging,
    Persisted,
    Failed,
}

/// Request handling for the local server, independent of any socket so it can
/// be driven directly.
pub struct CallbackHandler {
    client: OAuthClient,
    store: TokenStore,
    callback_path: String,
    state: Mutex<FlowState>,
    token_tx: Mutex<Option<TokenSender>>,
}

impl CallbackHandler {
    pub fn new(
        client: OAuthClient,
        store: TokenStore,
        callback_path: impl Into<String>,
    ) -> (Self, TokenReceiver) {
        let (token_tx, token_rx) = oneshot::channel();
        let handler = Self {
            client,
            store,
            callback_path: callback_path.into(),
            state: Mutex::new(FlowState::Listening),
            token_tx: Mutex::new(Some(token_tx)),
        };
        (handler, token_rx)
    }

    pub fn state(&self) -> FlowState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(FlowState::Failed)
    }

    pub async fn handle(&self, method: &Method, path: &str, query: Option<&str>) -> Page {
        if method != Method::GET {
            return pages::failure(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed",
                method.as_str(),
            );
        }

        if path == "/" {
            return match self.client.authorization_url() {
                Ok(auth) => pages::login(&auth.authorization_url),
                Err(err) => pages::failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error",
                    &err.detail(),
                ),
            };
        }

        if path == self.callback_path {
            return self.handle_callback(query.unwrap_or_default()).await;
        }

        pages::failure(StatusCode::NOT_FOUND, "Not found", path)
    }

    async fn handle_callback(&self, query: &str) -> Page {
        if self.state() == FlowState::Persisted {
            return pages::failure(
                StatusCode::CONFLICT,
                "Token already issued",
                "Tokens were already saved. You may close this window.",
            );
        }

        self.transition(FlowState::Exchanging);
        match self.exchange_and_persist(query).await {
            Ok(record) => {
                self.transition(FlowState::Persisted);
                let page = pages::success(&record, &self.store.path().display().to_string());
                self.deliver(record);
                page
            }
            Err(err) => {
                self.transition(FlowState::Failed);
                warn!(error = %err, "token request failed");
                let status = match err {
                    KakaoError::MissingAuthorizationCode => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                pages::failure(status, "Token request failed", &err.detail())
            }
        }
    }

    async fn exchange_and_persist(&self, query: &str) -> Result<TokenRecord, KakaoError> {
        let record = self.client.handle_callback(query).await?;

        let store = self.store.clone();
        let to_save = record.clone();
        tokio::task::spawn_blocking(move || store.persist(&to_save))
            .await
            .map_err(|err| KakaoError::InvalidResponse {
                message: err.to_string(),
                body: String::new(),
            })??;

        Ok(record)
    }

    fn transition(&self, next: FlowState) {
        if let Ok(mut state) = self.state.lock() {
            let from = *state;
            info!(?from, to = ?next, "authorization flow");
            *state = next;
        }
    }

    fn deliver(&self, record: TokenRecord) {
        if let Ok(mut guard) = self.token_tx.lock() {
            if let Some(sender) = guard.take() {
                let _ = sender.send(record);
            }
        }
    }
}

pub(super) async fn route_request(
    State(handler): State<Arc<CallbackHandler>>,
    method: Method,
    uri: Uri,
) -> Page {
    handler.handle(&method, uri.path(), uri.query()).await
}

pub(super) async fn wait_for_token(
    token_rx: TokenReceiver,
    timeout: Option<Duration>,
) -> Result<TokenRecord, KakaoError> {
    let closed = || KakaoError::InvalidResponse {
        message: "local server response channel closed".to_string(),
        body: String::new(),
    };

    if let Some(timeout) = timeout {
        let result = tokio::time::timeout(timeout, token_rx)
            .await
            .map_err(|_| KakaoError::LocalServerTimeout { timeout })?;
        result.map_err(|_| closed())
    } else {
        token_rx.await.map_err(|_| closed())
    }
}
