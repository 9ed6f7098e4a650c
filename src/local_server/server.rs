use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::{KakaoError, OAuthClient, TokenRecord, TokenStore};

use super::config::LocalServerConfig;
use super::http::{CallbackHandler, route_request, wait_for_token};

/// Serves the login page and the OAuth callback until one token exchange has
/// been persisted.
#[derive(Debug, Clone)]
pub struct LocalServer {
    config: LocalServerConfig,
}

impl LocalServer {
    pub fn new(config: LocalServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocalServerConfig {
        &self.config
    }

    pub async fn bind(&self) -> Result<TcpListener, KakaoError> {
        let address = self.config.address();
        TcpListener::bind(&address)
            .await
            .map_err(|source| KakaoError::Bind { address, source })
    }

    /// Runs until a callback has been exchanged and saved, then keeps serving
    /// for the configured shutdown delay. Failed callbacks leave the server
    /// listening.
    pub async fn run(
        &self,
        listener: TcpListener,
        client: OAuthClient,
        store: TokenStore,
    ) -> Result<TokenRecord, KakaoError> {
        let (handler, token_rx) = CallbackHandler::new(client, store, &self.config.callback_path);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .fallback(route_request)
            .with_state(Arc::new(handler));

        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let server_handle = tokio::spawn(async move {
            if let Err(err) = server.await {
                warn!(error = %err, "local server stopped with an error");
            }
        });

        info!(address = %self.config.address(), "waiting for authorization");
        let result = wait_for_token(token_rx, self.config.timeout).await;

        if result.is_ok() {
            info!(delay = ?self.config.shutdown_delay, "tokens saved, shutting down");
            tokio::time::sleep(self.config.shutdown_delay).await;
        }

        let _ = shutdown_tx.send(());
        let _ = server_handle.await;

        result
    }
}
