//! Kakao OAuth token acquisition and "send to me" memos.
//!
//! The acquirer runs a local server for the browser login flow and stores the
//! resulting tokens in a `.env`-style file. The sender reads that file and
//! posts a text memo with the stored access token.

mod client;
pub mod config;
mod error;
#[cfg(feature = "local-server")]
mod local_server;
mod memo;
pub mod message;
mod provider;
pub mod report;
mod store;
mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use client::{OAuthClient, OAuthClientConfig, authorization_url, refresh_stored_tokens};
pub use config::Config;
pub use error::KakaoError;
#[cfg(feature = "local-server")]
pub use local_server::{
    CallbackHandler, DEFAULT_SHUTDOWN_DELAY, FlowState, LocalServer, LocalServerConfig, Page,
};
pub use memo::{MemoClient, send_memo};
pub use message::{MAX_MESSAGE_CHARS, resolve_message_source, truncate};
pub use provider::KakaoEndpoints;
pub use store::{TokenStore, apply_token_update};
pub use types::{
    AuthorizationRequest, AuthorizationResponse, FailureKind, SendResult, TokenRecord,
    TokenResponse,
};
