use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::provider::KakaoEndpoints;
use crate::{
    AuthorizationRequest, AuthorizationResponse, Config, KakaoError, TokenRecord, TokenResponse,
    TokenStore,
};

#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub endpoints: KakaoEndpoints,
    pub timeout: Option<Duration>,
}

impl OAuthClientConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            endpoints: KakaoEndpoints::default(),
            timeout: None,
        }
    }

    /// Client settings for the REST API key in `config`.
    pub fn from_config(config: &Config, redirect_uri: impl Into<String>) -> Result<Self, KakaoError> {
        Ok(Self::new(config.require_rest_api_key()?, redirect_uri)
            .with_endpoints(config.endpoints.clone()))
    }

    pub fn with_endpoints(mut self, endpoints: KakaoEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthClientConfig,
    http: Client,
}

impl OAuthClient {
    pub fn new(config: OAuthClientConfig) -> Result<Self, KakaoError> {
        if config.client_id.trim().is_empty() {
            return Err(KakaoError::ConfigurationMissing {
                key: crate::config::REST_API_KEY,
            });
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { config, http })
    }

    pub fn with_http_client(config: OAuthClientConfig, http: Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    pub fn authorization_url(&self) -> Result<AuthorizationRequest, KakaoError> {
        authorization_url(
            &self.config.endpoints,
            &self.config.client_id,
            &self.config.redirect_uri,
        )
    }

    /// Exchanges the code carried by the callback `query` for tokens. Nothing
    /// is sent when the query has no code.
    pub async fn handle_callback(&self, query: &str) -> Result<TokenRecord, KakaoError> {
        let response = AuthorizationResponse::from_query(query)?;
        self.exchange_code(response).await
    }

    pub async fn exchange_code(
        &self,
        response: AuthorizationResponse,
    ) -> Result<TokenRecord, KakaoError> {
        let payload = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", response.code.as_str()),
        ];

        let token = self.send_token_request(&payload).await?;
        let refresh_token = token.refresh_token.ok_or_else(|| KakaoError::InvalidResponse {
            message: "token response is missing refresh_token".to_string(),
            body: String::new(),
        })?;

        info!(expires_in = token.expires_in, "authorization code exchanged");
        Ok(TokenRecord {
            access_token: token.access_token,
            refresh_token,
            expires_in: token.expires_in,
            issued_at: Utc::now(),
        })
    }

    /// Renews the access token. The provider only returns a new refresh token
    /// when it rotates it, otherwise `refresh_token` is carried over.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRecord, KakaoError> {
        let payload = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];

        let token = self.send_token_request(&payload).await?;
        let rotated = token.refresh_token.is_some();
        info!(expires_in = token.expires_in, rotated, "access token refreshed");
        Ok(TokenRecord {
            access_token: token.access_token,
            refresh_token: token.refresh_token.unwrap_or_else(|| refresh_token.to_string()),
            expires_in: token.expires_in,
            issued_at: Utc::now(),
        })
    }

    async fn send_token_request(
        &self,
        payload: &[(&str, &str)],
    ) -> Result<TokenResponse, KakaoError> {
        debug!(url = %self.config.endpoints.token_url, "requesting token");
        let response = self
            .http
            .post(&self.config.endpoints.token_url)
            .form(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "token endpoint returned an error");
            return Err(KakaoError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token = serde_json::from_str(&body).map_err(|err| KakaoError::InvalidResponse {
            message: err.to_string(),
            body,
        })?;

        Ok(token)
    }
}

/// Trades the stored refresh token for a new access token and saves the
/// result back to the store.
pub async fn refresh_stored_tokens(config: &Config) -> Result<TokenRecord, KakaoError> {
    let refresh_token = config.require_refresh_token()?;
    let client = OAuthClient::new(OAuthClientConfig::from_config(
        config,
        KakaoEndpoints::default_redirect_uri(),
    )?)?;

    let record = client.refresh_token(refresh_token).await?;
    TokenStore::new(&config.store_path).persist(&record)?;
    Ok(record)
}

/// Builds the provider login URL the browser is sent to.
pub fn authorization_url(
    endpoints: &KakaoEndpoints,
    client_id: &str,
    redirect_uri: &str,
) -> Result<AuthorizationRequest, KakaoError> {
    if client_id.trim().is_empty() {
        return Err(KakaoError::ConfigurationMissing {
            key: crate::config::REST_API_KEY,
        });
    }

    let mut url = Url::parse(&endpoints.authorize_url)?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code");

    Ok(AuthorizationRequest {
        authorization_url: url.to_string(),
    })
}
