//! HTTP client for the coffee-shop API.
//!
//! Two endpoints: `POST {base}/tokens` hands out a short-lived token and
//! `GET {base}/coffee_shops?token=...` returns every shop. Status codes of the
//! shop endpoint are mapped onto [`FinderError`] variants so the pipeline can
//! decide what is worth retrying.

use std::time::Duration;

use reqwest::{header, Client, StatusCode, Url};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::FinderError;
use crate::models::{AuthToken, ShopRecord, TokenResponse};

pub struct ShopApi {
    client: Client,
    base_url: String,
}

impl ShopApi {
    /// Builds a client from the `[api]` config section.
    ///
    /// # Errors
    ///
    /// See [`ShopApi::with_base_url`].
    pub fn new(config: &ApiConfig) -> Result<Self, FinderError> {
        Self::with_base_url(&config.base_url, config.timeout_secs)
    }

    /// Builds a client against any base URL (a mock server in tests).
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`FinderError::Network`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, FinderError> {
        Url::parse(base_url).map_err(|e| FinderError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("coffee-finder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Requests a fresh token. Does not retry.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::TokenAcquisition`] on network failure, a
    /// non-2xx status, or a body without a non-empty `token` string.
    pub async fn acquire_token(&self) -> Result<AuthToken, FinderError> {
        let response = self
            .client
            .post(self.endpoint("tokens"))
            .send()
            .await
            .map_err(|e| FinderError::TokenAcquisition(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FinderError::TokenAcquisition(format!(
                "token endpoint answered {status}"
            )));
        }

        let body = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| FinderError::TokenAcquisition(format!("malformed token response: {e}")))?;

        if body.token.trim().is_empty() {
            return Err(FinderError::TokenAcquisition(
                "token endpoint returned an empty token".to_string(),
            ));
        }

        debug!("Acquired API token.");
        Ok(AuthToken::new(body.token))
    }

    /// Fetches the full shop list with `token`.
    ///
    /// # Errors
    ///
    /// - [`FinderError::RetryWithNewToken`] on 401.
    /// - [`FinderError::UnacceptableFormat`] on 406.
    /// - [`FinderError::ServiceUnavailable`] on 503.
    /// - [`FinderError::Timeout`] on 504.
    /// - [`FinderError::UnexpectedStatus`] on any other non-200 status.
    /// - [`FinderError::Network`] when no response arrives.
    /// - [`FinderError::Deserialize`] when a 200 body is not a shop list.
    pub async fn fetch_shops(&self, token: &AuthToken) -> Result<Vec<ShopRecord>, FinderError> {
        let response = self
            .client
            .get(self.endpoint("coffee_shops"))
            .query(&[("token", token.as_str())])
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let bytes = response.bytes().await?;
                let shops = serde_json::from_slice::<Vec<ShopRecord>>(&bytes).map_err(|e| {
                    FinderError::Deserialize {
                        context: "coffee_shops".to_string(),
                        source: e,
                    }
                })?;
                debug!(count = shops.len(), "Fetched coffee shops.");
                Ok(shops)
            }
            StatusCode::UNAUTHORIZED => {
                warn!("401: Token invalid.");
                Err(FinderError::RetryWithNewToken)
            }
            StatusCode::NOT_ACCEPTABLE => {
                warn!("406: Unacceptable Accept format.");
                Err(FinderError::UnacceptableFormat)
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                warn!("503: Service unavailable.");
                Err(FinderError::ServiceUnavailable)
            }
            StatusCode::GATEWAY_TIMEOUT => {
                warn!("504: Timeout.");
                Err(FinderError::Timeout)
            }
            other => {
                warn!(status = other.as_u16(), "Unprocessed HTTP status code.");
                Err(FinderError::UnexpectedStatus(other.as_u16()))
            }
        }
    }
}
