//! Ledger gateway HTTP client implementation.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::ClientError;
use crate::types::{ApiErrorResponse, NodeInfo, TransferReceipt, TransferRequest};

/// Ledger gateway API client.
///
/// Submits signed value transfers through a wallet gateway and probes the
/// gateway's node for reachability.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl LedgerClient {
    /// Create a new ledger client with default options.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Gateway URL (e.g., `"http://localhost:14265"`)
    /// * `api_key` - Bearer credential, if the gateway requires one
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, &ClientOptions::default())
    }

    /// Create a new ledger client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: Option<String>,
        options: &ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration(
                "ledger gateway URL is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Base URL the client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a value transfer.
    ///
    /// The call returns once the gateway has broadcast the bundle; it does not
    /// wait for confirmation on the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gateway rejects the transfer.
    #[instrument(skip(self, transfer), fields(reference = %transfer.reference, value = transfer.value))]
    pub async fn send_transfer(
        &self,
        transfer: &TransferRequest,
    ) -> Result<TransferReceipt, ClientError> {
        let url = format!("{}/api/v1/transfers", self.base_url);
        debug!(address = %transfer.address, tag = %transfer.tag, "Submitting transfer");

        let response = self
            .authorized(self.client.post(&url))
            .json(transfer)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch gateway node information.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gateway returns an error.
    #[instrument(skip(self))]
    pub async fn node_info(&self) -> Result<NodeInfo, ClientError> {
        let url = format!("{}/api/v1/info", self.base_url);

        let response = self.authorized(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        match serde_json::from_slice::<ApiErrorResponse>(&body) {
            Ok(api_error) => Err(ClientError::Api {
                status: status.as_u16(),
                code: api_error.code,
                message: api_error.error,
            }),
            Err(_) => Err(ClientError::Api {
                status: status.as_u16(),
                code: None,
                message: format!("HTTP {status}"),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

impl ClientOptions {
    /// Create options with a request timeout.
    #[must_use]
    pub fn with_timeout_seconds(timeout_seconds: u64) -> Self {
        Self { timeout_seconds }
    }
}
