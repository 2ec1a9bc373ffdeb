//! Webhook Publisher - delegates article generation and posting over HTTP
//!
//! This module provides the network-bound publisher:
//! - JSON POST of the publish request to a configured endpoint
//! - `Idempotency-Key` header so retried ticks never double-post
//! - Optional bearer token kept in a `SecretString`
//! - Exponential backoff for transient failures (timeouts, 429, 5xx)

use crate::core::config::WebhookPublisherConfig;
use crate::core::error::CampaignError;
use crate::core::retry::{RetryManager, RetryOptions};
use crate::core::traits::{ContentPublisher, PublishRequest, PublishResponse};
use crate::security::SecureTokenManager;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default request timeout; content generation is slow
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// HTTP publisher for an external content/publish workflow
pub struct WebhookPublisher {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<SecretString>,
    retry_manager: RetryManager,
}

impl WebhookPublisher {
    /// Create a webhook publisher
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, timeout and retry settings
    /// * `token` - Bearer token; falls back to `config.token` when `None`
    pub fn new(
        config: &WebhookPublisherConfig,
        token: Option<SecretString>,
    ) -> Result<Self, CampaignError> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|e| {
            CampaignError::Config(format!(
                "invalid webhook endpoint {:?}: {}",
                config.endpoint, e
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CampaignError::Config(format!(
                "webhook endpoint must use http(s): {}",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| CampaignError::Config(format!("failed to build HTTP client: {}", e)))?;

        let token = token.or_else(|| {
            config
                .token
                .as_ref()
                .filter(|t| !t.is_empty() && !t.contains("${"))
                .map(|t| SecretString::new(t.clone().into()))
        });

        let retry_manager = RetryManager::new(RetryOptions {
            max_attempts: config.max_attempts.unwrap_or(3),
            ..Default::default()
        });

        Ok(Self {
            client,
            endpoint,
            token,
            retry_manager,
        })
    }

    /// Replace the retry policy
    pub fn with_retry_options(mut self, options: RetryOptions) -> Self {
        self.retry_manager = RetryManager::new(options);
        self
    }

    async fn send(&self, request: &PublishRequest) -> anyhow::Result<PublishResponse> {
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("Idempotency-Key", &request.idempotency_key)
            .json(request);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("network error: {}", self.sanitize(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "HTTP {} from publish workflow: {}",
                status.as_u16(),
                self.sanitize(body.trim())
            );
        }

        let body: PublishResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("malformed publish response: {}", e))?;

        Ok(body)
    }

    fn sanitize(&self, text: &str) -> String {
        match &self.token {
            Some(token) => {
                let secret = token.expose_secret();
                text.replace(secret, &SecureTokenManager::mask_token(secret))
            }
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl ContentPublisher for WebhookPublisher {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn publish(&self, request: &PublishRequest) -> anyhow::Result<PublishResponse> {
        debug!(
            platform = %request.platform.domain,
            idempotency_key = %request.idempotency_key,
            "posting to publish workflow"
        );
        self.retry_manager.retry(|| self.send(request)).await
    }
}
