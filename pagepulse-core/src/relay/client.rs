//! HTTP client for the downstream collector
//!
//! One `POST` of the JSON envelope per event, bounded by the configured
//! timeout. There is no retry: a failed relay is logged and the event is lost.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::RelayConfig;
use crate::error::{Error, Result};

use super::events::EnrichedEvent;

/// What the collector answered to a successful relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReceipt {
    /// HTTP status, always 2xx
    pub status: u16,
}

/// Ships an enriched event downstream.
#[async_trait]
pub trait Forward: Send + Sync {
    async fn forward(&self, event: &EnrichedEvent) -> Result<RelayReceipt>;
}

/// Collector client over HTTP
pub struct RelayClient {
    http_client: reqwest::Client,
    url: String,
}

impl RelayClient {
    /// Create a new relay client from configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &RelayConfig) -> Result<Self> {
        config.validate()?;

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Forward for RelayClient {
    async fn forward(&self, event: &EnrichedEvent) -> Result<RelayReceipt> {
        let response = match self.http_client.post(&self.url).json(event).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("request timed out: {}", e)
                } else {
                    format!("HTTP request failed: {}", e)
                };
                tracing::warn!(url = %self.url, error = %reason, "Failed to relay event");
                return Err(Error::Relay(reason));
            }
        };

        let status = response.status();

        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "Relayed event");
            Ok(RelayReceipt {
                status: status.as_u16(),
            })
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            tracing::warn!(
                url = %self.url,
                status = status.as_u16(),
                body = %body,
                "Collector rejected event"
            );
            Err(Error::RelayStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}
