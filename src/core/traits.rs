//! Core traits and types for publish attempts
//!
//! This module defines the boundary to the external content/publish
//! workflow. Everything behind [`ContentPublisher`] is opaque: it may be slow,
//! it may fail, and the orchestrator only cares about the normalized result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// Platform identity passed along with a publish request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRef {
    pub id: String,
    pub domain: String,
}

/// Request sent to the content/publish workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub keyword: String,
    pub anchor_text: String,
    pub target_url: String,
    pub owner_id: String,
    pub platform: PlatformRef,
    /// `{campaign_id}:{rotation}`; stable across retries of the same tick
    pub idempotency_key: String,
}

// ============================================================================
// Responses
// ============================================================================

/// Raw response from the content/publish workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

// ============================================================================
// Publisher Trait
// ============================================================================

/// Capability that generates and publishes one article
///
/// Implementations handle the platform-specific work. The orchestrator never
/// holds a campaign-wide lock while a call is in flight.
#[async_trait]
pub trait ContentPublisher: Send + Sync {
    /// Publisher kind (e.g., "webhook", "simulated")
    fn name(&self) -> &str;

    /// Generate and publish one article for the request
    async fn publish(&self, request: &PublishRequest) -> anyhow::Result<PublishResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_response() {
        let response = PublishResponse::failed("quota exceeded");

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("quota exceeded"));
        assert!(response.article_url.is_none());
    }

    #[test]
    fn test_response_deserializes_sparse_payload() {
        let response: PublishResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();

        assert!(response.success);
        assert!(response.article_title.is_none());
        assert!(response.word_count.is_none());
    }

    #[test]
    fn test_request_serialization() {
        let request = PublishRequest {
            keyword: "seo".to_string(),
            anchor_text: "click here".to_string(),
            target_url: "https://example.com".to_string(),
            owner_id: "user-1".to_string(),
            platform: PlatformRef {
                id: "telegraph".to_string(),
                domain: "telegra.ph".to_string(),
            },
            idempotency_key: "abc:0".to_string(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"idempotency_key\":\"abc:0\""));
        assert!(json.contains("\"domain\":\"telegra.ph\""));
    }
}
