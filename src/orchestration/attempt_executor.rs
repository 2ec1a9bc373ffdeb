//! PublishAttemptExecutor - one publish attempt for one campaign and platform
//!
//! Keyword and anchor text are drawn uniformly and independently for every
//! attempt. The random source is seedable so rotations are reproducible in
//! tests and dry runs.

use crate::core::campaign::Campaign;
use crate::core::error::CampaignError;
use crate::core::traits::{PublishRequest, PublishResponse};
use crate::plugins::{PlatformRegistry, PlatformTarget};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Normalized result of one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub success: bool,
    pub article_title: Option<String>,
    pub article_url: Option<String>,
    pub word_count: Option<u32>,
    pub error: Option<String>,
    pub keyword_used: String,
    pub anchor_text_used: String,
    pub elapsed: Duration,
}

/// Key shared by every retry of the same tick
pub fn idempotency_key(campaign_id: Uuid, rotation: u64) -> String {
    format!("{}:{}", campaign_id, rotation)
}

/// Failed attempt as a typed error; the rotation moves on either way
pub fn publish_error(platform: &PlatformTarget, message: &str) -> CampaignError {
    CampaignError::Publish {
        platform: platform.domain.clone(),
        message: message.to_string(),
    }
}

/// Executes publish attempts through the registry's publishers
pub struct PublishAttemptExecutor {
    registry: Arc<PlatformRegistry>,
    rng: Mutex<StdRng>,
}

impl PublishAttemptExecutor {
    /// # Arguments
    ///
    /// * `registry` - Platform pool and publishers
    /// * `seed` - Fixed seed for keyword/anchor selection; entropy when `None`
    pub fn new(registry: Arc<PlatformRegistry>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            registry,
            rng: Mutex::new(rng),
        }
    }

    /// Draw keyword and anchor text; `None` when either list is empty
    fn select_inputs(&self, campaign: &Campaign) -> Option<(String, String)> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let keyword = campaign.keywords.choose(&mut *rng)?.clone();
        let anchor_text = campaign.anchor_texts.choose(&mut *rng)?.clone();
        Some((keyword, anchor_text))
    }

    /// Run one attempt and record it against the platform
    ///
    /// Never fails: publisher errors, missing publishers and malformed
    /// responses all become unsuccessful outcomes.
    pub async fn execute(
        &self,
        campaign: &Campaign,
        platform: &PlatformTarget,
        rotation: u64,
    ) -> AttemptOutcome {
        let started = Instant::now();

        let Some((keyword, anchor_text)) = self.select_inputs(campaign) else {
            return self
                .finish(
                    campaign,
                    platform,
                    String::new(),
                    String::new(),
                    PublishResponse::failed("campaign has no keywords or anchor texts"),
                    started,
                )
                .await;
        };

        let response = match self.registry.publisher_for(platform).await {
            Some(publisher) => {
                let request = PublishRequest {
                    keyword: keyword.clone(),
                    anchor_text: anchor_text.clone(),
                    target_url: campaign.target_url.clone(),
                    owner_id: campaign.owner_id.clone(),
                    platform: platform.platform_ref(),
                    idempotency_key: idempotency_key(campaign.id, rotation),
                };

                match publisher.publish(&request).await {
                    Ok(response) => response,
                    Err(e) => PublishResponse::failed(e.to_string()),
                }
            }
            None => PublishResponse::failed(format!(
                "no publisher registered for kind '{}'",
                platform.publisher
            )),
        };

        self.finish(campaign, platform, keyword, anchor_text, response, started)
            .await
    }

    async fn finish(
        &self,
        campaign: &Campaign,
        platform: &PlatformTarget,
        keyword_used: String,
        anchor_text_used: String,
        response: PublishResponse,
        started: Instant,
    ) -> AttemptOutcome {
        let elapsed = started.elapsed();

        let (success, error) = match (response.success, &response.article_url) {
            (true, Some(url)) if !url.is_empty() => (true, None),
            (true, _) => (
                false,
                Some("publish reported success without an article URL".to_string()),
            ),
            (false, _) => (
                false,
                Some(
                    response
                        .error
                        .clone()
                        .unwrap_or_else(|| "publish failed without an error message".to_string()),
                ),
            ),
        };

        self.registry
            .record_attempt(&platform.id, success, elapsed)
            .await;

        if success {
            info!(
                campaign = %campaign.id,
                platform = %platform.domain,
                elapsed_ms = elapsed.as_millis() as u64,
                "article published"
            );
        } else {
            let failure = publish_error(platform, error.as_deref().unwrap_or_default());
            warn!(
                campaign = %campaign.id,
                code = failure.code(),
                recoverable = failure.is_recoverable(),
                error = %failure,
                "publish attempt failed"
            );
        }

        AttemptOutcome {
            success,
            article_title: response.article_title,
            article_url: response.article_url.filter(|_| success),
            word_count: response.word_count,
            error,
            keyword_used,
            anchor_text_used,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Scripted, ScriptedPublisher, registry_with, sample_campaign};
    use std::collections::HashSet;

    #[test]
    fn test_idempotency_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            idempotency_key(id, 7),
            "00000000-0000-0000-0000-000000000000:7"
        );
    }

    #[test]
    fn test_publish_error_names_platform() {
        let platform = PlatformTarget::new("a", "a.example", "webhook");
        let error = publish_error(&platform, "HTTP 503 from publish workflow");

        assert_eq!(error.code(), "PUBLISH_ERROR");
        assert!(error.is_recoverable());
        assert_eq!(
            error.to_string(),
            "[a.example] publish attempt failed: HTTP 503 from publish workflow"
        );
    }

    #[tokio::test]
    async fn test_successful_attempt() {
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let registry = registry_with(&["a.example"], publisher.clone()).await;
        let executor = PublishAttemptExecutor::new(registry.clone(), Some(1));
        let campaign = sample_campaign("user-1");
        let platform = registry.active_platforms().await[0].clone();

        let outcome = executor.execute(&campaign, &platform, 5).await;

        assert!(outcome.success);
        assert!(outcome.article_url.unwrap().starts_with("https://a.example/"));
        assert_eq!(outcome.keyword_used, "seo");

        let requests = publisher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].idempotency_key, idempotency_key(campaign.id, 5));
        assert_eq!(requests[0].target_url, campaign.target_url);
        assert_eq!(requests[0].owner_id, "user-1");

        let metrics = &registry.all_platforms().await[0];
        assert_eq!(metrics.attempts, 1);
        assert_eq!(metrics.successes, 1);
    }

    #[tokio::test]
    async fn test_failed_and_erroring_attempts_are_normalized() {
        let publisher = Arc::new(ScriptedPublisher::with_script(vec![
            Scripted::Failure("quota exceeded".to_string()),
            Scripted::Error("connection reset".to_string()),
            Scripted::MissingUrl,
        ]));
        let registry = registry_with(&["a.example"], publisher).await;
        let executor = PublishAttemptExecutor::new(registry.clone(), Some(1));
        let campaign = sample_campaign("user-1");
        let platform = registry.active_platforms().await[0].clone();

        let first = executor.execute(&campaign, &platform, 0).await;
        assert!(!first.success);
        assert_eq!(first.error.as_deref(), Some("quota exceeded"));

        let second = executor.execute(&campaign, &platform, 1).await;
        assert!(!second.success);
        assert!(second.error.unwrap().contains("connection reset"));

        let third = executor.execute(&campaign, &platform, 2).await;
        assert!(!third.success);
        assert!(third.article_url.is_none());

        let metrics = &registry.all_platforms().await[0];
        assert_eq!(metrics.attempts, 3);
        assert_eq!(metrics.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_missing_publisher_is_a_failed_attempt() {
        let registry = Arc::new(PlatformRegistry::new());
        registry
            .register_platform(PlatformTarget::new("a", "a.example", "nowhere"))
            .await;
        let executor = PublishAttemptExecutor::new(registry.clone(), Some(1));
        let platform = registry.active_platforms().await[0].clone();

        let outcome = executor
            .execute(&sample_campaign("user-1"), &platform, 0)
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("nowhere"));
    }

    #[tokio::test]
    async fn test_keyword_and_anchor_drawn_independently() {
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let registry = registry_with(&["a.example"], publisher.clone()).await;
        let executor = PublishAttemptExecutor::new(registry.clone(), Some(99));
        let platform = registry.active_platforms().await[0].clone();

        let mut campaign = sample_campaign("user-1");
        campaign.keywords = vec!["k1".to_string(), "k2".to_string()];
        campaign.anchor_texts = vec!["a1".to_string(), "a2".to_string()];

        for rotation in 0..64 {
            executor.execute(&campaign, &platform, rotation).await;
        }

        let pairs: HashSet<(String, String)> = publisher
            .requests()
            .into_iter()
            .map(|r| (r.keyword, r.anchor_text))
            .collect();
        assert_eq!(pairs.len(), 4);
    }

    #[tokio::test]
    async fn test_same_seed_same_selection() {
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let registry = registry_with(&["a.example"], publisher.clone()).await;
        let platform = registry.active_platforms().await[0].clone();

        let mut campaign = sample_campaign("user-1");
        campaign.keywords = (0..10).map(|i| format!("k{}", i)).collect();

        for _ in 0..2 {
            let executor = PublishAttemptExecutor::new(registry.clone(), Some(7));
            for rotation in 0..5 {
                executor.execute(&campaign, &platform, rotation).await;
            }
        }

        let keywords: Vec<String> = publisher.requests().into_iter().map(|r| r.keyword).collect();
        assert_eq!(keywords[..5], keywords[5..]);
    }
}
