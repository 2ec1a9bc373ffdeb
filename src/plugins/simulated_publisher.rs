//! Simulated Publisher - offline stand-in for the content/publish workflow
//!
//! Produces plausible articles without any network traffic. Useful for dry
//! runs, demos and sandbox platforms.

use crate::core::traits::{ContentPublisher, PublishRequest, PublishResponse};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// Publisher that fabricates results locally
pub struct SimulatedPublisher {
    failure_rate: f64,
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedPublisher {
    /// Create a simulated publisher
    ///
    /// # Arguments
    ///
    /// * `failure_rate` - Probability in [0, 1] that an attempt fails
    /// * `latency` - Delay applied to every attempt
    /// * `seed` - Fixed seed for reproducible runs
    pub fn new(failure_rate: f64, latency: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            latency,
            rng: Mutex::new(rng),
        }
    }

    /// Draw the outcome and word count; the lock is never held across an await
    fn roll(&self) -> (bool, u32) {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let failed = rng.gen_bool(self.failure_rate);
        (failed, rng.gen_range(600..=1400))
    }
}

#[async_trait]
impl ContentPublisher for SimulatedPublisher {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn publish(&self, request: &PublishRequest) -> anyhow::Result<PublishResponse> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let (failed, word_count) = self.roll();
        if failed {
            return Ok(PublishResponse::failed(format!(
                "simulated failure on {}",
                request.platform.domain
            )));
        }

        let rotation = request
            .idempotency_key
            .rsplit(':')
            .next()
            .unwrap_or_default();

        Ok(PublishResponse {
            success: true,
            article_title: Some(format!("{}: A Practical Guide", title_case(&request.keyword))),
            article_url: Some(format!(
                "https://{}/{}-{}",
                request.platform.domain,
                slugify(&request.keyword),
                rotation
            )),
            word_count: Some(word_count),
            error: None,
        })
    }
}

fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::PlatformRef;

    fn request(key: &str) -> PublishRequest {
        PublishRequest {
            keyword: "local seo tips".to_string(),
            anchor_text: "click here".to_string(),
            target_url: "https://example.com".to_string(),
            owner_id: "user-1".to_string(),
            platform: PlatformRef {
                id: "sandbox".to_string(),
                domain: "sandbox.local".to_string(),
            },
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_always_succeeds_with_zero_failure_rate() {
        let publisher = SimulatedPublisher::new(0.0, Duration::ZERO, Some(1));

        let response = publisher.publish(&request("abc:4")).await.unwrap();

        assert!(response.success);
        assert_eq!(
            response.article_url.as_deref(),
            Some("https://sandbox.local/local-seo-tips-4")
        );
        assert_eq!(
            response.article_title.as_deref(),
            Some("Local Seo Tips: A Practical Guide")
        );
        let words = response.word_count.unwrap();
        assert!((600..=1400).contains(&words));
    }

    #[tokio::test]
    async fn test_always_fails_with_full_failure_rate() {
        let publisher = SimulatedPublisher::new(1.0, Duration::ZERO, Some(1));

        let response = publisher.publish(&request("abc:0")).await.unwrap();

        assert!(!response.success);
        assert!(response.error.unwrap().contains("sandbox.local"));
    }

    #[tokio::test]
    async fn test_same_seed_same_outcomes() {
        let a = SimulatedPublisher::new(0.5, Duration::ZERO, Some(42));
        let b = SimulatedPublisher::new(0.5, Duration::ZERO, Some(42));

        for i in 0..10 {
            let key = format!("abc:{}", i);
            assert_eq!(
                a.publish(&request(&key)).await.unwrap(),
                b.publish(&request(&key)).await.unwrap()
            );
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Best  SEO, tools!"), "best-seo-tools");
    }
}
