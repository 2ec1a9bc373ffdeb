//! Platform Registry - configured publishing targets and their publishers
//!
//! This module holds the platform pool shared by all campaigns:
//! - Ordered platform targets built from configuration
//! - Publisher backends keyed by kind ("webhook", "simulated", ...)
//! - Per-platform health metrics updated after every attempt
//!
//! # Example
//!
//! ```no_run
//! use campaign_publisher::plugins::PlatformRegistry;
//!
//! # async fn example() {
//! let registry = PlatformRegistry::new();
//! let pool = registry.active_platforms().await;
//!
//! println!("{} platforms in rotation", pool.len());
//! # }
//! ```

use super::simulated_publisher::SimulatedPublisher;
use super::webhook_publisher::WebhookPublisher;
use crate::core::config::CampaignConfig;
use crate::core::error::CampaignError;
use crate::core::traits::{ContentPublisher, PlatformRef};
use crate::security::SecureTokenManager;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// One publishing target with its health metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTarget {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub domain_rating: u32,
    /// successes / attempts; 0 before the first attempt
    pub success_rate: f64,
    /// Running mean over all attempts
    pub avg_response_time_ms: u64,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub attempts: u64,
    pub successes: u64,
    /// Publisher kind handling this platform
    pub publisher: String,
}

impl PlatformTarget {
    pub fn new(id: impl Into<String>, domain: impl Into<String>, publisher: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            id: id.into(),
            name: domain.clone(),
            domain,
            domain_rating: 0,
            success_rate: 0.0,
            avg_response_time_ms: 0,
            is_active: true,
            last_used: None,
            attempts: 0,
            successes: 0,
            publisher: publisher.into(),
        }
    }

    pub fn platform_ref(&self) -> PlatformRef {
        PlatformRef {
            id: self.id.clone(),
            domain: self.domain.clone(),
        }
    }
}

/// Platform pool shared by every campaign
#[derive(Default)]
pub struct PlatformRegistry {
    platforms: RwLock<Vec<PlatformTarget>>,
    publishers: RwLock<HashMap<String, Arc<dyn ContentPublisher>>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from a loaded configuration
    ///
    /// Publishers are constructed only for kinds the configuration mentions.
    /// A webhook publisher whose endpoint cannot be resolved is skipped with a
    /// warning; attempts on its platforms then fail and the rotation moves on.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `tokens` - Publisher credentials
    pub async fn from_config(
        config: &CampaignConfig,
        tokens: &SecureTokenManager,
    ) -> Result<Self, CampaignError> {
        let registry = Self::new();
        let publishers = config.publishers.clone().unwrap_or_default();
        let uses = |kind: &str| config.platforms().iter().any(|p| p.publisher == kind);

        if let Some(webhook) = &publishers.webhook {
            if !tokens.has_token("webhook") && webhook.token.is_none() {
                warn!(
                    env_var = tokens.get_token_name("webhook").unwrap_or_default(),
                    "webhook publisher has no token, sending unauthenticated requests"
                );
            }
            match WebhookPublisher::new(webhook, tokens.get_token("webhook")) {
                Ok(publisher) => registry.register_publisher(Arc::new(publisher)).await,
                Err(e) => warn!(
                    error = %tokens.mask_tokens_in_string(&e.to_string()),
                    "webhook publisher disabled"
                ),
            }
        }

        if publishers.simulated.is_some() || uses("simulated") {
            let simulated = publishers.simulated.unwrap_or_default();
            let publisher = SimulatedPublisher::new(
                simulated.failure_rate.unwrap_or(0.0),
                Duration::from_millis(simulated.latency_ms.unwrap_or(0)),
                config.random_seed,
            );
            registry.register_publisher(Arc::new(publisher)).await;
        }

        for platform in config.platforms() {
            let mut target =
                PlatformTarget::new(&platform.id, &platform.domain, &platform.publisher);
            if let Some(name) = &platform.name {
                target.name = name.clone();
            }
            target.domain_rating = platform.domain_rating;
            target.is_active = platform.active.unwrap_or(true);
            registry.register_platform(target).await;
        }

        Ok(registry)
    }

    /// Add a platform, replacing any existing one with the same id
    pub async fn register_platform(&self, target: PlatformTarget) {
        let mut platforms = self.platforms.write().await;
        match platforms.iter_mut().find(|p| p.id == target.id) {
            Some(existing) => *existing = target,
            None => platforms.push(target),
        }
    }

    /// Register a publisher under its [`ContentPublisher::name`]
    pub async fn register_publisher(&self, publisher: Arc<dyn ContentPublisher>) {
        debug!(publisher = publisher.name(), "publisher registered");
        self.publishers
            .write()
            .await
            .insert(publisher.name().to_string(), publisher);
    }

    pub async fn publisher_for(&self, platform: &PlatformTarget) -> Option<Arc<dyn ContentPublisher>> {
        self.publishers.read().await.get(&platform.publisher).cloned()
    }

    /// Active platforms in registration order; this is the rotation pool
    pub async fn active_platforms(&self) -> Vec<PlatformTarget> {
        self.platforms
            .read()
            .await
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect()
    }

    pub async fn all_platforms(&self) -> Vec<PlatformTarget> {
        self.platforms.read().await.clone()
    }

    /// Toggle whether a platform takes part in the rotation
    pub async fn set_active(&self, id: &str, active: bool) -> Result<(), CampaignError> {
        let mut platforms = self.platforms.write().await;
        let platform = platforms
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CampaignError::validation("platform", format!("unknown platform: {}", id)))?;
        platform.is_active = active;
        Ok(())
    }

    /// Record one attempt against a platform
    ///
    /// Counters, rate, mean latency and `last_used` change under a single
    /// write lock, so concurrent campaigns never lose an update.
    pub async fn record_attempt(&self, id: &str, success: bool, elapsed: Duration) {
        let mut platforms = self.platforms.write().await;
        let Some(platform) = platforms.iter_mut().find(|p| p.id == id) else {
            warn!(platform = id, "attempt recorded for unknown platform");
            return;
        };

        let elapsed_ms = elapsed.as_millis() as u64;
        platform.avg_response_time_ms = (platform.avg_response_time_ms * platform.attempts
            + elapsed_ms)
            / (platform.attempts + 1);
        platform.attempts += 1;
        if success {
            platform.successes += 1;
        }
        platform.success_rate = platform.successes as f64 / platform.attempts as f64;
        platform.last_used = Some(Utc::now());
    }
}
