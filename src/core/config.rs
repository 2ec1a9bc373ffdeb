//! Configuration structures and types for campaign-publisher
//!
//! This module provides type-safe configuration management with serde support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignConfig {
    /// Schema version (required)
    pub version: String,

    /// Extend from base configuration file (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Rotation timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerConfig>,

    /// Campaign store location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Publishing targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<PlatformConfig>>,

    /// Publisher backends keyed by kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishers: Option<PublishersConfig>,

    /// Environment variable expansion settings
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "envVarExpansion"
    )]
    pub env_var_expansion: Option<EnvVarExpansionConfig>,

    /// Seed for keyword/anchor selection (random when unset)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "randomSeed")]
    pub random_seed: Option<u64>,
}

/// Scheduler timing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// Delay before the next tick after a successful attempt (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "successDelaySecs")]
    pub success_delay_secs: Option<u64>,

    /// Delay before the next tick after a failed attempt (default: 60)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "failureDelaySecs")]
    pub failure_delay_secs: Option<u64>,

    /// Delay before the first tick after start/resume (default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "initialDelaySecs")]
    pub initial_delay_secs: Option<u64>,

    /// Interval of the daemon recovery sweep (default: 60)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "recoveryIntervalSecs"
    )]
    pub recovery_interval_secs: Option<u64>,
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Path of the JSON store file (default: .campaign-publisher/campaigns.json)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// One publishing target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformConfig {
    pub id: String,
    pub domain: String,

    /// Display name (default: domain)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, rename = "domainRating")]
    pub domain_rating: u32,

    /// Publisher kind handling this platform (e.g., "webhook", "simulated")
    pub publisher: String,

    /// Include in the rotation pool (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Publisher backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublishersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookPublisherConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated: Option<SimulatedPublisherConfig>,
}

/// Webhook publisher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookPublisherConfig {
    /// Endpoint of the content/publish workflow (environment variable expansion supported)
    pub endpoint: String,

    /// Bearer token (environment variable expansion supported)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds (default: 300)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,

    /// Attempts per publish call for transient failures (default: 3)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "maxAttempts")]
    pub max_attempts: Option<u32>,
}

/// Simulated publisher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimulatedPublisherConfig {
    /// Probability in [0, 1] that an attempt fails (default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "failureRate")]
    pub failure_rate: Option<f64>,

    /// Artificial latency per attempt (default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "latencyMs")]
    pub latency_ms: Option<u64>,
}

/// Environment variable expansion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvVarExpansionConfig {
    /// Enable environment variable expansion (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Allowed environment variable prefixes (default: all)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "allowedPrefixes")]
    pub allowed_prefixes: Option<Vec<String>>,
}

pub const DEFAULT_SUCCESS_DELAY_SECS: u64 = 30;
pub const DEFAULT_FAILURE_DELAY_SECS: u64 = 60;
pub const DEFAULT_RECOVERY_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_STORE_PATH: &str = ".campaign-publisher/campaigns.json";

impl CampaignConfig {
    /// Configuration with every field unset; used as an overlay layer
    pub fn empty() -> Self {
        Self {
            version: String::new(),
            extends: None,
            scheduler: None,
            store: None,
            platforms: None,
            publishers: None,
            env_var_expansion: None,
            random_seed: None,
        }
    }

    pub fn success_delay(&self) -> Duration {
        Duration::from_secs(
            self.scheduler
                .as_ref()
                .and_then(|s| s.success_delay_secs)
                .unwrap_or(DEFAULT_SUCCESS_DELAY_SECS),
        )
    }

    pub fn failure_delay(&self) -> Duration {
        Duration::from_secs(
            self.scheduler
                .as_ref()
                .and_then(|s| s.failure_delay_secs)
                .unwrap_or(DEFAULT_FAILURE_DELAY_SECS),
        )
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(
            self.scheduler
                .as_ref()
                .and_then(|s| s.initial_delay_secs)
                .unwrap_or(0),
        )
    }

    pub fn recovery_interval(&self) -> Duration {
        Duration::from_secs(
            self.scheduler
                .as_ref()
                .and_then(|s| s.recovery_interval_secs)
                .unwrap_or(DEFAULT_RECOVERY_INTERVAL_SECS),
        )
    }

    pub fn store_path(&self) -> PathBuf {
        self.store
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    pub fn platforms(&self) -> &[PlatformConfig] {
        self.platforms.as_deref().unwrap_or_default()
    }
}

/// Default configuration values
impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            extends: None,
            scheduler: Some(SchedulerConfig {
                success_delay_secs: Some(DEFAULT_SUCCESS_DELAY_SECS),
                failure_delay_secs: Some(DEFAULT_FAILURE_DELAY_SECS),
                initial_delay_secs: Some(0),
                recovery_interval_secs: Some(DEFAULT_RECOVERY_INTERVAL_SECS),
            }),
            store: None,
            platforms: None,
            publishers: None,
            env_var_expansion: Some(EnvVarExpansionConfig {
                enabled: Some(true),
                allowed_prefixes: None,
            }),
            random_seed: None,
        }
    }
}

/// Sample configuration written by `campaign-publisher init`
pub const SAMPLE_CONFIG: &str = r#"version: "1.0"
scheduler:
  successDelaySecs: 30
  failureDelaySecs: 60
  recoveryIntervalSecs: 60
store:
  path: .campaign-publisher/campaigns.json
platforms:
  - id: telegraph
    domain: telegra.ph
    name: Telegraph
    domainRating: 91
    publisher: webhook
  - id: writeas
    domain: write.as
    name: Write.as
    domainRating: 88
    publisher: webhook
  - id: sandbox
    domain: sandbox.local
    publisher: simulated
    active: false
publishers:
  webhook:
    endpoint: ${CAMPAIGN_WEBHOOK_URL}
    token: ${CAMPAIGN_WEBHOOK_TOKEN}
    timeoutSecs: 300
  simulated:
    failureRate: 0.1
    latencyMs: 200
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CampaignConfig::default();

        assert_eq!(config.version, "1.0");
        assert_eq!(config.success_delay(), Duration::from_secs(30));
        assert_eq!(config.failure_delay(), Duration::from_secs(60));
        assert_eq!(config.initial_delay(), Duration::ZERO);
        assert_eq!(config.store_path(), PathBuf::from(DEFAULT_STORE_PATH));
        assert!(config.platforms().is_empty());
    }

    #[test]
    fn test_serialize_config() {
        let config = CampaignConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(yaml.contains("version: '1.0'"));
        assert!(yaml.contains("successDelaySecs: 30"));
    }

    #[test]
    fn test_deserialize_minimal_config() {
        let yaml = r#"
version: "1.0"
platforms:
  - id: medium
    domain: medium.com
    publisher: webhook
"#;
        let config: CampaignConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.platforms().len(), 1);
        assert_eq!(config.platforms()[0].domain, "medium.com");
        assert_eq!(config.platforms()[0].active, None);
        assert!(config.scheduler.is_none());
        // Falls back to built-in timing
        assert_eq!(config.success_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_sample_config_parses() {
        let config: CampaignConfig = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();

        assert_eq!(config.platforms().len(), 3);
        assert_eq!(config.platforms()[2].active, Some(false));
        let publishers = config.publishers.unwrap();
        assert_eq!(
            publishers.simulated.unwrap().failure_rate,
            Some(0.1)
        );
        assert_eq!(
            publishers.webhook.unwrap().endpoint,
            "${CAMPAIGN_WEBHOOK_URL}"
        );
    }
}
