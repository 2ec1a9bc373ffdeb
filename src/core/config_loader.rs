//! Configuration file loader for campaign-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::CampaignError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".campaign-config.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Publisher kinds this build knows how to construct
pub const KNOWN_PUBLISHERS: &[&str] = &["webhook", "simulated"];

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Explicit config file (replaces the project file when set)
    pub config_file: Option<PathBuf>,

    /// Read ~/.campaign-config.yaml
    pub include_global: bool,

    /// CLI overrides (highest priority)
    pub cli_overrides: Option<CampaignConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    pub valid: bool,
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "platforms[0].domain")
    pub field: String,
    pub message: String,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI overrides
    /// 2. Environment variables
    /// 3. Project config (./.campaign-config.yaml or the explicit file)
    /// 4. Global config (~/.campaign-config.yaml)
    /// 5. Default values
    ///
    /// The merged result is validated; errors abort the load.
    pub async fn load(options: ConfigLoadOptions) -> Result<CampaignConfig, CampaignError> {
        let mut configs: Vec<CampaignConfig> = vec![CampaignConfig::default()];

        if options.include_global
            && let Some(global_config) = Self::load_global_config().await?
        {
            configs.push(global_config);
        }

        let project_file = options
            .config_file
            .clone()
            .unwrap_or_else(|| options.project_path.join(CONFIG_FILENAME));
        if let Some(project_config) = Self::load_config_file(&project_file).await? {
            configs.push(project_config);
        } else if options.config_file.is_some() {
            return Err(CampaignError::Config(format!(
                "config file not found: {}",
                project_file.display()
            )));
        }

        if let Some(env_config) = Self::load_env_config(&options.env)? {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_overrides {
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);
        let expanded_config = Self::expand_env_vars(merged_config, &options.env)?;

        let validation = Self::validate(&expanded_config);
        for warning in &validation.warnings {
            warn!(field = %warning.field, "{}", warning.message);
        }
        if !validation.valid {
            return Err(CampaignError::Config(Self::format_validation_result(
                &validation,
            )));
        }

        Ok(expanded_config)
    }

    /// Load global configuration from ~/.campaign-config.yaml
    async fn load_global_config() -> Result<Option<CampaignConfig>, CampaignError> {
        let Ok(home_dir) = env::var("HOME") else {
            return Ok(None);
        };
        Self::load_config_file(&PathBuf::from(home_dir).join(CONFIG_FILENAME)).await
    }

    /// Load configuration from YAML file, following `extends`
    async fn load_config_file(file_path: &Path) -> Result<Option<CampaignConfig>, CampaignError> {
        Self::load_config_chain(file_path, &mut Vec::new()).await
    }

    /// `visited` holds the canonical paths already on the `extends` chain
    fn load_config_chain<'a>(
        file_path: &'a Path,
        visited: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Option<CampaignConfig>, CampaignError>>
                + Send
                + 'a,
        >,
    > {
        Box::pin(async move {
            if fs::metadata(file_path).await.is_err() {
                return Ok(None);
            }

            let canonical = fs::canonicalize(file_path).await.map_err(|e| {
                CampaignError::Config(format!(
                    "failed to resolve {}: {}",
                    file_path.display(),
                    e
                ))
            })?;
            if visited.contains(&canonical) {
                return Err(CampaignError::Config(format!(
                    "circular extends: {} is already part of the chain",
                    canonical.display()
                )));
            }
            visited.push(canonical);

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                CampaignError::Config(format!(
                    "failed to read {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            let config: CampaignConfig = serde_yaml::from_str(&content).map_err(|e| {
                CampaignError::Config(format!(
                    "failed to parse {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            if let Some(extends_path) = &config.extends {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| CampaignError::Config("invalid config file path".to_string()))?
                    .join(extends_path);

                match Self::load_config_chain(&base_path, visited).await? {
                    Some(base_config) => {
                        return Ok(Some(Self::merge_configs(vec![base_config, config])));
                    }
                    None => {
                        return Err(CampaignError::Config(format!(
                            "extended config not found: {}",
                            base_path.display()
                        )));
                    }
                }
            }

            Ok(Some(config))
        })
    }

    /// Load configuration from environment variables
    fn load_env_config(
        env: &HashMap<String, String>,
    ) -> Result<Option<CampaignConfig>, CampaignError> {
        let mut config = CampaignConfig::empty();
        let mut has_changes = false;

        let parse_secs = |name: &str| -> Result<Option<u64>, CampaignError> {
            env.get(name)
                .map(|raw| {
                    raw.trim().parse::<u64>().map_err(|_| {
                        CampaignError::Config(format!("{name} must be a whole number, got {raw:?}"))
                    })
                })
                .transpose()
        };

        let success = parse_secs("CAMPAIGN_SUCCESS_DELAY_SECS")?;
        let failure = parse_secs("CAMPAIGN_FAILURE_DELAY_SECS")?;
        if success.is_some() || failure.is_some() {
            config.scheduler = Some(SchedulerConfig {
                success_delay_secs: success,
                failure_delay_secs: failure,
                ..Default::default()
            });
            has_changes = true;
        }

        if let Some(path) = env.get("CAMPAIGN_STORE_PATH") {
            config.store = Some(StoreConfig {
                path: Some(PathBuf::from(path)),
            });
            has_changes = true;
        }

        if let Some(seed) = parse_secs("CAMPAIGN_RANDOM_SEED")? {
            config.random_seed = Some(seed);
            has_changes = true;
        }

        Ok(if has_changes { Some(config) } else { None })
    }

    /// Merge multiple configurations with priority (later wins)
    fn merge_configs(configs: Vec<CampaignConfig>) -> CampaignConfig {
        let mut result = CampaignConfig::empty();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut CampaignConfig, source: CampaignConfig) {
        if !source.version.is_empty() {
            target.version = source.version;
        }

        if source.extends.is_some() {
            target.extends = source.extends;
        }

        if let Some(source_scheduler) = source.scheduler {
            let target_scheduler = target.scheduler.get_or_insert_with(SchedulerConfig::default);

            if source_scheduler.success_delay_secs.is_some() {
                target_scheduler.success_delay_secs = source_scheduler.success_delay_secs;
            }
            if source_scheduler.failure_delay_secs.is_some() {
                target_scheduler.failure_delay_secs = source_scheduler.failure_delay_secs;
            }
            if source_scheduler.initial_delay_secs.is_some() {
                target_scheduler.initial_delay_secs = source_scheduler.initial_delay_secs;
            }
            if source_scheduler.recovery_interval_secs.is_some() {
                target_scheduler.recovery_interval_secs = source_scheduler.recovery_interval_secs;
            }
        }

        if let Some(source_store) = source.store
            && source_store.path.is_some()
        {
            target.store = Some(source_store);
        }

        // Platform lists replace rather than append
        if source.platforms.is_some() {
            target.platforms = source.platforms;
        }

        if let Some(source_publishers) = source.publishers {
            let target_publishers = target
                .publishers
                .get_or_insert_with(PublishersConfig::default);

            if source_publishers.webhook.is_some() {
                target_publishers.webhook = source_publishers.webhook;
            }
            if source_publishers.simulated.is_some() {
                target_publishers.simulated = source_publishers.simulated;
            }
        }

        if source.env_var_expansion.is_some() {
            target.env_var_expansion = source.env_var_expansion;
        }

        if source.random_seed.is_some() {
            target.random_seed = source.random_seed;
        }
    }

    /// Expand environment variables in publisher settings
    ///
    /// Only `${VAR_NAME}` references are expanded, and only for names allowed
    /// by `envVarExpansion.allowedPrefixes` when that list is configured.
    fn expand_env_vars(
        mut config: CampaignConfig,
        env: &HashMap<String, String>,
    ) -> Result<CampaignConfig, CampaignError> {
        let expansion = config.env_var_expansion.clone().unwrap_or_default();
        if !expansion.enabled.unwrap_or(true) {
            return Ok(config);
        }

        let allowed_prefixes = expansion.allowed_prefixes;

        if let Some(webhook) = config
            .publishers
            .as_mut()
            .and_then(|p| p.webhook.as_mut())
        {
            webhook.endpoint = Self::expand_string(&webhook.endpoint, env, &allowed_prefixes)?;
            if let Some(token) = &webhook.token {
                webhook.token = Some(Self::expand_string(token, env, &allowed_prefixes)?);
            }
        }

        Ok(config)
    }

    /// Expand environment variables in a single string
    fn expand_string(
        input: &str,
        env: &HashMap<String, String>,
        allowed_prefixes: &Option<Vec<String>>,
    ) -> Result<String, CampaignError> {
        let env_var_regex =
            Regex::new(ENV_VAR_PATTERN).map_err(|e| CampaignError::Config(e.to_string()))?;

        let mut result = input.to_string();
        for cap in env_var_regex.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(prefixes) = allowed_prefixes
                && !prefixes.iter().any(|prefix| var_name.starts_with(prefix))
            {
                warn!(var = var_name, "environment variable not allowed by prefix whitelist, skipping");
                continue;
            }

            match env.get(var_name) {
                Some(value) => {
                    result = result.replace(&format!("${{{}}}", var_name), value);
                }
                None => warn!(var = var_name, "environment variable not set"),
            }
        }

        Ok(result)
    }

    /// Validate configuration
    pub fn validate(config: &CampaignConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "version is required".to_string(),
            });
        } else if config.version != "1.0" {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("unknown version: {}", config.version),
                suggestion: Some("the only supported version is \"1.0\"".to_string()),
            });
        }

        Self::validate_platforms(config, &mut errors, &mut warnings);
        Self::validate_publishers(config, &mut errors, &mut warnings);

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn validate_platforms(
        config: &CampaignConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        let mut ids = HashSet::new();
        let mut domains = HashSet::new();

        for (i, platform) in config.platforms().iter().enumerate() {
            let field = |name: &str| format!("platforms[{}].{}", i, name);

            if platform.id.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: field("id"),
                    message: "id is required".to_string(),
                });
            } else if !ids.insert(platform.id.as_str()) {
                errors.push(ConfigValidationError {
                    field: field("id"),
                    message: format!("duplicate platform id: {}", platform.id),
                });
            }

            if platform.domain.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: field("domain"),
                    message: "domain is required".to_string(),
                });
            } else if platform.domain.contains("://") || platform.domain.contains('/') {
                errors.push(ConfigValidationError {
                    field: field("domain"),
                    message: format!("domain must be a bare host name: {}", platform.domain),
                });
            } else if !domains.insert(platform.domain.to_lowercase()) {
                errors.push(ConfigValidationError {
                    field: field("domain"),
                    message: format!("duplicate platform domain: {}", platform.domain),
                });
            }

            if !KNOWN_PUBLISHERS.contains(&platform.publisher.as_str()) {
                errors.push(ConfigValidationError {
                    field: field("publisher"),
                    message: format!(
                        "unknown publisher '{}' (expected one of: {})",
                        platform.publisher,
                        KNOWN_PUBLISHERS.join(", ")
                    ),
                });
            }
        }

        if !config.platforms().is_empty()
            && !config.platforms().iter().any(|p| p.active.unwrap_or(true))
        {
            warnings.push(ConfigValidationWarning {
                field: "platforms".to_string(),
                message: "no platform is active; campaigns cannot be started".to_string(),
                suggestion: Some("set `active: true` on at least one platform".to_string()),
            });
        }
    }

    fn validate_publishers(
        config: &CampaignConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        let publishers = config.publishers.clone().unwrap_or_default();
        let uses = |kind: &str| config.platforms().iter().any(|p| p.publisher == kind);

        match &publishers.webhook {
            Some(webhook) => {
                if webhook.endpoint.trim().is_empty() {
                    errors.push(ConfigValidationError {
                        field: "publishers.webhook.endpoint".to_string(),
                        message: "endpoint is required".to_string(),
                    });
                } else if webhook.endpoint.contains("${") {
                    warnings.push(ConfigValidationWarning {
                        field: "publishers.webhook.endpoint".to_string(),
                        message: "endpoint references an unset environment variable".to_string(),
                        suggestion: Some(
                            "export the variable before running the daemon".to_string(),
                        ),
                    });
                }

                if webhook.timeout_secs == Some(0) {
                    warnings.push(ConfigValidationWarning {
                        field: "publishers.webhook.timeoutSecs".to_string(),
                        message: "a zero timeout fails every request".to_string(),
                        suggestion: None,
                    });
                }
            }
            None if uses("webhook") => errors.push(ConfigValidationError {
                field: "publishers.webhook".to_string(),
                message: "a platform uses the webhook publisher but it is not configured"
                    .to_string(),
            }),
            None => {}
        }

        if let Some(rate) = publishers.simulated.as_ref().and_then(|s| s.failure_rate)
            && !(0.0..=1.0).contains(&rate)
        {
            errors.push(ConfigValidationError {
                field: "publishers.simulated.failureRate".to_string(),
                message: format!("failure rate must be within [0, 1], got {}", rate),
            });
        }
    }

    /// Format validation result for display
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("configuration is valid".to_string());
        } else {
            lines.push("configuration is invalid".to_string());
        }

        for error in &result.errors {
            lines.push(format!("  error [{}]: {}", error.field, error.message));
        }

        for warning in &result.warnings {
            let mut line = format!("  warning [{}]: {}", warning.field, warning.message);
            if let Some(suggestion) = &warning.suggestion {
                line.push_str(&format!(" ({})", suggestion));
            }
            lines.push(line);
        }

        lines.join("\n")
    }
}
