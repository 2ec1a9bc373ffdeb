//! Campaign Validator - checks and normalizes campaign input
//!
//! Validation runs before anything is persisted, so a rejected request
//! leaves no trace in the store.
//!
//! # Example
//!
//! ```
//! use campaign_publisher::core::NewCampaign;
//! use campaign_publisher::validation::CampaignValidator;
//!
//! let input = NewCampaign {
//!     name: "  Spring launch ".to_string(),
//!     keywords: vec!["seo".to_string()],
//!     anchor_texts: vec!["click here".to_string()],
//!     target_url: "https://example.com".to_string(),
//!     owner_id: "user-1".to_string(),
//!     auto_start: false,
//! };
//!
//! let normalized = CampaignValidator::new().normalize(input).unwrap();
//! assert_eq!(normalized.name, "Spring launch");
//! ```

use crate::core::campaign::NewCampaign;
use crate::core::error::CampaignError;
use serde::{Deserialize, Serialize};
use url::Url;

const MAX_NAME_LENGTH: usize = 200;

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Result of campaign validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
}

/// Validator for campaign creation input
#[derive(Default)]
pub struct CampaignValidator;

impl CampaignValidator {
    pub fn new() -> Self {
        Self
    }

    /// Collect every problem with the input
    pub fn validate(&self, input: &NewCampaign) -> CampaignValidationResult {
        let mut errors = Vec::new();
        let mut reject = |field: &str, message: String| {
            errors.push(FieldError {
                field: field.to_string(),
                message,
            })
        };

        let name = input.name.trim();
        if name.is_empty() {
            reject("name", "name is required".to_string());
        } else if name.chars().count() > MAX_NAME_LENGTH {
            reject(
                "name",
                format!("name must be at most {} characters", MAX_NAME_LENGTH),
            );
        }

        if input.keywords.is_empty() {
            reject("keywords", "at least one keyword is required".to_string());
        } else if input.keywords.iter().any(|k| k.trim().is_empty()) {
            reject("keywords", "keywords must not be blank".to_string());
        }

        if input.anchor_texts.is_empty() {
            reject(
                "anchor_texts",
                "at least one anchor text is required".to_string(),
            );
        } else if input.anchor_texts.iter().any(|a| a.trim().is_empty()) {
            reject("anchor_texts", "anchor texts must not be blank".to_string());
        }

        if let Err(message) = Self::check_target_url(input.target_url.trim()) {
            reject("target_url", message);
        }

        if input.owner_id.trim().is_empty() {
            reject("owner_id", "owner id is required".to_string());
        }

        CampaignValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Validate and return the input with surrounding whitespace removed
    ///
    /// The first problem found is returned as [`CampaignError::Validation`].
    pub fn normalize(&self, input: NewCampaign) -> Result<NewCampaign, CampaignError> {
        let result = self.validate(&input);
        if let Some(first) = result.errors.into_iter().next() {
            return Err(CampaignError::Validation {
                field: first.field,
                message: first.message,
            });
        }

        Ok(NewCampaign {
            name: input.name.trim().to_string(),
            keywords: input.keywords.iter().map(|k| k.trim().to_string()).collect(),
            anchor_texts: input
                .anchor_texts
                .iter()
                .map(|a| a.trim().to_string())
                .collect(),
            target_url: input.target_url.trim().to_string(),
            owner_id: input.owner_id.trim().to_string(),
            auto_start: input.auto_start,
        })
    }

    fn check_target_url(raw: &str) -> Result<(), String> {
        let url = Url::parse(raw).map_err(|e| format!("invalid target URL {:?}: {}", raw, e))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("target URL must use http or https, got {}", url.scheme()));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err("target URL must have a host".to_string());
        }

        Ok(())
    }
}
