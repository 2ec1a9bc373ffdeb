//! Error handling for campaign orchestration
//!
//! This module provides the error taxonomy for campaign operations with
//! recovery guidance, using the thiserror crate for ergonomic error handling.

use crate::core::state_machine::CampaignStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Main error type for campaign operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CampaignError {
    // Input errors
    #[error("[{field}] validation failed: {message}")]
    Validation { field: String, message: String },

    #[error("campaign {id} not found")]
    NotFound { id: Uuid },

    #[error("campaign {id} is not owned by {owner_id}")]
    Authorization { id: Uuid, owner_id: String },

    // State errors
    #[error("invalid status transition: {from} → {to}")]
    InvalidTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },

    #[error("campaign {id} is already active")]
    AlreadyActive { id: Uuid },

    // Storage errors
    #[error("persistence failure: {message}")]
    Persistence { message: String },

    #[error("store schema mismatch: expected version {expected}, found {found}")]
    SchemaMismatch { expected: u32, found: u32 },

    // Execution errors
    #[error("[{platform}] publish attempt failed: {message}")]
    Publish { platform: String, message: String },

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CampaignError {
    /// Shorthand for a validation error on a single field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a persistence error
    pub fn persistence(message: impl std::fmt::Display) -> Self {
        Self::Persistence {
            message: message.to_string(),
        }
    }

    /// Check if retrying the same call later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Persistence { .. } | Self::Publish { .. } | Self::Scheduler(_)
        )
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Validation { .. } => vec![
                "Provide at least one keyword and one anchor text",
                "Use an absolute http(s) target URL",
            ],
            Self::NotFound { .. } => vec!["Check the campaign id with `campaign-publisher list`"],
            Self::Authorization { .. } => {
                vec!["Only the campaign owner may delete or modify it"]
            }
            Self::InvalidTransition { .. } => vec![
                "Completed and failed campaigns cannot be restarted",
                "Only active campaigns can be paused",
            ],
            Self::AlreadyActive { .. } => vec!["Pause the campaign before starting it again"],
            Self::Persistence { .. } => vec![
                "Check that the store path is writable",
                "Retry the operation",
            ],
            Self::SchemaMismatch { .. } => vec![
                "Migrate the store file to the current schema version",
                "Point store.path at a fresh file",
            ],
            Self::Publish { .. } => vec![
                "Check the publisher endpoint and credentials",
                "The campaign will continue with the next platform",
            ],
            Self::Scheduler(_) => vec!["Inspect the logs and restart the campaign as a new one"],
            Self::Config(_) => vec![
                "Run `campaign-publisher init` to generate a sample configuration",
                "Validate .campaign-config.yaml against the documented schema",
            ],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Authorization { .. } => "AUTHORIZATION_ERROR",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyActive { .. } => "ALREADY_ACTIVE",
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::Publish { .. } => "PUBLISH_ERROR",
            Self::Scheduler(_) => "SCHEDULER_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// User-visible result of a mutation operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            code: None,
        }
    }
}

impl<T> From<&Result<T, CampaignError>> for OperationResult {
    fn from(result: &Result<T, CampaignError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
                code: Some(e.code().to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = CampaignError::validation("keywords", "at least one keyword is required");

        assert_eq!(error.code(), "VALIDATION_ERROR");
        assert!(!error.is_recoverable());
        assert!(error.to_string().contains("keywords"));
        assert!(!error.suggested_actions().is_empty());
    }

    #[test]
    fn test_not_found_error() {
        let id = Uuid::new_v4();
        let error = CampaignError::NotFound { id };

        assert_eq!(error.code(), "NOT_FOUND");
        assert!(error.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_persistence_error_is_recoverable() {
        let error = CampaignError::persistence("disk full");

        assert!(error.is_recoverable());
        assert_eq!(error.code(), "PERSISTENCE_ERROR");
        assert!(error.to_string().contains("disk full"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let error = CampaignError::InvalidTransition {
            from: CampaignStatus::Completed,
            to: CampaignStatus::Active,
        };

        assert_eq!(error.to_string(), "invalid status transition: completed → active");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_publish_error_with_platform() {
        let error = CampaignError::Publish {
            platform: "telegra.ph".to_string(),
            message: "HTTP 503".to_string(),
        };

        assert!(error.is_recoverable());
        let msg = error.to_string();
        assert!(msg.contains("telegra.ph"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn test_operation_result_from_ok() {
        let result: Result<(), CampaignError> = Ok(());
        let outcome = OperationResult::from(&result);

        assert!(outcome.success);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_operation_result_from_err() {
        let result: Result<(), CampaignError> = Err(CampaignError::AlreadyActive {
            id: Uuid::nil(),
        });
        let outcome = OperationResult::from(&result);

        assert!(!outcome.success);
        assert_eq!(outcome.code.as_deref(), Some("ALREADY_ACTIVE"));

        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"success\":false"));
    }
}
