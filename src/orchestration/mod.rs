//! Orchestration layer for campaign execution
//!
//! This module provides the components that drive campaigns through their
//! platform rotation and answer queries about them.

pub mod attempt_executor;
pub mod campaign_orchestrator;
pub mod progress;
pub mod scheduler;

// Re-export main types for convenience
pub use attempt_executor::{AttemptOutcome, PublishAttemptExecutor, idempotency_key, publish_error};
pub use campaign_orchestrator::CampaignOrchestrator;
pub use progress::{CampaignStats, PlatformStats, ProgressTracker};
pub use scheduler::{ExecutionScheduler, SchedulerOptions, TickOutcome};
