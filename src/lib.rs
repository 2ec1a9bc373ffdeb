pub mod core;
pub mod orchestration;
pub mod plugins;
pub mod security;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::core::*;
pub use orchestration::{
    CampaignOrchestrator, CampaignStats, ExecutionScheduler, PlatformStats, ProgressTracker,
    PublishAttemptExecutor, SchedulerOptions,
};
pub use plugins::{PlatformRegistry, PlatformTarget, SimulatedPublisher, WebhookPublisher};
pub use security::SecureTokenManager;
pub use store::{CampaignStore, InMemoryCampaignStore, JsonFileCampaignStore};
pub use validation::CampaignValidator;
