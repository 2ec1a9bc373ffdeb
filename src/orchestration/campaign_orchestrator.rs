//! CampaignOrchestrator - public API for campaign lifecycle and queries
//!
//! This module ties together the store, the platform registry and the
//! scheduler:
//! - create / start / pause / resume / delete with state machine checks
//! - read-only queries and statistics that never fail
//! - recovery sweep that re-arms active campaigns after a restart

use crate::core::campaign::{Campaign, CampaignUpdate, ExecutionProgress, NewCampaign, ProgressPatch};
use crate::core::error::CampaignError;
use crate::core::state_machine::CampaignStatus;
use crate::orchestration::attempt_executor::PublishAttemptExecutor;
use crate::orchestration::progress::{CampaignStats, PlatformStats, ProgressTracker};
use crate::orchestration::scheduler::{ExecutionScheduler, SchedulerOptions, estimate_completion};
use crate::plugins::PlatformRegistry;
use crate::store::CampaignStore;
use crate::validation::CampaignValidator;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Campaign lifecycle facade
pub struct CampaignOrchestrator {
    store: Arc<dyn CampaignStore>,
    registry: Arc<PlatformRegistry>,
    scheduler: Arc<ExecutionScheduler>,
    validator: CampaignValidator,
}

impl CampaignOrchestrator {
    /// Create an orchestrator
    ///
    /// # Arguments
    ///
    /// * `store` - Durable campaign storage
    /// * `registry` - Platform pool and publishers
    /// * `options` - Scheduler timing
    /// * `random_seed` - Seed for keyword/anchor selection
    pub fn new(
        store: Arc<dyn CampaignStore>,
        registry: Arc<PlatformRegistry>,
        options: SchedulerOptions,
        random_seed: Option<u64>,
    ) -> Self {
        let executor = Arc::new(PublishAttemptExecutor::new(registry.clone(), random_seed));
        let scheduler = Arc::new(ExecutionScheduler::new(
            store.clone(),
            registry.clone(),
            executor,
            options,
        ));

        Self {
            store,
            registry,
            scheduler,
            validator: CampaignValidator::new(),
        }
    }

    /// Validate, persist as draft and optionally start
    ///
    /// With `auto_start` the returned campaign is already active.
    pub async fn create_campaign(&self, input: NewCampaign) -> Result<Campaign, CampaignError> {
        let input = self.validator.normalize(input)?;
        let auto_start = input.auto_start;
        let available_sites = self.registry.active_platforms().await.len();

        let campaign = self
            .store
            .create(Campaign::new(input, available_sites))
            .await?;
        info!(campaign = %campaign.id, owner = %campaign.owner_id, "campaign created");

        if auto_start {
            return self.start_campaign(campaign.id).await;
        }
        Ok(campaign)
    }

    /// Start a draft campaign or resume a paused one, then arm its timer
    pub async fn start_campaign(&self, id: Uuid) -> Result<Campaign, CampaignError> {
        let campaign = self.store.get(id).await?;
        let success_delay = self.scheduler.options().success_delay;

        let update = match campaign.status {
            CampaignStatus::Active => return Err(CampaignError::AlreadyActive { id }),
            CampaignStatus::Completed | CampaignStatus::Failed => {
                return Err(CampaignError::InvalidTransition {
                    from: campaign.status,
                    to: CampaignStatus::Active,
                });
            }
            CampaignStatus::Draft => {
                let pool = self.registry.active_platforms().await;
                if pool.is_empty() {
                    return Err(CampaignError::validation(
                        "platforms",
                        "no active platforms to publish to",
                    ));
                }

                let now = Utc::now();
                let mut progress = ExecutionProgress::new(pool.len(), now);
                progress.estimated_completion = estimate_completion(pool.len(), success_delay);
                CampaignUpdate {
                    status: Some(CampaignStatus::Active),
                    started_at: Some(now),
                    execution_progress: Some(Some(progress)),
                    ..Default::default()
                }
            }
            CampaignStatus::Paused => {
                let remaining = campaign
                    .execution_progress
                    .as_ref()
                    .map(ExecutionProgress::remaining)
                    .unwrap_or_default();
                CampaignUpdate {
                    status: Some(CampaignStatus::Active),
                    progress: Some(ProgressPatch {
                        estimated_completion: Some(estimate_completion(remaining, success_delay)),
                        ..Default::default()
                    }),
                    ..Default::default()
                }
            }
        };

        let updated = self.store.update(id, update).await?;
        self.scheduler
            .arm(id, self.scheduler.options().initial_delay)
            .await;

        info!(
            campaign = %id,
            resumed = campaign.status == CampaignStatus::Paused,
            "campaign started"
        );
        Ok(updated)
    }

    /// Resume a paused campaign from its preserved rotation
    pub async fn resume_campaign(&self, id: Uuid) -> Result<Campaign, CampaignError> {
        let campaign = self.store.get(id).await?;
        if campaign.status != CampaignStatus::Paused {
            return Err(CampaignError::InvalidTransition {
                from: campaign.status,
                to: CampaignStatus::Active,
            });
        }
        self.start_campaign(id).await
    }

    /// Cancel the timer and move an active campaign to paused
    ///
    /// Pausing a paused campaign is a no-op.
    pub async fn pause_campaign(&self, id: Uuid) -> Result<Campaign, CampaignError> {
        let campaign = self.store.get(id).await?;
        self.scheduler.cancel(id).await;

        match campaign.status {
            CampaignStatus::Paused => Ok(campaign),
            CampaignStatus::Active => {
                let updated = self
                    .store
                    .update(
                        id,
                        CampaignUpdate {
                            status: Some(CampaignStatus::Paused),
                            progress: Some(ProgressPatch {
                                estimated_completion: Some(None),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(campaign = %id, "campaign paused");
                Ok(updated)
            }
            status => Err(CampaignError::InvalidTransition {
                from: status,
                to: CampaignStatus::Paused,
            }),
        }
    }

    /// Cancel the timer and remove the campaign; only its owner may do this
    pub async fn delete_campaign(&self, id: Uuid, owner_id: &str) -> Result<(), CampaignError> {
        let campaign = self.store.get(id).await?;
        if campaign.owner_id != owner_id {
            return Err(CampaignError::Authorization {
                id,
                owner_id: owner_id.to_string(),
            });
        }

        self.scheduler.cancel(id).await;
        self.store.delete(id).await?;
        self.scheduler.forget(id).await;

        info!(campaign = %id, "campaign deleted");
        Ok(())
    }

    pub async fn get_campaign(&self, id: Uuid) -> Result<Campaign, CampaignError> {
        self.store.get(id).await
    }

    pub async fn get_user_campaigns(&self, owner_id: &str) -> Result<Vec<Campaign>, CampaignError> {
        self.store.list_by_owner(owner_id).await
    }

    pub fn get_campaign_stats(&self, campaign: &Campaign) -> CampaignStats {
        ProgressTracker::campaign_stats(campaign)
    }

    /// Stats by id; zeroed when the campaign cannot be loaded
    pub async fn get_campaign_stats_by_id(&self, id: Uuid) -> CampaignStats {
        match self.store.get(id).await {
            Ok(campaign) => ProgressTracker::campaign_stats(&campaign),
            Err(e) => {
                warn!(campaign = %id, error = %e, "campaign stats unavailable");
                CampaignStats::default()
            }
        }
    }

    /// Per-domain statistics across every campaign; empty on store failure
    pub async fn get_platform_stats(&self) -> BTreeMap<String, PlatformStats> {
        let platforms = self.registry.all_platforms().await;
        match self.store.list_all().await {
            Ok(campaigns) => ProgressTracker::platform_stats(&campaigns, &platforms),
            Err(e) => {
                warn!(error = %e, "platform stats unavailable");
                BTreeMap::new()
            }
        }
    }

    /// Re-arm every active campaign that has no live timer
    ///
    /// Safe to call repeatedly; returns the number of timers armed.
    pub async fn recover(&self) -> Result<usize, CampaignError> {
        let mut armed = 0;
        for campaign in self.store.list_all().await? {
            if campaign.status == CampaignStatus::Active
                && self
                    .scheduler
                    .arm(campaign.id, self.scheduler.options().initial_delay)
                    .await
            {
                armed += 1;
            }
        }

        if armed > 0 {
            info!(count = armed, "recovered active campaigns");
        }
        Ok(armed)
    }

    pub async fn is_scheduled(&self, id: Uuid) -> bool {
        self.scheduler.is_armed(id).await
    }

    /// Stop all timers without changing any campaign status
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
