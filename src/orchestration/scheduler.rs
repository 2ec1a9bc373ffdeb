//! ExecutionScheduler - per-campaign rotation loop
//!
//! Features:
//! - One timer task per active campaign, keyed by campaign id
//! - Ticks of one campaign strictly serialized by a per-campaign lock
//! - Round-robin platform selection with wraparound
//! - Shorter delay after success, longer after failure
//! - Cancellation lets an in-flight tick finish but arms nothing afterwards
//!
//! The scheduler holds only transient handles; all durable state is written
//! to the store before the next tick is armed.

use crate::core::campaign::{AttemptRecord, CampaignUpdate, ProgressPatch, PublishedArticle};
use crate::core::config::CampaignConfig;
use crate::core::error::CampaignError;
use crate::core::state_machine::CampaignStatus;
use crate::orchestration::attempt_executor::PublishAttemptExecutor;
use crate::plugins::PlatformRegistry;
use crate::store::CampaignStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Scheduler timing
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerOptions {
    /// Delay after a successful attempt
    pub success_delay: Duration,
    /// Delay after a failed attempt or an empty pool
    pub failure_delay: Duration,
    /// Delay before the first tick after start/resume/recovery
    pub initial_delay: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::from(&CampaignConfig::default())
    }
}

impl From<&CampaignConfig> for SchedulerOptions {
    fn from(config: &CampaignConfig) -> Self {
        Self {
            success_delay: config.success_delay(),
            failure_delay: config.failure_delay(),
            initial_delay: config.initial_delay(),
        }
    }
}

/// What the loop does after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Arm the next tick after the delay
    Continue(Duration),
    /// Exit the loop
    Stop,
}

struct TimerHandle {
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    generation: u64,
}

/// Expected completion when `remaining` successes are still needed
pub(crate) fn estimate_completion(
    remaining: usize,
    success_delay: Duration,
) -> Option<DateTime<Utc>> {
    let total = success_delay.saturating_mul(u32::try_from(remaining).unwrap_or(u32::MAX));
    chrono::Duration::from_std(total)
        .ok()
        .map(|delta| Utc::now() + delta)
}

/// Drives the rotation of every active campaign
pub struct ExecutionScheduler {
    store: Arc<dyn CampaignStore>,
    registry: Arc<PlatformRegistry>,
    executor: Arc<PublishAttemptExecutor>,
    options: SchedulerOptions,
    timers: Mutex<HashMap<Uuid, TimerHandle>>,
    tick_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    next_generation: AtomicU64,
}

impl ExecutionScheduler {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        registry: Arc<PlatformRegistry>,
        executor: Arc<PublishAttemptExecutor>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            store,
            registry,
            executor,
            options,
            timers: Mutex::new(HashMap::new()),
            tick_locks: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Arm the loop for a campaign unless one is already live
    ///
    /// Returns `true` when a new loop was spawned.
    pub async fn arm(self: &Arc<Self>, id: Uuid, delay: Duration) -> bool {
        let mut timers = self.timers.lock().await;
        if timers.get(&id).is_some_and(|t| !t.handle.is_finished()) {
            debug!(campaign = %id, "timer already armed");
            return false;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            scheduler.run_loop(id, delay, cancel_rx, generation).await;
        });

        timers.insert(
            id,
            TimerHandle {
                cancel_tx,
                handle,
                generation,
            },
        );
        debug!(campaign = %id, delay_ms = delay.as_millis() as u64, "timer armed");
        true
    }

    /// Cancel a campaign's timer; a tick already running completes
    ///
    /// Returns `false` when nothing was armed.
    pub async fn cancel(&self, id: Uuid) -> bool {
        match self.timers.lock().await.remove(&id) {
            Some(timer) => {
                let _ = timer.cancel_tx.send(true);
                debug!(campaign = %id, "timer cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn is_armed(&self, id: Uuid) -> bool {
        self.timers
            .lock()
            .await
            .get(&id)
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Drop per-campaign bookkeeping after deletion
    pub async fn forget(&self, id: Uuid) {
        self.cancel(id).await;
        self.tick_locks.lock().await.remove(&id);
    }

    /// Cancel every timer and wait for in-flight ticks to persist
    ///
    /// Campaign status is left untouched so a later recovery sweep resumes them.
    pub async fn shutdown(&self) {
        let timers: Vec<TimerHandle> = self.timers.lock().await.drain().map(|(_, t)| t).collect();
        info!(count = timers.len(), "stopping campaign timers");

        for timer in &timers {
            let _ = timer.cancel_tx.send(true);
        }
        for timer in timers {
            if let Err(e) = timer.handle.await {
                warn!(error = %e, "campaign loop ended abnormally");
            }
        }
    }

    async fn tick_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.tick_locks
            .lock()
            .await
            .entry(id)
            .or_default()
            .clone()
    }

    async fn release(&self, id: Uuid, generation: u64) {
        let mut timers = self.timers.lock().await;
        if timers.get(&id).is_some_and(|t| t.generation == generation) {
            timers.remove(&id);
        }
    }

    async fn run_loop(
        self: Arc<Self>,
        id: Uuid,
        first_delay: Duration,
        mut cancel_rx: watch::Receiver<bool>,
        generation: u64,
    ) {
        let mut delay = first_delay;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel_rx.changed() => break,
            }
            if *cancel_rx.borrow() {
                break;
            }

            let lock = self.tick_lock(id).await;
            let outcome = {
                let _guard = lock.lock().await;
                // A pause may have landed while waiting for the previous tick
                if *cancel_rx.borrow() {
                    break;
                }
                self.tick(id).await
            };

            let next = match outcome {
                Ok(TickOutcome::Continue(next)) => next,
                Ok(TickOutcome::Stop) => break,
                Err(CampaignError::NotFound { .. }) => {
                    debug!(campaign = %id, "campaign deleted during tick");
                    break;
                }
                Err(e @ CampaignError::Persistence { .. }) => {
                    warn!(campaign = %id, error = %e, "tick not persisted, retrying later");
                    self.options.failure_delay
                }
                Err(e) => {
                    self.fail_campaign(id, &e).await;
                    break;
                }
            };

            if *cancel_rx.borrow() {
                break;
            }
            delay = next;
        }

        self.release(id, generation).await;
    }

    /// Execute one rotation step for a campaign
    pub async fn tick(&self, id: Uuid) -> Result<TickOutcome, CampaignError> {
        let campaign = match self.store.get(id).await {
            Ok(campaign) => campaign,
            Err(CampaignError::NotFound { .. }) => return Ok(TickOutcome::Stop),
            Err(e) => return Err(e),
        };

        if campaign.status != CampaignStatus::Active {
            debug!(campaign = %id, status = %campaign.status, "campaign not active, stopping");
            return Ok(TickOutcome::Stop);
        }

        let progress = campaign.execution_progress.clone().ok_or_else(|| {
            CampaignError::Scheduler(format!("active campaign {} has no execution progress", id))
        })?;

        if progress.is_finished() {
            self.complete(id).await?;
            return Ok(TickOutcome::Stop);
        }

        let pool = self.registry.active_platforms().await;
        if pool.is_empty() {
            warn!(campaign = %id, "no active platforms, waiting");
            return Ok(TickOutcome::Continue(self.options.failure_delay));
        }

        let rotation = progress.current_rotation;
        let index = usize::try_from(rotation % pool.len() as u64).unwrap_or_default();
        let platform = &pool[index];

        self.store
            .update(id, CampaignUpdate::current_platform(Some(platform.domain.clone())))
            .await?;

        info!(
            campaign = %id,
            rotation,
            platform = %platform.domain,
            "starting publish attempt"
        );
        let outcome = self.executor.execute(&campaign, platform, rotation).await;

        let completed = (progress.completed_platforms + usize::from(outcome.success))
            .min(progress.total_platforms);
        let remaining = progress.total_platforms - completed;

        let article = outcome.article_url.clone().map(|url| PublishedArticle {
            title: outcome
                .article_title
                .clone()
                .unwrap_or_else(|| outcome.keyword_used.clone()),
            url,
            platform: platform.domain.clone(),
            published_at: Utc::now(),
            word_count: outcome.word_count.unwrap_or_default(),
            anchor_text_used: outcome.anchor_text_used.clone(),
            keyword_used: outcome.keyword_used.clone(),
            rotation,
        });

        let updated = self
            .store
            .update(
                id,
                CampaignUpdate {
                    current_platform: Some(None),
                    progress: Some(ProgressPatch {
                        current_rotation: Some(rotation + 1),
                        completed_platforms: Some(completed),
                        estimated_completion: Some(
                            estimate_completion(remaining, self.options.success_delay)
                                .filter(|_| remaining > 0),
                        ),
                    }),
                    add_site_used: outcome.success.then(|| platform.domain.clone()),
                    append_article: article,
                    record_attempt: Some(AttemptRecord {
                        domain: platform.domain.clone(),
                        success: outcome.success,
                        at: Utc::now(),
                    }),
                    ..Default::default()
                },
            )
            .await?;

        if remaining == 0 {
            self.complete(id).await?;
            return Ok(TickOutcome::Stop);
        }

        if updated.status != CampaignStatus::Active {
            debug!(campaign = %id, status = %updated.status, "paused during attempt");
            return Ok(TickOutcome::Stop);
        }

        Ok(TickOutcome::Continue(if outcome.success {
            self.options.success_delay
        } else {
            self.options.failure_delay
        }))
    }

    async fn complete(&self, id: Uuid) -> Result<(), CampaignError> {
        let update = CampaignUpdate {
            status: Some(CampaignStatus::Completed),
            completed_at: Some(Utc::now()),
            ..Default::default()
        };

        match self.store.update(id, update).await {
            Ok(_) => {
                info!(campaign = %id, "campaign completed");
                Ok(())
            }
            // Paused while the final attempt was in flight; completes on resume
            Err(CampaignError::InvalidTransition { from, .. }) => {
                debug!(campaign = %id, status = %from, "completion deferred");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn fail_campaign(&self, id: Uuid, cause: &CampaignError) {
        error!(campaign = %id, error = %cause, "scheduler error, marking campaign failed");

        let update = CampaignUpdate {
            status: Some(CampaignStatus::Failed),
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = self.store.update(id, update).await {
            error!(campaign = %id, error = %e, "failed to mark campaign failed");
        }
    }
}
