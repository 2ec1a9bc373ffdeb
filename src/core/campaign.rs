//! Campaign data model
//!
//! A campaign targets one destination URL across a rotation of platforms.
//! All durable state lives in the [`Campaign`] record; every mutation goes
//! through [`Campaign::apply_update`], which stores share so merge rules are
//! identical for every backend.

use crate::core::error::CampaignError;
use crate::core::state_machine::{self, CampaignStatus, StatusTransition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Input for creating a campaign
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub keywords: Vec<String>,
    pub anchor_texts: Vec<String>,
    pub target_url: String,
    pub owner_id: String,
    #[serde(default)]
    pub auto_start: bool,
}

/// Durable counters that make a campaign resumable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionProgress {
    pub total_platforms: usize,
    pub completed_platforms: usize,
    /// Attempts made so far, successful or not
    pub current_rotation: u64,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<DateTime<Utc>>,
}

impl ExecutionProgress {
    pub fn new(total_platforms: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            total_platforms,
            completed_platforms: 0,
            current_rotation: 0,
            started_at,
            estimated_completion: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.total_platforms.saturating_sub(self.completed_platforms)
    }

    pub fn is_finished(&self) -> bool {
        self.completed_platforms >= self.total_platforms
    }
}

/// One successfully published article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishedArticle {
    pub title: String,
    pub url: String,
    /// Platform domain
    pub platform: String,
    pub published_at: DateTime<Utc>,
    pub word_count: u32,
    pub anchor_text_used: String,
    #[serde(default)]
    pub keyword_used: String,
    /// Rotation index that produced this article
    #[serde(default)]
    pub rotation: u64,
}

/// Attempt counters for one platform domain within a campaign
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlatformAttempts {
    pub attempts: u64,
    pub successes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// One finished attempt, folded into [`Campaign::platform_attempts`]
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub domain: String,
    pub success: bool,
    pub at: DateTime<Utc>,
}

/// Campaign record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub keywords: Vec<String>,
    pub anchor_texts: Vec<String>,
    pub target_url: String,
    pub owner_id: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Platform pool size at creation
    pub available_sites: usize,

    /// Distinct platform domains actually used
    #[serde(default)]
    pub target_sites_used: BTreeSet<String>,

    /// Set only while a tick is executing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_platform: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_progress: Option<ExecutionProgress>,

    /// Last progress snapshot once the campaign reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_progress: Option<ExecutionProgress>,

    #[serde(default)]
    pub published_articles: Vec<PublishedArticle>,

    #[serde(default)]
    pub transitions: Vec<StatusTransition>,

    /// Attempts per platform domain, persisted with the record
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform_attempts: BTreeMap<String, PlatformAttempts>,
}

impl Campaign {
    /// Build a draft campaign from validated input
    pub fn new(input: NewCampaign, available_sites: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            keywords: input.keywords,
            anchor_texts: input.anchor_texts,
            target_url: input.target_url,
            owner_id: input.owner_id,
            status: CampaignStatus::Draft,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            available_sites,
            target_sites_used: BTreeSet::new(),
            current_platform: None,
            execution_progress: None,
            archived_progress: None,
            published_articles: Vec::new(),
            transitions: Vec::new(),
            platform_attempts: BTreeMap::new(),
        }
    }

    /// Links built so far, derived from the published articles
    pub fn links_built(&self) -> usize {
        self.published_articles.len()
    }

    /// Live progress, or the archived snapshot for finished campaigns
    pub fn progress_snapshot(&self) -> Option<&ExecutionProgress> {
        self.execution_progress
            .as_ref()
            .or(self.archived_progress.as_ref())
    }

    /// Status history as human-readable lines
    pub fn history(&self) -> String {
        state_machine::format_history(&self.transitions)
    }

    /// Apply a partial update with merge semantics.
    ///
    /// Either the whole update applies or nothing changes.
    pub fn apply_update(&mut self, update: CampaignUpdate) -> Result<(), CampaignError> {
        let mut next = self.clone();
        next.merge(update)?;
        *self = next;
        Ok(())
    }

    fn merge(&mut self, update: CampaignUpdate) -> Result<(), CampaignError> {
        if let Some(to) = update.status {
            if !self.status.can_transition_to(to) {
                return Err(CampaignError::InvalidTransition {
                    from: self.status,
                    to,
                });
            }
            self.transitions.push(StatusTransition {
                from: self.status,
                to,
                timestamp: Utc::now(),
            });
            self.status = to;
        }

        if let Some(started_at) = update.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }

        match update.execution_progress {
            Some(Some(progress)) => self.execution_progress = Some(progress),
            Some(None) => self.archive_progress(),
            None => {}
        }

        if let Some(patch) = update.progress {
            self.patch_progress(patch)?;
        }

        if let Some(article) = update.append_article {
            self.published_articles.push(article);
        }

        if let Some(site) = update.add_site_used {
            self.target_sites_used.insert(site);
        }

        if let Some(record) = update.record_attempt {
            let counters = self.platform_attempts.entry(record.domain).or_default();
            counters.attempts += 1;
            if record.success {
                counters.successes += 1;
            }
            counters.last_attempt_at = counters.last_attempt_at.max(Some(record.at));
        }

        if let Some(platform) = update.current_platform {
            self.current_platform = platform;
        }

        if !self.status.carries_progress() {
            self.archive_progress();
            self.current_platform = None;
        } else if self.execution_progress.is_none() {
            return Err(CampaignError::Scheduler(format!(
                "{} campaign {} has no execution progress",
                self.status, self.id
            )));
        }

        Ok(())
    }

    fn patch_progress(&mut self, patch: ProgressPatch) -> Result<(), CampaignError> {
        let status = self.status;
        let progress = self.execution_progress.as_mut().ok_or_else(|| {
            CampaignError::Scheduler(format!("campaign {} has no progress to update", self.id))
        })?;

        if let Some(rotation) = patch.current_rotation {
            if rotation < progress.current_rotation {
                return Err(CampaignError::Scheduler(format!(
                    "rotation cannot move backwards ({} → {})",
                    progress.current_rotation, rotation
                )));
            }
            progress.current_rotation = rotation;
        }

        if let Some(completed) = patch.completed_platforms {
            if completed > progress.total_platforms {
                return Err(CampaignError::Scheduler(format!(
                    "completed platforms {} exceed total {}",
                    completed, progress.total_platforms
                )));
            }
            progress.completed_platforms = completed;
        }

        // An idle campaign carries no completion estimate
        match patch.estimated_completion {
            Some(None) => progress.estimated_completion = None,
            Some(Some(eta)) if status == CampaignStatus::Active => {
                progress.estimated_completion = Some(eta)
            }
            _ => {}
        }

        Ok(())
    }

    fn archive_progress(&mut self) {
        if let Some(progress) = self.execution_progress.take() {
            self.archived_progress = Some(progress);
        }
    }
}

/// Partial counters update for [`ExecutionProgress`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressPatch {
    pub current_rotation: Option<u64>,
    pub completed_platforms: Option<usize>,
    /// `Some(None)` clears the estimate
    pub estimated_completion: Option<Option<DateTime<Utc>>>,
}

/// Partial campaign update with merge semantics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignUpdate {
    pub status: Option<CampaignStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the field
    pub current_platform: Option<Option<String>>,
    /// `Some(None)` archives and clears the progress
    pub execution_progress: Option<Option<ExecutionProgress>>,
    pub progress: Option<ProgressPatch>,
    pub append_article: Option<PublishedArticle>,
    pub add_site_used: Option<String>,
    pub record_attempt: Option<AttemptRecord>,
}

impl CampaignUpdate {
    pub fn status(status: CampaignStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn current_platform(platform: Option<String>) -> Self {
        Self {
            current_platform: Some(platform),
            ..Default::default()
        }
    }
}
