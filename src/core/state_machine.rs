//! Campaign status state machine
//!
//! Allowed transitions:
//!
//! ```text
//! draft → active ⇄ paused
//!           ├──→ completed
//!           └──→ failed
//! ```
//!
//! `completed` and `failed` are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Campaign status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Failed,
}

impl CampaignStatus {
    /// Get string representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Check whether `self → to` is a permitted transition
    pub fn can_transition_to(&self, to: CampaignStatus) -> bool {
        use CampaignStatus::*;

        matches!(
            (self, to),
            (Draft, Active)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Completed)
                | (Active, Failed)
        )
    }

    /// Terminal states never have a timer
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Progress is kept only while the campaign can still run
    pub fn carries_progress(&self) -> bool {
        matches!(self, Self::Active | Self::Paused)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded status change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusTransition {
    pub from: CampaignStatus,
    pub to: CampaignStatus,
    pub timestamp: DateTime<Utc>,
}

/// Render a transition history as human-readable lines
pub fn format_history(transitions: &[StatusTransition]) -> String {
    transitions
        .iter()
        .map(|t| format!("{}: {} → {}", t.timestamp.to_rfc3339(), t.from, t.to))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Elapsed milliseconds between the first and last recorded transition
pub fn elapsed_millis(transitions: &[StatusTransition]) -> i64 {
    match (transitions.first(), transitions.last()) {
        (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
        _ => 0,
    }
}
