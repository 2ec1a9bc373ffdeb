//! ProgressTracker - campaign and platform statistics
//!
//! Features:
//! - Per-campaign counters derived from published articles
//! - Per-platform aggregates across every campaign
//! - Markdown and JSON reports for the CLI
//!
//! Statistics never fail: missing data yields zeroed values.

use crate::core::campaign::Campaign;
use crate::core::state_machine::elapsed_millis;
use crate::plugins::PlatformTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Statistics for one campaign
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub articles_published: usize,
    /// Distinct platforms among published articles
    pub platforms_used: usize,
    pub total_word_count: u64,
    /// articles_published / current_rotation; 0 before the first attempt
    pub success_rate: f64,
    pub current_rotation: u64,
    pub completed_platforms: usize,
    pub total_platforms: usize,
}

/// Aggregated statistics for one platform domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub domain: String,
    pub total_articles: usize,
    pub avg_word_count: f64,
    /// Attempts persisted on stored campaigns
    pub attempts: u64,
    pub successes: u64,
    /// successes / attempts; 0 when nothing was attempted
    pub success_rate: f64,
    pub last_used: Option<DateTime<Utc>>,
}

/// Stateless statistics calculator
pub struct ProgressTracker;

impl ProgressTracker {
    pub fn campaign_stats(campaign: &Campaign) -> CampaignStats {
        let articles_published = campaign.published_articles.len();
        let platforms_used = campaign
            .published_articles
            .iter()
            .map(|a| a.platform.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        let total_word_count = campaign
            .published_articles
            .iter()
            .map(|a| u64::from(a.word_count))
            .sum();

        let (current_rotation, completed_platforms, total_platforms) = campaign
            .progress_snapshot()
            .map(|p| (p.current_rotation, p.completed_platforms, p.total_platforms))
            .unwrap_or_default();

        let success_rate = if current_rotation > 0 {
            articles_published as f64 / current_rotation as f64
        } else {
            0.0
        };

        CampaignStats {
            articles_published,
            platforms_used,
            total_word_count,
            success_rate,
            current_rotation,
            completed_platforms,
            total_platforms,
        }
    }

    /// Group published articles and persisted attempts by platform domain
    ///
    /// `platforms` only adds zeroed rows for configured platforms that no
    /// campaign has touched yet.
    pub fn platform_stats(
        campaigns: &[Campaign],
        platforms: &[PlatformTarget],
    ) -> BTreeMap<String, PlatformStats> {
        let mut stats: BTreeMap<String, PlatformStats> = BTreeMap::new();
        let mut word_totals: BTreeMap<String, u64> = BTreeMap::new();

        fn entry<'a>(
            stats: &'a mut BTreeMap<String, PlatformStats>,
            domain: &str,
        ) -> &'a mut PlatformStats {
            stats
                .entry(domain.to_string())
                .or_insert_with(|| PlatformStats {
                    domain: domain.to_string(),
                    ..Default::default()
                })
        }

        for article in campaigns.iter().flat_map(|c| c.published_articles.iter()) {
            entry(&mut stats, &article.platform).total_articles += 1;
            *word_totals.entry(article.platform.clone()).or_default() +=
                u64::from(article.word_count);
        }

        for (domain, counters) in campaigns.iter().flat_map(|c| c.platform_attempts.iter()) {
            let row = entry(&mut stats, domain);
            row.attempts += counters.attempts;
            row.successes += counters.successes;
            row.last_used = row.last_used.max(counters.last_attempt_at);
        }

        for platform in platforms {
            entry(&mut stats, &platform.domain);
        }

        for (domain, row) in stats.iter_mut() {
            if row.total_articles > 0 {
                let words = word_totals.get(domain).copied().unwrap_or_default();
                row.avg_word_count = words as f64 / row.total_articles as f64;
            }
            if row.attempts > 0 {
                row.success_rate = row.successes as f64 / row.attempts as f64;
            }
        }

        stats
    }

    /// Markdown summary of one campaign
    pub fn generate_campaign_summary(campaign: &Campaign) -> String {
        let stats = Self::campaign_stats(campaign);
        let mut lines = Vec::new();

        lines.push(format!("# Campaign: {}\n", campaign.name));
        lines.push(format!("- **ID**: {}", campaign.id));
        lines.push(format!("- **Status**: {}", campaign.status));
        lines.push(format!("- **Target URL**: {}", campaign.target_url));
        lines.push(format!(
            "- **Progress**: {}/{} platforms ({} attempts)",
            stats.completed_platforms, stats.total_platforms, stats.current_rotation
        ));
        lines.push(format!("- **Success Rate**: {:.1}%", stats.success_rate * 100.0));
        lines.push(format!("- **Words Published**: {}", stats.total_word_count));
        if let Some(eta) = campaign
            .execution_progress
            .as_ref()
            .and_then(|p| p.estimated_completion)
        {
            lines.push(format!("- **Estimated Completion**: {}", eta.to_rfc3339()));
        }
        lines.push(String::new());

        if !campaign.published_articles.is_empty() {
            lines.push("## Published Articles\n".to_string());
            lines.push("| # | Platform | Title | Words | Anchor |".to_string());
            lines.push("|---|----------|-------|-------|--------|".to_string());
            for article in &campaign.published_articles {
                lines.push(format!(
                    "| {} | {} | [{}]({}) | {} | {} |",
                    article.rotation,
                    article.platform,
                    article.title,
                    article.url,
                    article.word_count,
                    article.anchor_text_used
                ));
            }
            lines.push(String::new());
        }

        if !campaign.transitions.is_empty() {
            lines.push("## History\n".to_string());
            lines.push(campaign.history());
            lines.push(format!(
                "\nTime since first transition: {}s",
                elapsed_millis(&campaign.transitions) / 1000
            ));
        }

        lines.join("\n")
    }

    /// Markdown table of platform statistics
    pub fn generate_platform_table(stats: &BTreeMap<String, PlatformStats>) -> String {
        let mut lines = vec![
            "| Platform | Articles | Avg Words | Attempts | Success Rate | Last Used |".to_string(),
            "|----------|----------|-----------|----------|--------------|-----------|".to_string(),
        ];

        for entry in stats.values() {
            let last_used = entry
                .last_used
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "| {} | {} | {:.0} | {} | {:.1}% | {} |",
                entry.domain,
                entry.total_articles,
                entry.avg_word_count,
                entry.attempts,
                entry.success_rate * 100.0,
                last_used
            ));
        }

        lines.join("\n")
    }

    pub fn generate_json_export(
        stats: &BTreeMap<String, PlatformStats>,
    ) -> Result<String, serde_json::Error> {
        let data = serde_json::json!({
            "generatedAt": Utc::now().to_rfc3339(),
            "platforms": stats.values().collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::campaign::{
        AttemptRecord, CampaignUpdate, ExecutionProgress, ProgressPatch, PublishedArticle,
    };
    use crate::core::state_machine::CampaignStatus;
    use crate::test_support::sample_campaign;

    fn article(platform: &str, words: u32, rotation: u64) -> PublishedArticle {
        PublishedArticle {
            title: "Title".to_string(),
            url: format!("https://{}/post-{}", platform, rotation),
            platform: platform.to_string(),
            published_at: Utc::now(),
            word_count: words,
            anchor_text_used: "click here".to_string(),
            keyword_used: "seo".to_string(),
            rotation,
        }
    }

    fn running(rotation: u64, articles: Vec<PublishedArticle>) -> Campaign {
        let mut campaign = sample_campaign("user-1");
        campaign
            .apply_update(CampaignUpdate {
                status: Some(CampaignStatus::Active),
                execution_progress: Some(Some(ExecutionProgress::new(3, Utc::now()))),
                ..Default::default()
            })
            .unwrap();
        campaign
            .apply_update(CampaignUpdate {
                progress: Some(ProgressPatch {
                    current_rotation: Some(rotation),
                    completed_platforms: Some(articles.len()),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .unwrap();
        for a in articles {
            campaign
                .apply_update(CampaignUpdate {
                    append_article: Some(a),
                    ..Default::default()
                })
                .unwrap();
        }
        campaign
    }

    #[test]
    fn test_zero_rotation_has_zero_success_rate() {
        let stats = ProgressTracker::campaign_stats(&sample_campaign("user-1"));

        assert_eq!(stats.success_rate, 0.0);
        assert!(!stats.success_rate.is_nan());
        assert_eq!(stats, CampaignStats::default());
    }

    #[test]
    fn test_campaign_stats() {
        let campaign = running(
            4,
            vec![
                article("a.example", 800, 0),
                article("b.example", 1000, 1),
                article("a.example", 600, 3),
            ],
        );

        let stats = ProgressTracker::campaign_stats(&campaign);

        assert_eq!(stats.articles_published, 3);
        assert_eq!(stats.platforms_used, 2);
        assert_eq!(stats.total_word_count, 2400);
        assert_eq!(stats.success_rate, 0.75);
        assert_eq!(stats.current_rotation, 4);
        assert_eq!(stats.completed_platforms, 3);
    }

    #[test]
    fn test_stats_use_archived_progress_after_completion() {
        let mut campaign = running(3, vec![article("a.example", 500, 0)]);
        campaign
            .apply_update(CampaignUpdate::status(CampaignStatus::Failed))
            .unwrap();

        let stats = ProgressTracker::campaign_stats(&campaign);
        assert_eq!(stats.current_rotation, 3);
        assert!((stats.success_rate - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    fn record(campaign: &mut Campaign, domain: &str, success: bool) {
        campaign
            .apply_update(CampaignUpdate {
                record_attempt: Some(AttemptRecord {
                    domain: domain.to_string(),
                    success,
                    at: Utc::now(),
                }),
                ..Default::default()
            })
            .unwrap();
    }

    #[test]
    fn test_platform_stats_group_by_domain() {
        let first = running(2, vec![article("a.example", 800, 0), article("b.example", 400, 1)]);
        let second = running(1, vec![article("a.example", 1200, 0)]);
        let unused = PlatformTarget::new("c", "c.example", "simulated");

        let stats = ProgressTracker::platform_stats(&[first, second], &[unused]);

        assert_eq!(stats.len(), 3);
        assert_eq!(stats["a.example"].total_articles, 2);
        assert_eq!(stats["a.example"].avg_word_count, 1000.0);
        assert_eq!(stats["b.example"].attempts, 0);
        assert_eq!(stats["c.example"].total_articles, 0);
        assert_eq!(stats["c.example"].avg_word_count, 0.0);
        assert_eq!(stats["c.example"].success_rate, 0.0);
    }

    #[test]
    fn test_platform_success_rate_from_stored_attempts() {
        let mut first = running(3, vec![article("a.example", 800, 1)]);
        record(&mut first, "a.example", false);
        record(&mut first, "a.example", true);
        record(&mut first, "b.example", false);
        let mut second = running(1, Vec::new());
        record(&mut second, "a.example", false);

        // In-memory registry counters are not a source
        let mut registry_entry = PlatformTarget::new("a", "a.example", "simulated");
        registry_entry.attempts = 99;

        let stats = ProgressTracker::platform_stats(&[first, second], &[registry_entry]);

        assert_eq!(stats["a.example"].attempts, 3);
        assert_eq!(stats["a.example"].successes, 1);
        assert!((stats["a.example"].success_rate - 1.0 / 3.0).abs() < f64::EPSILON);
        assert!(stats["a.example"].last_used.is_some());
        assert_eq!(stats["b.example"].attempts, 1);
        assert_eq!(stats["b.example"].success_rate, 0.0);
    }

    #[test]
    fn test_campaign_summary_markdown() {
        let campaign = running(1, vec![article("a.example", 800, 0)]);

        let summary = ProgressTracker::generate_campaign_summary(&campaign);

        assert!(summary.contains("# Campaign: "));
        assert!(summary.contains("**Status**: active"));
        assert!(summary.contains("| 0 | a.example |"));
        assert!(summary.contains("draft → active"));
    }

    #[test]
    fn test_platform_table_and_json() {
        let campaign = running(1, vec![article("a.example", 800, 0)]);
        let stats = ProgressTracker::platform_stats(&[campaign], &[]);

        let table = ProgressTracker::generate_platform_table(&stats);
        assert!(table.contains("| a.example | 1 | 800 | 0 | 0.0% | - |"));

        let json = ProgressTracker::generate_json_export(&stats).unwrap();
        assert!(json.contains("\"domain\": \"a.example\""));
    }
}
