//! Durable campaign storage
//!
//! The store is the only owner of campaign state. Every backend applies
//! partial updates through [`Campaign::apply_update`] so merge rules and
//! invariants hold no matter where records live.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileCampaignStore;
pub use memory::InMemoryCampaignStore;

use crate::core::campaign::{Campaign, CampaignUpdate};
use crate::core::error::CampaignError;
use async_trait::async_trait;
use uuid::Uuid;

/// CRUD contract for campaign records
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Insert a new record; fails if the id already exists
    async fn create(&self, campaign: Campaign) -> Result<Campaign, CampaignError>;

    async fn get(&self, id: Uuid) -> Result<Campaign, CampaignError>;

    /// Merge a partial update and return the stored result
    async fn update(&self, id: Uuid, update: CampaignUpdate) -> Result<Campaign, CampaignError>;

    /// Campaigns of one owner, oldest first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Campaign>, CampaignError>;

    /// Every campaign, oldest first
    async fn list_all(&self) -> Result<Vec<Campaign>, CampaignError>;

    async fn delete(&self, id: Uuid) -> Result<(), CampaignError>;
}

fn sort_oldest_first(campaigns: &mut [Campaign]) {
    campaigns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
