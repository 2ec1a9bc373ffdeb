//! In-process campaign store

use super::{CampaignStore, sort_oldest_first};
use crate::core::campaign::{Campaign, CampaignUpdate};
use crate::core::error::CampaignError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Volatile store backed by a map; used by tests and dry runs
#[derive(Default)]
pub struct InMemoryCampaignStore {
    campaigns: RwLock<HashMap<Uuid, Campaign>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn create(&self, campaign: Campaign) -> Result<Campaign, CampaignError> {
        let mut campaigns = self.campaigns.write().await;
        if campaigns.contains_key(&campaign.id) {
            return Err(CampaignError::persistence(format!(
                "campaign {} already exists",
                campaign.id
            )));
        }
        campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn get(&self, id: Uuid) -> Result<Campaign, CampaignError> {
        self.campaigns
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CampaignError::NotFound { id })
    }

    async fn update(&self, id: Uuid, update: CampaignUpdate) -> Result<Campaign, CampaignError> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(CampaignError::NotFound { id })?;
        campaign.apply_update(update)?;
        Ok(campaign.clone())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Campaign>, CampaignError> {
        let mut owned: Vec<Campaign> = self
            .campaigns
            .read()
            .await
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        sort_oldest_first(&mut owned);
        Ok(owned)
    }

    async fn list_all(&self) -> Result<Vec<Campaign>, CampaignError> {
        let mut all: Vec<Campaign> = self.campaigns.read().await.values().cloned().collect();
        sort_oldest_first(&mut all);
        Ok(all)
    }

    async fn delete(&self, id: Uuid) -> Result<(), CampaignError> {
        self.campaigns
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(CampaignError::NotFound { id })
    }
}
