//! Shared test fixtures: a scriptable publisher and polling helpers

use crate::core::campaign::{Campaign, NewCampaign};
use crate::core::traits::{ContentPublisher, PublishRequest, PublishResponse};
use crate::orchestration::SchedulerOptions;
use crate::plugins::{PlatformRegistry, PlatformTarget};
use crate::store::CampaignStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

pub fn new_campaign(owner_id: &str) -> NewCampaign {
    NewCampaign {
        name: "Spring launch".to_string(),
        keywords: vec!["seo".to_string()],
        anchor_texts: vec!["click here".to_string()],
        target_url: "https://example.com/landing".to_string(),
        owner_id: owner_id.to_string(),
        auto_start: false,
    }
}

pub fn sample_campaign(owner_id: &str) -> Campaign {
    Campaign::new(new_campaign(owner_id), 2)
}

/// Millisecond-scale timing for scheduler tests
pub fn fast_options() -> SchedulerOptions {
    SchedulerOptions {
        success_delay: Duration::from_millis(10),
        failure_delay: Duration::from_millis(20),
        initial_delay: Duration::ZERO,
    }
}

/// Registry whose platforms `p0, p1, ...` all use `publisher`
pub async fn registry_with(
    domains: &[&str],
    publisher: Arc<ScriptedPublisher>,
) -> Arc<PlatformRegistry> {
    let registry = Arc::new(PlatformRegistry::new());
    for (i, domain) in domains.iter().enumerate() {
        registry
            .register_platform(PlatformTarget::new(format!("p{}", i), *domain, "scripted"))
            .await;
    }
    registry.register_publisher(publisher).await;
    registry
}

/// Poll the store until `predicate` holds
pub async fn wait_for<F>(store: &dyn CampaignStore, id: Uuid, predicate: F) -> Campaign
where
    F: Fn(&Campaign) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(campaign) = store.get(id).await
            && predicate(&campaign)
        {
            return campaign;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached for campaign {}",
            id
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// One scripted publisher reply
#[derive(Debug, Clone)]
pub enum Scripted {
    Success,
    Failure(String),
    Error(String),
    MissingUrl,
}

/// Publisher that replays a script, then succeeds
pub struct ScriptedPublisher {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<PublishRequest>>,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedPublisher {
    pub fn succeeding() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Hold every call until a permit is added to `gate`
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Requests in arrival order, including ones still in flight
    pub fn requests(&self) -> Vec<PublishRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn domains(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.platform.domain)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentPublisher for ScriptedPublisher {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn publish(&self, request: &PublishRequest) -> anyhow::Result<PublishResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        tokio::task::yield_now().await;

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Scripted::Success);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Scripted::Success => Ok(PublishResponse {
                success: true,
                article_title: Some(format!("{} guide", request.keyword)),
                article_url: Some(format!(
                    "https://{}/{}",
                    request.platform.domain,
                    request.idempotency_key.replace(':', "-")
                )),
                word_count: Some(750),
                error: None,
            }),
            Scripted::Failure(message) => Ok(PublishResponse::failed(message)),
            Scripted::Error(message) => Err(anyhow::anyhow!(message)),
            Scripted::MissingUrl => Ok(PublishResponse {
                success: true,
                ..Default::default()
            }),
        }
    }
}
