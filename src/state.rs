//! Process-wide shared state: one instance built at startup and handed to the API
//! router, the scheduler task, and the CLI commands alike.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::catalog::Catalog;
use crate::config::{SchedulerConfig, SchedulerState, Settings, SharedSchedulerConfig};
use crate::coordinator::ScrapingCoordinator;
use crate::jobs::JobRegistry;
use crate::utils::error::ProxyResult;
use crate::webhooks::WebhookRegistry;

pub struct AppState {
    pub settings: Settings,
    pub catalog: Catalog,
    pub jobs: JobRegistry,
    pub webhooks: WebhookRegistry,
    pub coordinator: ScrapingCoordinator,
    pub http_client: reqwest::Client,
    pub scheduler_config: SharedSchedulerConfig,
    pub scheduler_state: RwLock<SchedulerState>,
}

impl AppState {
    pub fn new(settings: Settings) -> ProxyResult<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.scraper_timeout_sec))
            .build()?;

        let coordinator = ScrapingCoordinator::new(
            http_client.clone(),
            Duration::from_secs(settings.scraper_cache_ttl_sec),
            settings.scraper_rate_limit_per_min,
        );

        let scheduler_config = SchedulerConfig {
            enabled: settings.scheduler_enabled,
            validate_interval_min: settings.scheduler_validate_every_minutes,
            scrape_interval_min: settings.scheduler_scrape_every_minutes,
            validate_batch_size: settings.scheduler_validate_max_count,
            scrape_quantity: settings.scheduler_scrape_quantity,
        };

        Ok(Arc::new(Self {
            settings,
            catalog: Catalog::new(),
            jobs: JobRegistry::new(),
            webhooks: WebhookRegistry::new(),
            coordinator,
            http_client,
            scheduler_config: Arc::new(RwLock::new(scheduler_config)),
            scheduler_state: RwLock::new(SchedulerState::default()),
        }))
    }
}
