//! Single cooperative loop driving recurring scrape and validate cycles, ticking every
//! 5 seconds and comparing elapsed time against the configured intervals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::coordinator::ScrapeRequest;
use crate::models::JobKind;
use crate::ops::{default_validator_config, do_scrape, do_validate};
use crate::state::AppState;

const TICK: Duration = Duration::from_secs(5);

pub struct Scheduler {
    state: Arc<AppState>,
    stop: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs until `stop()` is called; idempotent start is the caller's responsibility
    /// (spawn this once per process).
    pub async fn run(&self) {
        self.state.scheduler_state.write().running = true;
        log::info!("scheduler started, tick = {:?}", TICK);

        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(TICK).await;
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            self.tick().await;
        }

        self.state.scheduler_state.write().running = false;
        log::info!("scheduler stopped");
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    async fn tick(&self) {
        let enabled = self.state.scheduler_config.read().enabled;
        if !enabled {
            return;
        }

        let config = self.state.scheduler_config.read().clone();
        let now = Utc::now();

        let due_scrape = config.scrape_interval_min > 0
            && self
                .state
                .scheduler_state
                .read()
                .last_scrape_at
                .map(|last| (now - last).num_minutes() as u64 >= config.scrape_interval_min)
                .unwrap_or(true);

        if due_scrape {
            self.run_scrape(config.scrape_quantity).await;
        }

        let due_validate = config.validate_interval_min > 0
            && self
                .state
                .scheduler_state
                .read()
                .last_validate_at
                .map(|last| (now - last).num_minutes() as u64 >= config.validate_interval_min)
                .unwrap_or(true);

        if due_validate {
            self.run_validate(config.validate_batch_size).await;
        }
    }

    async fn run_scrape(&self, quantity: usize) {
        let job = self.state.jobs.create(JobKind::Scrape);
        {
            let mut scheduler_state = self.state.scheduler_state.write();
            scheduler_state.last_scrape_at = Some(Utc::now());
            scheduler_state.last_scrape_job_id = Some(job.id.clone());
        }

        let outcome = do_scrape(
            &self.state,
            ScrapeRequest {
                country: None,
                protocols: Vec::new(),
                sources: Vec::new(),
                quantity,
                timeout: Duration::from_secs(self.state.settings.scraper_timeout_sec),
                retries: self.state.settings.scraper_max_retries,
            },
        )
        .await;

        let metrics = serde_json::json!({
            "total_found": outcome.total_found,
            "saved": outcome.total_found,
            "by_source": outcome.by_source,
            "execution_time_ms": outcome.execution_time_ms,
        });
        self.state.jobs.complete(&job.id, metrics.clone());
        self.state.scheduler_state.write().last_scrape_metrics = Some(metrics);

        self.state
            .webhooks
            .trigger(
                &self.state.http_client,
                "proxies_scraped",
                serde_json::json!({"job_id": job.id, "total_found": outcome.total_found}),
            )
            .await;
    }

    async fn run_validate(&self, batch_size: usize) {
        let rows = self.state.catalog.select_for_validation(batch_size, false, None);
        if rows.is_empty() {
            return;
        }

        let job = self.state.jobs.create(JobKind::Validate);
        {
            let mut scheduler_state = self.state.scheduler_state.write();
            scheduler_state.last_validate_at = Some(Utc::now());
            scheduler_state.last_validate_job_id = Some(job.id.clone());
        }

        let lines: Vec<String> = rows
            .iter()
            .map(|r| format!("{}://{}:{}", r.protocol, r.ip, r.port))
            .collect();

        let config = default_validator_config(&self.state);
        let outcome = do_validate(&self.state, &lines, config).await;

        let avg_valid = {
            let valid_latencies: Vec<u64> = outcome
                .results
                .iter()
                .filter(|r| r.valid)
                .filter_map(|r| r.avg_response_time_ms)
                .collect();
            if valid_latencies.is_empty() {
                None
            } else {
                Some(valid_latencies.iter().sum::<u64>() / valid_latencies.len() as u64)
            }
        };

        let metrics = serde_json::json!({
            "total_tested": outcome.total_tested,
            "valid": outcome.valid_proxies,
            "invalid": outcome.invalid_proxies,
            "avg_response_time_ms_valid": avg_valid,
        });
        self.state.jobs.complete(&job.id, metrics.clone());
        self.state.scheduler_state.write().last_validate_metrics = Some(metrics);

        self.state
            .webhooks
            .trigger(
                &self.state.http_client,
                "proxies_validated",
                serde_json::json!({"job_id": job.id, "valid": outcome.valid_proxies}),
            )
            .await;
    }
}
