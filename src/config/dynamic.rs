//! Scheduler configuration that can be replaced at runtime through the API, following
//! the same `Arc<RwLock<..>>` sharing pattern used for hot-reloadable config.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub validate_interval_min: u64,
    pub scrape_interval_min: u64,
    pub validate_batch_size: usize,
    pub scrape_quantity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            validate_interval_min: 30,
            scrape_interval_min: 60,
            validate_batch_size: 50,
            scrape_quantity: 50,
        }
    }
}

/// Fields accepted by a partial update. `None`/non-positive numeric fields leave the
/// existing value untouched, matching the "only overwrite positive fields" contract.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SchedulerConfigUpdate {
    pub enabled: Option<bool>,
    pub validate_interval_min: Option<u64>,
    pub scrape_interval_min: Option<u64>,
    pub validate_batch_size: Option<usize>,
    pub scrape_quantity: Option<usize>,
}

impl SchedulerConfig {
    pub fn apply_update(&mut self, update: SchedulerConfigUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(v) = update.validate_interval_min.filter(|v| *v > 0) {
            self.validate_interval_min = v;
        }
        if let Some(v) = update.scrape_interval_min.filter(|v| *v > 0) {
            self.scrape_interval_min = v;
        }
        if let Some(v) = update.validate_batch_size.filter(|v| *v > 0) {
            self.validate_batch_size = v;
        }
        if let Some(v) = update.scrape_quantity.filter(|v| *v > 0) {
            self.scrape_quantity = v;
        }
    }
}

/// Observed state maintained by the scheduler loop, reported alongside the config.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerState {
    pub running: bool,
    pub last_validate_at: Option<DateTime<Utc>>,
    pub last_scrape_at: Option<DateTime<Utc>>,
    pub last_validate_job_id: Option<String>,
    pub last_scrape_job_id: Option<String>,
    pub last_validate_metrics: Option<serde_json::Value>,
    pub last_scrape_metrics: Option<serde_json::Value>,
}

pub type SharedSchedulerConfig = Arc<RwLock<SchedulerConfig>>;
