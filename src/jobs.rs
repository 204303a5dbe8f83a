//! In-memory job registry: tracks asynchronous scrape/validate work so callers can
//! poll progress instead of blocking on the whole operation.

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Job, JobKind, JobStatus};

#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<String, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self { jobs: DashMap::new() }
    }

    pub fn create(&self, kind: JobKind) -> Job {
        let job = Job {
            id: Uuid::new_v4().to_string(),
            kind,
            status: JobStatus::Processing,
            progress: 0.0,
            created_at: Utc::now(),
            eta_seconds: None,
            duration_seconds: None,
            result: None,
            error: None,
        };
        self.jobs.insert(job.id.clone(), job.clone());
        job
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.get(id).map(|j| j.clone())
    }

    /// Progress is clamped to be monotonically non-decreasing relative to the current
    /// value so a delayed update can never rewind a job that moved on.
    pub fn set_progress(&self, id: &str, progress: f64) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.progress = job.progress.max(progress.clamp(0.0, 1.0));
        }
    }

    pub fn complete(&self, id: &str, result: serde_json::Value) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.status = JobStatus::Completed;
            job.progress = 1.0;
            job.result = Some(result);
            job.duration_seconds = Some((Utc::now() - job.created_at).num_milliseconds() as f64 / 1000.0);
        }
    }

    pub fn fail(&self, id: &str, error: impl Into<String>) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.status = JobStatus::Failed;
            job.error = Some(error.into());
            job.duration_seconds = Some((Utc::now() - job.created_at).num_milliseconds() as f64 / 1000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_never_decreases() {
        let registry = JobRegistry::new();
        let job = registry.create(JobKind::Scrape);
        registry.set_progress(&job.id, 0.5);
        registry.set_progress(&job.id, 0.2);
        assert_eq!(registry.get(&job.id).unwrap().progress, 0.5);
    }

    #[test]
    fn unknown_job_lookup_returns_none() {
        let registry = JobRegistry::new();
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn complete_sets_terminal_state() {
        let registry = JobRegistry::new();
        let job = registry.create(JobKind::Validate);
        registry.complete(&job.id, serde_json::json!({"total_tested": 1}));
        let updated = registry.get(&job.id).unwrap();
        assert_eq!(updated.status, JobStatus::Completed);
        assert_eq!(updated.progress, 1.0);
    }
}
