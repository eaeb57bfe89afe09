//! Durable job state, the source of truth for resumption decisions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use restrike_model::{ImageId, JobId, JobKind, JobStatus, RecoveryJob};
use tokio::sync::Mutex;

use crate::error::{RecoveryError, Result};

/// Persistence port for [`RecoveryJob`] records.
///
/// Every method is atomic with respect to the others; the orchestrator
/// relies on that for its claim and increment semantics.
#[async_trait]
pub trait JobStateStore: Send + Sync {
    /// Fetches one job by id.
    async fn get(&self, job_id: &JobId) -> Result<Option<RecoveryJob>>;

    /// Inserts or replaces a job record wholesale.
    async fn save(&self, job: RecoveryJob) -> Result<()>;

    /// All jobs in a non-terminal status, oldest first.
    async fn incomplete_jobs(&self) -> Result<Vec<RecoveryJob>>;

    /// Non-terminal jobs of one kind, oldest first.
    async fn incomplete_jobs_by_kind(&self, kind: JobKind) -> Result<Vec<RecoveryJob>>;

    /// Non-terminal jobs whose last activity predates `older_than`.
    async fn stale_jobs(&self, older_than: DateTime<Utc>) -> Result<Vec<RecoveryJob>>;

    /// Unconditionally sets a job's status, with an optional reason.
    async fn update_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<()>;

    /// Compare-and-swap status transition. Returns `Ok(false)` when the
    /// job is absent or its current status does not match `expected`.
    async fn transition_status(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        next: JobStatus,
        reason: Option<String>,
    ) -> Result<bool>;

    /// Records one image as processed. Returns whether the set changed.
    async fn mark_processed(&self, job_id: &JobId, image_id: ImageId) -> Result<bool>;

    /// Records one image as skipped. Returns whether the set changed.
    async fn mark_skipped(&self, job_id: &JobId, image_id: ImageId) -> Result<bool>;

    /// Deletes completed jobs that finished before `cutoff`, returning
    /// how many records went away.
    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Reference store keeping all records behind one async mutex.
#[derive(Clone, Debug, Default)]
pub struct InMemoryJobStateStore {
    jobs: Arc<Mutex<HashMap<JobId, RecoveryJob>>>,
}

impl InMemoryJobStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, for inspection in tests and tooling.
    pub async fn all(&self) -> Vec<RecoveryJob> {
        let guard = self.jobs.lock().await;
        let mut jobs: Vec<RecoveryJob> = guard.values().cloned().collect();
        sort_oldest_first(&mut jobs);
        jobs
    }
}

fn sort_oldest_first(jobs: &mut [RecoveryJob]) {
    jobs.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.job_id.as_str().cmp(b.job_id.as_str()))
    });
}

fn apply_status(job: &mut RecoveryJob, status: JobStatus, reason: Option<String>) {
    job.status = status;
    match status {
        JobStatus::Completed => {
            job.completed_at = Some(Utc::now());
        }
        JobStatus::Failed | JobStatus::Cancelled => {}
        JobStatus::Pending | JobStatus::Running => {
            job.completed_at = None;
            job.status_reason = None;
        }
    }
    if reason.is_some() {
        job.status_reason = reason;
    }
}

#[async_trait]
impl JobStateStore for InMemoryJobStateStore {
    async fn get(&self, job_id: &JobId) -> Result<Option<RecoveryJob>> {
        let guard = self.jobs.lock().await;
        Ok(guard.get(job_id).cloned())
    }

    async fn save(&self, job: RecoveryJob) -> Result<()> {
        let mut guard = self.jobs.lock().await;
        guard.insert(job.job_id.clone(), job);
        Ok(())
    }

    async fn incomplete_jobs(&self) -> Result<Vec<RecoveryJob>> {
        let guard = self.jobs.lock().await;
        let mut jobs: Vec<RecoveryJob> = guard
            .values()
            .filter(|job| !job.status.is_terminal())
            .cloned()
            .collect();
        sort_oldest_first(&mut jobs);
        Ok(jobs)
    }

    async fn incomplete_jobs_by_kind(&self, kind: JobKind) -> Result<Vec<RecoveryJob>> {
        let guard = self.jobs.lock().await;
        let mut jobs: Vec<RecoveryJob> = guard
            .values()
            .filter(|job| !job.status.is_terminal() && job.kind == kind)
            .cloned()
            .collect();
        sort_oldest_first(&mut jobs);
        Ok(jobs)
    }

    async fn stale_jobs(&self, older_than: DateTime<Utc>) -> Result<Vec<RecoveryJob>> {
        let guard = self.jobs.lock().await;
        let mut jobs: Vec<RecoveryJob> = guard
            .values()
            .filter(|job| !job.status.is_terminal() && job.last_activity_at() < older_than)
            .cloned()
            .collect();
        sort_oldest_first(&mut jobs);
        Ok(jobs)
    }

    async fn update_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<()> {
        let mut guard = self.jobs.lock().await;
        let job = guard
            .get_mut(job_id)
            .ok_or_else(|| RecoveryError::NotFound(format!("job {job_id}")))?;
        apply_status(job, status, reason);
        Ok(())
    }

    async fn transition_status(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        next: JobStatus,
        reason: Option<String>,
    ) -> Result<bool> {
        let mut guard = self.jobs.lock().await;
        let Some(job) = guard.get_mut(job_id) else {
            return Ok(false);
        };
        if job.status != expected {
            return Ok(false);
        }
        apply_status(job, next, reason);
        Ok(true)
    }

    async fn mark_processed(&self, job_id: &JobId, image_id: ImageId) -> Result<bool> {
        let mut guard = self.jobs.lock().await;
        let job = guard
            .get_mut(job_id)
            .ok_or_else(|| RecoveryError::NotFound(format!("job {job_id}")))?;
        Ok(job.record_processed(image_id))
    }

    async fn mark_skipped(&self, job_id: &JobId, image_id: ImageId) -> Result<bool> {
        let mut guard = self.jobs.lock().await;
        let job = guard
            .get_mut(job_id)
            .ok_or_else(|| RecoveryError::NotFound(format!("job {job_id}")))?;
        Ok(job.record_skipped(image_id))
    }

    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut guard = self.jobs.lock().await;
        let before = guard.len();
        guard.retain(|_, job| {
            !(job.status == JobStatus::Completed
                && job.completed_at.is_some_and(|finished| finished < cutoff))
        });
        Ok(before - guard.len())
    }
}
