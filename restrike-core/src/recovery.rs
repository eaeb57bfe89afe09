//! Recovery orchestration entry points.
//!
//! The service decides which jobs can continue, claims them, and hands
//! the remainder to the resume strategies. All batch passes isolate
//! failures per job: one broken record never stops the sweep.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use restrike_model::{Collection, ImageId, JobId, JobKind, JobStatus, RecoveryJob};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RecoveryConfig;
use crate::error::Result;
use crate::ports::{
    CollectionRepository, JobStateStore, SettingsProvider, StorageFolderRegistry, WorkPublisher,
};
use crate::selector::StorageSelector;
use crate::strategy::ResumeStrategies;

/// Tally of one batch recovery pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySummary {
    /// Jobs resumed or confirmed complete.
    pub recovered: usize,
    /// Jobs that could not be recovered this pass.
    pub failed: usize,
    /// Stale jobs given up on and marked failed.
    pub abandoned: usize,
}

/// Resumes interrupted regeneration jobs from their persisted state.
pub struct RecoveryService {
    config: RecoveryConfig,
    job_store: Arc<dyn JobStateStore>,
    collections: Arc<dyn CollectionRepository>,
    strategies: ResumeStrategies,
    shutdown_token: CancellationToken,
}

impl fmt::Debug for RecoveryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RecoveryService {
    pub fn new(
        config: RecoveryConfig,
        job_store: Arc<dyn JobStateStore>,
        folders: Arc<dyn StorageFolderRegistry>,
        collections: Arc<dyn CollectionRepository>,
        publisher: Arc<dyn WorkPublisher>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        let selector = StorageSelector::new(folders, config.storage.fallback_root.clone());
        let strategies =
            ResumeStrategies::new(Arc::clone(&job_store), publisher, settings, selector);
        Self {
            config,
            job_store,
            collections,
            strategies,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Token observed by batch passes and the sweeper.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Stops in-flight batch passes at the next job boundary.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// Attempts to resume one job.
    ///
    /// Returns `Ok(true)` when the job ends up on track: work was
    /// queued, or it was already complete. `Ok(false)` means resumption
    /// is not possible, whether because the job is unknown, flagged
    /// non-resumable, terminally failed, its collection vanished, or a
    /// concurrent claim won. Errors are reserved for infrastructure
    /// failures.
    pub async fn resume_job(&self, job_id: &JobId) -> Result<bool> {
        let Some(job) = self.job_store.get(job_id).await? else {
            debug!(job_id = %job_id, "resume requested for unknown job");
            return Ok(false);
        };

        if !job.can_resume {
            info!(job_id = %job_id, "job is flagged non-resumable, leaving it alone");
            return Ok(false);
        }

        match job.status {
            JobStatus::Completed => return Ok(true),
            JobStatus::Failed | JobStatus::Cancelled => {
                info!(job_id = %job_id, status = %job.status, "job is terminal, nothing to resume");
                return Ok(false);
            }
            JobStatus::Pending | JobStatus::Running => {}
        }

        let Some(collection) = self.collections.get(job.collection_id).await? else {
            warn!(
                job_id = %job_id,
                collection_id = %job.collection_id,
                "collection no longer exists, disabling resumption"
            );
            self.disable_resumption(job_id, "collection not found").await?;
            return Ok(false);
        };

        let unprocessed = unprocessed_images(&job, &collection);
        if unprocessed.is_empty() {
            self.job_store
                .update_status(job_id, JobStatus::Completed, None)
                .await?;
            info!(job_id = %job_id, "job had no remaining work, marked completed");
            return Ok(true);
        }

        let claimed = self
            .job_store
            .transition_status(job_id, job.status, JobStatus::Running, None)
            .await?;
        if !claimed {
            info!(job_id = %job_id, "resume claim lost to a concurrent transition");
            return Ok(false);
        }

        let queued = self
            .strategies
            .resume(&job, &collection, &unprocessed)
            .await?;
        if queued {
            info!(
                job_id = %job_id,
                kind = %job.kind,
                remaining = unprocessed.len(),
                "job resumed"
            );
            return Ok(true);
        }

        // Nothing queued means every remaining reference was
        // skip-accounted, so the job is fully accounted.
        self.job_store
            .update_status(job_id, JobStatus::Completed, None)
            .await?;
        info!(job_id = %job_id, "job fully accounted after skip pass, marked completed");
        Ok(true)
    }

    /// Resumes every non-terminal job.
    pub async fn recover_incomplete(&self) -> RecoverySummary {
        let jobs = match self.job_store.incomplete_jobs().await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(error = %err, "incomplete job listing failed");
                return RecoverySummary::default();
            }
        };
        self.drain(jobs, "incomplete").await
    }

    /// Resumes every non-terminal job of one kind.
    pub async fn recover_incomplete_by_kind(&self, kind: JobKind) -> RecoverySummary {
        let jobs = match self.job_store.incomplete_jobs_by_kind(kind).await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(error = %err, kind = %kind, "incomplete job listing failed");
                return RecoverySummary::default();
            }
        };
        self.drain(jobs, "incomplete-by-kind").await
    }

    /// Handles jobs whose last activity predates `timeout`.
    ///
    /// Jobs idle past the configured abandon window are marked failed
    /// instead of retried; the rest go through the normal resume path.
    pub async fn recover_stale(&self, timeout: Duration) -> RecoverySummary {
        let now = Utc::now();
        let jobs = match self.job_store.stale_jobs(now - timeout).await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(error = %err, "stale job listing failed");
                return RecoverySummary::default();
            }
        };

        let abandon_after = self.config.stale.abandon_after(timeout);
        let mut summary = RecoverySummary::default();
        for job in jobs {
            if self.shutdown_token.is_cancelled() {
                info!("stale recovery interrupted by shutdown");
                break;
            }

            let anchor = job.last_activity_at();
            if now - anchor > abandon_after {
                let reason = format!(
                    "no progress since {}, beyond {}x the stale timeout",
                    anchor.to_rfc3339(),
                    self.config.stale.abandon_multiplier
                );
                match self
                    .job_store
                    .update_status(&job.job_id, JobStatus::Failed, Some(reason))
                    .await
                {
                    Ok(()) => {
                        warn!(job_id = %job.job_id, "stale job abandoned");
                        summary.abandoned += 1;
                    }
                    Err(err) => {
                        warn!(job_id = %job.job_id, error = %err, "failed to abandon stale job");
                        summary.failed += 1;
                    }
                }
                continue;
            }

            match self.resume_job(&job.job_id).await {
                Ok(true) => summary.recovered += 1,
                Ok(false) => summary.failed += 1,
                Err(err) => {
                    warn!(job_id = %job.job_id, error = %err, "stale resume attempt failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            recovered = summary.recovered,
            failed = summary.failed,
            abandoned = summary.abandoned,
            "stale recovery pass finished"
        );
        summary
    }

    /// How many jobs the next stale pass would look at.
    pub async fn stale_job_count(&self, timeout: Duration) -> usize {
        match self.job_store.stale_jobs(Utc::now() - timeout).await {
            Ok(jobs) => jobs.len(),
            Err(err) => {
                warn!(error = %err, "stale job listing failed");
                0
            }
        }
    }

    /// Permanently ends resumption for a job. No-op when the job is
    /// unknown.
    pub async fn disable_resumption(&self, job_id: &JobId, reason: &str) -> Result<()> {
        let Some(mut job) = self.job_store.get(job_id).await? else {
            return Ok(());
        };
        job.can_resume = false;
        job.status = JobStatus::Failed;
        job.status_reason = Some(reason.to_string());
        self.job_store.save(job).await?;
        warn!(job_id = %job_id, reason, "job resumption disabled");
        Ok(())
    }

    /// Deletes completed job records older than the given horizon,
    /// returning how many went away.
    pub async fn cleanup_completed(&self, older_than_days: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        match self.job_store.delete_completed_before(cutoff).await {
            Ok(deleted) => {
                if deleted > 0 {
                    info!(deleted, older_than_days, "completed job records cleaned up");
                }
                deleted
            }
            Err(err) => {
                warn!(error = %err, "completed job cleanup failed");
                0
            }
        }
    }

    /// Ids of jobs a batch pass would attempt.
    pub async fn resumable_job_ids(&self) -> Vec<JobId> {
        match self.job_store.incomplete_jobs().await {
            Ok(jobs) => jobs
                .into_iter()
                .filter(|job| job.can_resume)
                .map(|job| job.job_id)
                .collect(),
            Err(err) => {
                warn!(error = %err, "incomplete job listing failed");
                Vec::new()
            }
        }
    }

    /// Ids of resumable jobs of one kind.
    pub async fn resumable_job_ids_by_kind(&self, kind: JobKind) -> Vec<JobId> {
        match self.job_store.incomplete_jobs_by_kind(kind).await {
            Ok(jobs) => jobs
                .into_iter()
                .filter(|job| job.can_resume)
                .map(|job| job.job_id)
                .collect(),
            Err(err) => {
                warn!(error = %err, kind = %kind, "incomplete job listing failed");
                Vec::new()
            }
        }
    }

    async fn drain(&self, jobs: Vec<RecoveryJob>, pass: &str) -> RecoverySummary {
        let mut summary = RecoverySummary::default();
        for job in jobs {
            if self.shutdown_token.is_cancelled() {
                info!(pass, "recovery pass interrupted by shutdown");
                break;
            }
            match self.resume_job(&job.job_id).await {
                Ok(true) => summary.recovered += 1,
                Ok(false) => summary.failed += 1,
                Err(err) => {
                    warn!(job_id = %job.job_id, error = %err, "resume attempt failed");
                    summary.failed += 1;
                }
            }
        }
        info!(
            pass,
            recovered = summary.recovered,
            failed = summary.failed,
            "recovery pass finished"
        );
        summary
    }
}

/// Remaining work in collection order: referenced images with no
/// terminal per-image outcome yet.
fn unprocessed_images(job: &RecoveryJob, collection: &Collection) -> Vec<ImageId> {
    collection
        .image_ids
        .iter()
        .filter(|id| !job.processed.contains(id) && !job.skipped.contains(id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use async_trait::async_trait;
    use chrono::DateTime;
    use restrike_model::{
        CollectionId, CollectionKind, FolderId, ImageEntry, StorageFolder, WorkMessage,
    };
    use uuid::Uuid;

    use super::*;
    use crate::ports::{
        FixedSettingsProvider, InMemoryCollectionRepository, InMemoryFolderRegistry,
        InMemoryJobStateStore, RecordingPublisher,
    };

    struct Fixture {
        service: RecoveryService,
        job_store: Arc<InMemoryJobStateStore>,
        collections: Arc<InMemoryCollectionRepository>,
        publisher: Arc<RecordingPublisher>,
    }

    fn fixture() -> Fixture {
        fixture_with(RecoveryConfig::default())
    }

    fn fixture_with(config: RecoveryConfig) -> Fixture {
        let job_store = Arc::new(InMemoryJobStateStore::new());
        let collections = Arc::new(InMemoryCollectionRepository::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let folders = Arc::new(InMemoryFolderRegistry::new(vec![
            StorageFolder::new("/disk-1").with_id(FolderId(Uuid::from_u128(1))),
        ]));
        let service = RecoveryService::new(
            config,
            job_store.clone(),
            folders,
            collections.clone(),
            publisher.clone(),
            Arc::new(FixedSettingsProvider::default()),
        );
        Fixture {
            service,
            job_store,
            collections,
            publisher,
        }
    }

    fn collection(images: &[&str]) -> Collection {
        Collection {
            id: CollectionId::new(),
            path: PathBuf::from("/library/shoot-01"),
            kind: CollectionKind::Folder,
            image_ids: images.iter().map(|name| ImageId::from(*name)).collect(),
            images: images
                .iter()
                .map(|name| ImageEntry {
                    id: ImageId::from(*name),
                    filename: format!("{name}.raw"),
                    file_size: 1024,
                })
                .collect(),
        }
    }

    fn job(id: &str, kind: JobKind, collection: &Collection) -> RecoveryJob {
        RecoveryJob::new(
            JobId::from(id),
            kind,
            collection.id,
            collection.image_ids.len(),
        )
    }

    async fn stored_job(fixture: &Fixture, id: &str) -> RecoveryJob {
        fixture
            .job_store
            .get(&JobId::from(id))
            .await
            .expect("get job")
            .expect("job exists")
    }

    async fn published_ids(fixture: &Fixture) -> Vec<ImageId> {
        fixture
            .publisher
            .published()
            .await
            .iter()
            .map(|message| message.image_id().clone())
            .collect()
    }

    #[tokio::test]
    async fn resume_publishes_only_the_remainder() {
        let fixture = fixture();
        let collection = collection(&["a", "b", "c", "d", "e"]);
        fixture.collections.insert(collection.clone()).await;

        let mut seeded = job("J1", JobKind::Cache, &collection);
        seeded.processed.insert(ImageId::from("a"));
        seeded.processed.insert(ImageId::from("b"));
        fixture.job_store.save(seeded).await.expect("seed");

        let resumed = fixture
            .service
            .resume_job(&JobId::from("J1"))
            .await
            .expect("resume");
        assert!(resumed);

        let ids = published_ids(&fixture).await;
        assert_eq!(
            ids,
            [ImageId::from("c"), ImageId::from("d"), ImageId::from("e")]
        );
        let published = fixture.publisher.published().await;
        assert!(
            published
                .iter()
                .all(|message| message.job_id() == &JobId::from("J1"))
        );
        assert_eq!(stored_job(&fixture, "J1").await.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn repeated_resume_without_progress_is_idempotent() {
        let fixture = fixture();
        let collection = collection(&["a", "b"]);
        fixture.collections.insert(collection.clone()).await;
        fixture
            .job_store
            .save(job("again", JobKind::Cache, &collection))
            .await
            .expect("seed");

        let job_id = JobId::from("again");
        assert!(fixture.service.resume_job(&job_id).await.expect("first"));
        assert!(fixture.service.resume_job(&job_id).await.expect("second"));

        let ids = published_ids(&fixture).await;
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[..2], ids[2..]);
        assert_eq!(stored_job(&fixture, "again").await.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn fully_accounted_job_completes_without_publishing() {
        let fixture = fixture();
        let collection = collection(&["a", "b", "c"]);
        fixture.collections.insert(collection.clone()).await;

        let mut seeded = job("done-already", JobKind::Cache, &collection);
        seeded.processed.insert(ImageId::from("a"));
        seeded.processed.insert(ImageId::from("b"));
        seeded.skipped.insert(ImageId::from("c"));
        fixture.job_store.save(seeded).await.expect("seed");

        let resumed = fixture
            .service
            .resume_job(&JobId::from("done-already"))
            .await
            .expect("resume");
        assert!(resumed);
        assert!(fixture.publisher.published().await.is_empty());

        let stored = stored_job(&fixture, "done-already").await;
        assert_eq!(stored.status, JobStatus::Completed);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn missing_image_is_skipped_and_job_stays_open() {
        let fixture = fixture();
        let mut collection = collection(&["a", "b", "c"]);
        collection.images.retain(|entry| entry.id != ImageId::from("b"));
        fixture.collections.insert(collection.clone()).await;
        fixture
            .job_store
            .save(job("gapped", JobKind::Cache, &collection))
            .await
            .expect("seed");

        let job_id = JobId::from("gapped");
        assert!(fixture.service.resume_job(&job_id).await.expect("resume"));

        let ids = published_ids(&fixture).await;
        assert_eq!(ids, [ImageId::from("a"), ImageId::from("c")]);
        let stored = stored_job(&fixture, "gapped").await;
        assert!(stored.skipped.contains(&ImageId::from("b")));
        assert_eq!(stored.status, JobStatus::Running);

        for name in ["a", "c"] {
            fixture
                .job_store
                .mark_processed(&job_id, ImageId::from(name))
                .await
                .expect("mark");
        }
        assert!(fixture.service.resume_job(&job_id).await.expect("resume again"));
        assert_eq!(fixture.publisher.published().await.len(), 2);
        assert_eq!(stored_job(&fixture, "gapped").await.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_job_is_not_an_error() {
        let fixture = fixture();
        let resumed = fixture
            .service
            .resume_job(&JobId::from("ghost"))
            .await
            .expect("resume");
        assert!(!resumed);
    }

    #[tokio::test]
    async fn non_resumable_job_is_left_alone() {
        let fixture = fixture();
        let collection = collection(&["a"]);
        fixture.collections.insert(collection.clone()).await;

        let mut seeded = job("frozen", JobKind::Cache, &collection);
        seeded.can_resume = false;
        fixture.job_store.save(seeded).await.expect("seed");

        let resumed = fixture
            .service
            .resume_job(&JobId::from("frozen"))
            .await
            .expect("resume");
        assert!(!resumed);
        assert!(fixture.publisher.published().await.is_empty());
        assert_eq!(stored_job(&fixture, "frozen").await.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn terminal_jobs_short_circuit() {
        let fixture = fixture();
        let collection = collection(&["a"]);
        fixture.collections.insert(collection.clone()).await;

        let mut completed = job("finished", JobKind::Cache, &collection);
        completed.status = JobStatus::Completed;
        let mut cancelled = job("stopped", JobKind::Cache, &collection);
        cancelled.status = JobStatus::Cancelled;
        fixture.job_store.save(completed).await.expect("seed");
        fixture.job_store.save(cancelled).await.expect("seed");

        assert!(fixture
            .service
            .resume_job(&JobId::from("finished"))
            .await
            .expect("resume completed"));
        assert!(!fixture
            .service
            .resume_job(&JobId::from("stopped"))
            .await
            .expect("resume cancelled"));
        assert!(fixture.publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn vanished_collection_permanently_disables_resumption() {
        let fixture = fixture();
        let collection = collection(&["a", "b"]);
        // The collection is never inserted; only the job remembers it.
        fixture
            .job_store
            .save(job("orphaned", JobKind::Cache, &collection))
            .await
            .expect("seed");

        let job_id = JobId::from("orphaned");
        assert!(!fixture.service.resume_job(&job_id).await.expect("resume"));

        let stored = stored_job(&fixture, "orphaned").await;
        assert!(!stored.can_resume);
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.status_reason.as_deref(), Some("collection not found"));

        assert!(!fixture.service.resume_job(&job_id).await.expect("resume again"));
        assert!(fixture.publisher.published().await.is_empty());
    }

    #[derive(Clone, Debug)]
    struct ClaimLosingStore {
        inner: InMemoryJobStateStore,
    }

    #[async_trait]
    impl JobStateStore for ClaimLosingStore {
        async fn get(&self, job_id: &JobId) -> crate::error::Result<Option<RecoveryJob>> {
            self.inner.get(job_id).await
        }

        async fn save(&self, job: RecoveryJob) -> crate::error::Result<()> {
            self.inner.save(job).await
        }

        async fn incomplete_jobs(&self) -> crate::error::Result<Vec<RecoveryJob>> {
            self.inner.incomplete_jobs().await
        }

        async fn incomplete_jobs_by_kind(
            &self,
            kind: JobKind,
        ) -> crate::error::Result<Vec<RecoveryJob>> {
            self.inner.incomplete_jobs_by_kind(kind).await
        }

        async fn stale_jobs(
            &self,
            older_than: DateTime<Utc>,
        ) -> crate::error::Result<Vec<RecoveryJob>> {
            self.inner.stale_jobs(older_than).await
        }

        async fn update_status(
            &self,
            job_id: &JobId,
            status: JobStatus,
            reason: Option<String>,
        ) -> crate::error::Result<()> {
            self.inner.update_status(job_id, status, reason).await
        }

        async fn transition_status(
            &self,
            _job_id: &JobId,
            _expected: JobStatus,
            _next: JobStatus,
            _reason: Option<String>,
        ) -> crate::error::Result<bool> {
            Ok(false)
        }

        async fn mark_processed(
            &self,
            job_id: &JobId,
            image_id: ImageId,
        ) -> crate::error::Result<bool> {
            self.inner.mark_processed(job_id, image_id).await
        }

        async fn mark_skipped(
            &self,
            job_id: &JobId,
            image_id: ImageId,
        ) -> crate::error::Result<bool> {
            self.inner.mark_skipped(job_id, image_id).await
        }

        async fn delete_completed_before(
            &self,
            cutoff: DateTime<Utc>,
        ) -> crate::error::Result<usize> {
            self.inner.delete_completed_before(cutoff).await
        }
    }

    #[tokio::test]
    async fn lost_claim_means_no_publish() {
        let inner = InMemoryJobStateStore::new();
        let collections = Arc::new(InMemoryCollectionRepository::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let folders = Arc::new(InMemoryFolderRegistry::new(vec![
            StorageFolder::new("/disk-1").with_id(FolderId(Uuid::from_u128(1))),
        ]));
        let service = RecoveryService::new(
            RecoveryConfig::default(),
            Arc::new(ClaimLosingStore { inner: inner.clone() }),
            folders,
            collections.clone(),
            publisher.clone(),
            Arc::new(FixedSettingsProvider::default()),
        );

        let collection = collection(&["a", "b"]);
        collections.insert(collection.clone()).await;
        inner
            .save(job("contested", JobKind::Cache, &collection))
            .await
            .expect("seed");

        let resumed = service
            .resume_job(&JobId::from("contested"))
            .await
            .expect("resume");
        assert!(!resumed);
        assert!(publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn batch_recovery_isolates_per_job_failures() {
        let fixture = fixture();
        let healthy = collection(&["a", "b"]);
        fixture.collections.insert(healthy.clone()).await;
        let orphaned = collection(&["x"]);

        let mut first = job("healthy", JobKind::Cache, &healthy);
        first.created_at = Utc::now() - Duration::minutes(10);
        fixture.job_store.save(first).await.expect("seed");
        fixture
            .job_store
            .save(job("orphaned", JobKind::Cache, &orphaned))
            .await
            .expect("seed");

        let summary = fixture.service.recover_incomplete().await;
        assert_eq!(
            summary,
            RecoverySummary {
                recovered: 1,
                failed: 1,
                abandoned: 0
            }
        );

        let ids = published_ids(&fixture).await;
        assert_eq!(ids, [ImageId::from("a"), ImageId::from("b")]);
    }

    #[tokio::test]
    async fn batch_recovery_filters_by_kind() {
        let fixture = fixture();
        let shared = collection(&["a"]);
        fixture.collections.insert(shared.clone()).await;
        fixture
            .job_store
            .save(job("cache-job", JobKind::Cache, &shared))
            .await
            .expect("seed");
        fixture
            .job_store
            .save(job("thumb-job", JobKind::Thumbnail, &shared))
            .await
            .expect("seed");

        let summary = fixture
            .service
            .recover_incomplete_by_kind(JobKind::Thumbnail)
            .await;
        assert_eq!(summary.recovered, 1);

        let published = fixture.publisher.published().await;
        assert_eq!(published.len(), 1);
        assert!(matches!(published[0], WorkMessage::ThumbnailRegen(_)));
    }

    #[tokio::test]
    async fn stale_recovery_graduates_by_idle_time() {
        let mut config = RecoveryConfig::default();
        config.stale.timeout_secs = 60;
        config.stale.abandon_multiplier = 3;
        let fixture = fixture_with(config);

        let shared = collection(&["a"]);
        fixture.collections.insert(shared.clone()).await;

        let mut lagging = job("lagging", JobKind::Cache, &shared);
        lagging.status = JobStatus::Running;
        lagging.last_progress_at = Some(Utc::now() - Duration::seconds(90));
        let mut stuck = job("stuck", JobKind::Cache, &shared);
        stuck.status = JobStatus::Running;
        stuck.last_progress_at = Some(Utc::now() - Duration::seconds(210));
        fixture.job_store.save(lagging).await.expect("seed");
        fixture.job_store.save(stuck).await.expect("seed");

        let summary = fixture.service.recover_stale(Duration::seconds(60)).await;
        assert_eq!(summary.recovered, 1);
        assert_eq!(summary.abandoned, 1);

        let stuck = stored_job(&fixture, "stuck").await;
        assert_eq!(stuck.status, JobStatus::Failed);
        assert!(stuck
            .status_reason
            .as_deref()
            .is_some_and(|reason| reason.contains("no progress since")));

        let lagging = stored_job(&fixture, "lagging").await;
        assert_eq!(lagging.status, JobStatus::Running);
        assert_eq!(published_ids(&fixture).await, [ImageId::from("a")]);
    }

    #[tokio::test]
    async fn stale_count_ignores_active_jobs() {
        let fixture = fixture();
        let shared = collection(&["a"]);
        fixture.collections.insert(shared.clone()).await;

        let mut idle = job("idle", JobKind::Cache, &shared);
        idle.created_at = Utc::now() - Duration::hours(2);
        let fresh = job("fresh", JobKind::Cache, &shared);
        fixture.job_store.save(idle).await.expect("seed");
        fixture.job_store.save(fresh).await.expect("seed");

        assert_eq!(fixture.service.stale_job_count(Duration::hours(1)).await, 1);
    }

    #[tokio::test]
    async fn cleanup_applies_the_retention_horizon() {
        let fixture = fixture();
        let shared = collection(&["a"]);

        let mut ancient = job("ancient", JobKind::Cache, &shared);
        ancient.status = JobStatus::Completed;
        ancient.completed_at = Some(Utc::now() - Duration::days(40));
        let mut recent = job("recent", JobKind::Cache, &shared);
        recent.status = JobStatus::Completed;
        recent.completed_at = Some(Utc::now() - Duration::days(3));
        fixture.job_store.save(ancient).await.expect("seed");
        fixture.job_store.save(recent).await.expect("seed");

        assert_eq!(fixture.service.cleanup_completed(30).await, 1);
        assert!(fixture
            .job_store
            .get(&JobId::from("ancient"))
            .await
            .expect("get")
            .is_none());
    }

    #[tokio::test]
    async fn shutdown_interrupts_batch_recovery() {
        let fixture = fixture();
        let shared = collection(&["a"]);
        fixture.collections.insert(shared.clone()).await;
        fixture
            .job_store
            .save(job("pending-1", JobKind::Cache, &shared))
            .await
            .expect("seed");
        fixture
            .job_store
            .save(job("pending-2", JobKind::Cache, &shared))
            .await
            .expect("seed");

        fixture.service.shutdown();
        let summary = fixture.service.recover_incomplete().await;
        assert_eq!(summary, RecoverySummary::default());
        assert!(fixture.publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn resumable_ids_filter_by_flag_and_kind() {
        let fixture = fixture();
        let shared = collection(&["a"]);
        fixture.collections.insert(shared.clone()).await;

        let mut open = job("open", JobKind::Cache, &shared);
        open.created_at = Utc::now() - Duration::minutes(2);
        let mut frozen = job("frozen", JobKind::Cache, &shared);
        frozen.can_resume = false;
        frozen.created_at = Utc::now() - Duration::minutes(1);
        let thumb = job("thumb", JobKind::Thumbnail, &shared);
        for seeded in [open, frozen, thumb] {
            fixture.job_store.save(seeded).await.expect("seed");
        }

        let all = fixture.service.resumable_job_ids().await;
        assert_eq!(all, [JobId::from("open"), JobId::from("thumb")]);

        let cache_only = fixture
            .service
            .resumable_job_ids_by_kind(JobKind::Cache)
            .await;
        assert_eq!(cache_only, [JobId::from("open")]);
    }
}
