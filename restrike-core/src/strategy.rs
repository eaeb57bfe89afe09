//! Per-kind resume planning.
//!
//! A strategy turns the unprocessed remainder of a job into outbound
//! work messages, one per image still referenced by the collection.
//! Images the collection no longer carries are skip-accounted in the
//! job store instead of published; silently dropping them would leave
//! the job short of its fixed total forever.

use std::fmt;
use std::sync::Arc;

use restrike_model::{
    CacheRegenMessage, Collection, EncodeSettings, ImageId, JobKind, RecoveryJob,
    SourceDescriptor, ThumbnailRegenMessage, WorkMessage,
};
use tracing::debug;

use crate::error::Result;
use crate::ports::{JobStateStore, SettingsProvider, WorkPublisher};
use crate::selector::{ArtifactKind, StorageSelector};

/// Plans and publishes the regeneration work for resumed jobs.
pub struct ResumeStrategies {
    job_store: Arc<dyn JobStateStore>,
    publisher: Arc<dyn WorkPublisher>,
    settings: Arc<dyn SettingsProvider>,
    selector: StorageSelector,
}

impl fmt::Debug for ResumeStrategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeStrategies")
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl ResumeStrategies {
    pub fn new(
        job_store: Arc<dyn JobStateStore>,
        publisher: Arc<dyn WorkPublisher>,
        settings: Arc<dyn SettingsProvider>,
        selector: StorageSelector,
    ) -> Self {
        Self {
            job_store,
            publisher,
            settings,
            selector,
        }
    }

    /// Dispatches on the job kind. Returns whether any message was
    /// queued; `false` means every remaining image was skip-accounted
    /// and nothing is in flight.
    pub async fn resume(
        &self,
        job: &RecoveryJob,
        collection: &Collection,
        unprocessed: &[ImageId],
    ) -> Result<bool> {
        match job.kind {
            JobKind::Cache => self.resume_cache(job, collection, unprocessed).await,
            JobKind::Thumbnail => self.resume_thumbnail(job, collection, unprocessed).await,
            JobKind::Both => {
                let cache = self.resume_cache(job, collection, unprocessed).await?;
                let thumbnail = self.resume_thumbnail(job, collection, unprocessed).await?;
                Ok(cache || thumbnail)
            }
        }
    }

    async fn resume_cache(
        &self,
        job: &RecoveryJob,
        collection: &Collection,
        unprocessed: &[ImageId],
    ) -> Result<bool> {
        let settings = self.effective_settings(job, JobKind::Cache);
        let index = collection.image_index();
        let mut queued = 0usize;
        let mut skipped = 0usize;

        for image_id in unprocessed {
            let Some(entry) = index.get(image_id) else {
                self.job_store
                    .mark_skipped(&job.job_id, image_id.clone())
                    .await?;
                skipped += 1;
                continue;
            };

            let destination = self
                .selector
                .select(
                    job.collection_id,
                    image_id,
                    settings.width,
                    settings.height,
                    settings.format,
                    ArtifactKind::Cache,
                )
                .await;

            let message = WorkMessage::CacheRegen(CacheRegenMessage {
                job_id: job.job_id.clone(),
                image_id: image_id.clone(),
                collection_id: job.collection_id,
                source: SourceDescriptor::for_entry(collection, entry.filename.clone()),
                destination,
                width: settings.width,
                height: settings.height,
                quality: settings.quality,
                format: settings.format,
                force_regenerate: false,
                created_by_system: true,
            });
            self.publisher.publish(message).await?;
            queued += 1;
        }

        debug!(job_id = %job.job_id, queued, skipped, "cache resume planned");
        Ok(queued > 0)
    }

    async fn resume_thumbnail(
        &self,
        job: &RecoveryJob,
        collection: &Collection,
        unprocessed: &[ImageId],
    ) -> Result<bool> {
        let settings = self.effective_settings(job, JobKind::Thumbnail);
        let index = collection.image_index();
        let mut queued = 0usize;
        let mut skipped = 0usize;

        for image_id in unprocessed {
            let Some(entry) = index.get(image_id) else {
                self.job_store
                    .mark_skipped(&job.job_id, image_id.clone())
                    .await?;
                skipped += 1;
                continue;
            };

            // Thumbnail destinations are owned by the consumer's own
            // storage layout; the message deliberately names none.
            let message = WorkMessage::ThumbnailRegen(ThumbnailRegenMessage {
                job_id: job.job_id.clone(),
                image_id: image_id.clone(),
                collection_id: job.collection_id,
                source: SourceDescriptor::for_entry(collection, entry.filename.clone()),
                width: settings.width,
                height: settings.height,
            });
            self.publisher.publish(message).await?;
            queued += 1;
        }

        debug!(job_id = %job.job_id, queued, skipped, "thumbnail resume planned");
        Ok(queued > 0)
    }

    /// Job settings blob when parseable, per-kind defaults otherwise.
    fn effective_settings(&self, job: &RecoveryJob, half: JobKind) -> EncodeSettings {
        match job.settings_blob.as_deref() {
            Some(blob) => match serde_json::from_str(blob) {
                Ok(settings) => settings,
                Err(err) => {
                    debug!(
                        job_id = %job.job_id,
                        error = %err,
                        "settings blob unparseable, using defaults"
                    );
                    self.settings.defaults_for(half)
                }
            },
            None => self.settings.defaults_for(half),
        }
    }
}
