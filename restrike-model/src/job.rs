use std::collections::HashSet;
use std::{fmt, result::Result as StdResult, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CollectionId, ImageId, JobId};

/// Distinguishes the artifact pipelines a job can feed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum JobKind {
    Cache = 0,
    Thumbnail = 1,
    Both = 2,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Cache => write!(f, "cache"),
            JobKind::Thumbnail => write!(f, "thumbnail"),
            JobKind::Both => write!(f, "both"),
        }
    }
}

impl FromStr for JobKind {
    type Err = &'static str;

    fn from_str(s: &str) -> StdResult<Self, Self::Err> {
        match s {
            "cache" => Ok(JobKind::Cache),
            "thumbnail" => Ok(JobKind::Thumbnail),
            "both" => Ok(JobKind::Both),
            _ => Err("unrecognized job kind"),
        }
    }
}

/// Store-visible job states. Completed/Failed/Cancelled are terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Envelope stored in persistence for each regeneration job.
///
/// `total_images` is fixed at creation from the owning collection's image
/// references; `processed` and `skipped` grow monotonically and never
/// overlap. A skipped image is a terminal per-image outcome, not a retry
/// candidate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoveryJob {
    pub job_id: JobId,
    pub kind: JobKind,
    pub collection_id: CollectionId,
    pub total_images: usize,
    pub processed: HashSet<ImageId>,
    pub skipped: HashSet<ImageId>,
    pub status: JobStatus,
    pub can_resume: bool,
    pub last_progress_at: Option<DateTime<Utc>>,
    pub settings_blob: Option<String>,
    pub output_folder: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status_reason: Option<String>,
}

impl RecoveryJob {
    pub fn new(
        job_id: JobId,
        kind: JobKind,
        collection_id: CollectionId,
        total_images: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            kind,
            collection_id,
            total_images,
            processed: HashSet::new(),
            skipped: HashSet::new(),
            status: JobStatus::Pending,
            can_resume: true,
            last_progress_at: None,
            settings_blob: None,
            output_folder: String::new(),
            created_at: now,
            completed_at: None,
            status_reason: None,
        }
    }

    pub fn with_settings_blob(mut self, blob: impl Into<String>) -> Self {
        self.settings_blob = Some(blob.into());
        self
    }

    pub fn with_output_folder(mut self, folder: impl Into<String>) -> Self {
        self.output_folder = folder.into();
        self
    }

    /// Count of images with a terminal per-image outcome.
    pub fn accounted(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }

    /// True once every referenced image is either processed or skipped.
    pub fn is_logically_complete(&self) -> bool {
        self.accounted() >= self.total_images
    }

    /// Staleness anchor: last progress increment, or creation time for jobs
    /// that died before any worker reported back.
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_progress_at.unwrap_or(self.created_at)
    }

    /// Adds an image to the processed set. Returns false without mutating
    /// when the job is terminal or the image already has an outcome.
    pub fn record_processed(&mut self, image_id: ImageId) -> bool {
        if self.status.is_terminal() || self.skipped.contains(&image_id) {
            return false;
        }
        let inserted = self.processed.insert(image_id);
        if inserted {
            self.last_progress_at = Some(Utc::now());
        }
        inserted
    }

    /// Adds an image to the skipped set under the same rules as
    /// [`Self::record_processed`]. First terminal outcome wins.
    pub fn record_skipped(&mut self, image_id: ImageId) -> bool {
        if self.status.is_terminal() || self.processed.contains(&image_id) {
            return false;
        }
        let inserted = self.skipped.insert(image_id);
        if inserted {
            self.last_progress_at = Some(Utc::now());
        }
        inserted
    }
}
