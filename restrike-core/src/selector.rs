//! Deterministic storage-folder selection.
//!
//! A collection's artifacts always land in the same storage folder so
//! regenerated files overwrite their predecessors instead of leaking
//! copies across disks. Placement uses highest-random-weight hashing
//! over the string forms of the ids: every process picks the same
//! folder for the same collection, and removing a folder only moves
//! the collections that lived on it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use restrike_model::{CollectionId, EncodeFormat, FolderId, ImageId, StorageFolder};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::ports::StorageFolderRegistry;

/// Which artifact family a path is being computed for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArtifactKind {
    Cache,
    Thumbnail,
}

impl ArtifactKind {
    fn segment(&self) -> &'static str {
        match self {
            ArtifactKind::Cache => "cache",
            ArtifactKind::Thumbnail => "thumbnails",
        }
    }
}

/// Computes artifact destinations from the active storage folder set.
#[derive(Clone)]
pub struct StorageSelector {
    registry: Arc<dyn StorageFolderRegistry>,
    fallback_root: PathBuf,
}

impl fmt::Debug for StorageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSelector")
            .field("fallback_root", &self.fallback_root)
            .finish_non_exhaustive()
    }
}

impl StorageSelector {
    pub fn new(registry: Arc<dyn StorageFolderRegistry>, fallback_root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            fallback_root: fallback_root.into(),
        }
    }

    /// Deterministic artifact path for one image of a collection.
    ///
    /// With no active folder, cache artifacts fall back to the local
    /// root while thumbnails return `None` and leave placement to the
    /// consumer. A registry failure also returns `None`; guessing a
    /// destination from an unknown folder set would scatter artifacts.
    pub async fn select(
        &self,
        collection_id: CollectionId,
        image_id: &ImageId,
        width: u32,
        height: u32,
        format: EncodeFormat,
        kind: ArtifactKind,
    ) -> Option<PathBuf> {
        let folders = match self.registry.all_folders().await {
            Ok(folders) => folders,
            Err(err) => {
                warn!(
                    error = %err,
                    collection_id = %collection_id,
                    "storage folder lookup failed, no placement computed"
                );
                return None;
            }
        };

        let mut active: Vec<StorageFolder> =
            folders.into_iter().filter(|folder| folder.is_active).collect();
        active.sort_by_key(|folder| folder.id);

        let root = match pick_folder(collection_id, &active) {
            Some(folder) => folder.path.clone(),
            None => match kind {
                ArtifactKind::Cache => {
                    warn!(
                        collection_id = %collection_id,
                        fallback = %self.fallback_root.display(),
                        "no active storage folders, using local fallback"
                    );
                    self.fallback_root.clone()
                }
                ArtifactKind::Thumbnail => {
                    warn!(
                        collection_id = %collection_id,
                        "no active storage folders, thumbnail placement left to consumer"
                    );
                    return None;
                }
            },
        };

        Some(artifact_path(
            &root, kind, collection_id, image_id, width, height, format,
        ))
    }
}

/// Highest-random-weight pick. Order independent: the winner is the
/// folder with the maximal weight, ties broken by folder id.
fn pick_folder(collection_id: CollectionId, folders: &[StorageFolder]) -> Option<&StorageFolder> {
    folders
        .iter()
        .map(|folder| (placement_weight(collection_id, folder.id), folder))
        .max_by(|(weight_a, a), (weight_b, b)| {
            weight_a.cmp(weight_b).then_with(|| a.id.cmp(&b.id))
        })
        .map(|(_, folder)| folder)
}

/// 64-bit placement score for a collection/folder pair. Hashes the
/// string forms of the ids; native hashes are seeded per process and
/// would reshuffle placements on every restart.
fn placement_weight(collection_id: CollectionId, folder_id: FolderId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(collection_id.as_str().as_bytes());
    hasher.update(b"/");
    hasher.update(folder_id.as_str().as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

fn artifact_path(
    root: &Path,
    kind: ArtifactKind,
    collection_id: CollectionId,
    image_id: &ImageId,
    width: u32,
    height: u32,
    format: EncodeFormat,
) -> PathBuf {
    root.join(kind.segment())
        .join(collection_id.as_str())
        .join(format!(
            "{image_id}_{width}x{height}.{}",
            format.extension()
        ))
}
