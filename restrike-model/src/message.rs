use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::collection::{Collection, CollectionKind};
use crate::ids::{CollectionId, ImageId, JobId};
use crate::settings::EncodeFormat;

/// Where a source image lives, carried so consumers can open it without a
/// collection-store lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub collection_path: PathBuf,
    pub collection_kind: CollectionKind,
    pub filename: String,
}

impl SourceDescriptor {
    pub fn for_entry(
        collection: &Collection,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            collection_path: collection.path.clone(),
            collection_kind: collection.kind,
            filename: filename.into(),
        }
    }
}

/// One cache regeneration unit of work.
///
/// `destination` is the precomputed artifact path; absent means the consumer
/// stores to its default location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRegenMessage {
    pub job_id: JobId,
    pub image_id: ImageId,
    pub collection_id: CollectionId,
    pub source: SourceDescriptor,
    pub destination: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub format: EncodeFormat,
    pub force_regenerate: bool,
    pub created_by_system: bool,
}

impl CacheRegenMessage {
    pub const TOPIC: &'static str = "media.cache.regen";
}

/// One thumbnail regeneration unit of work. Placement is the consumer's
/// concern, so no destination travels with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailRegenMessage {
    pub job_id: JobId,
    pub image_id: ImageId,
    pub collection_id: CollectionId,
    pub source: SourceDescriptor,
    pub width: u32,
    pub height: u32,
}

impl ThumbnailRegenMessage {
    pub const TOPIC: &'static str = "media.thumbnail.regen";
}

/// Outbound message union published by the recovery pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum WorkMessage {
    CacheRegen(CacheRegenMessage),
    ThumbnailRegen(ThumbnailRegenMessage),
}

impl WorkMessage {
    pub fn topic(&self) -> &'static str {
        match self {
            WorkMessage::CacheRegen(_) => CacheRegenMessage::TOPIC,
            WorkMessage::ThumbnailRegen(_) => ThumbnailRegenMessage::TOPIC,
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            WorkMessage::CacheRegen(msg) => &msg.job_id,
            WorkMessage::ThumbnailRegen(msg) => &msg.job_id,
        }
    }

    pub fn image_id(&self) -> &ImageId {
        match self {
            WorkMessage::CacheRegen(msg) => &msg.image_id,
            WorkMessage::ThumbnailRegen(msg) => &msg.image_id,
        }
    }
}
