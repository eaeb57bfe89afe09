//! Core data model definitions shared across Restrike crates.
#![allow(missing_docs)]

pub mod collection;
pub mod folder;
pub mod ids;
pub mod job;
pub mod message;
pub mod settings;

// Intentionally curated re-exports for downstream consumers.
pub use collection::{Collection, CollectionKind, ImageEntry};
pub use folder::StorageFolder;
pub use ids::{CollectionId, FolderId, ImageId, JobId};
pub use job::{JobKind, JobStatus, RecoveryJob};
pub use message::{
    CacheRegenMessage, SourceDescriptor, ThumbnailRegenMessage, WorkMessage,
};
pub use settings::{EncodeFormat, EncodeSettings};
