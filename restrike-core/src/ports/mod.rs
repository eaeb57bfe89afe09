//! Ports consumed by the recovery orchestrator.
//!
//! Each port is an async trait describing one external dependency,
//! paired with an in-memory adapter. The adapters are the reference
//! implementations for embedded use and tests; production embedders
//! supply their own backed by a database, folder registry, or queue.

pub mod collections;
pub mod folders;
pub mod job_store;
pub mod publisher;
pub mod settings;

pub use collections::{CollectionRepository, InMemoryCollectionRepository};
pub use folders::{InMemoryFolderRegistry, StorageFolderRegistry};
pub use job_store::{InMemoryJobStateStore, JobStateStore};
pub use publisher::{RecordingPublisher, WorkPublisher};
pub use settings::{FixedSettingsProvider, SettingsProvider};
