//! # Restrike Core
//!
//! Resumable job recovery for the Restrike media pipeline. When a
//! regeneration run is interrupted, whether by a crash, a deploy, or an
//! operator, the persisted per-image progress of each job is enough to
//! continue it from where it stopped instead of redoing finished work.
//!
//! ## Overview
//!
//! - **Recovery orchestration**: [`recovery::RecoveryService`] decides
//!   per job whether resumption is possible, claims the job with a
//!   compare-and-swap status transition, and tallies batch passes.
//! - **Resume strategies**: [`strategy::ResumeStrategies`] turn the
//!   unprocessed remainder of a job into cache or thumbnail work
//!   messages, skip-accounting images the collection no longer has.
//! - **Storage selection**: [`selector::StorageSelector`] computes
//!   deterministic artifact destinations with highest-random-weight
//!   hashing over the active storage folders.
//! - **Maintenance**: [`sweeper::RecoverySweeper`] periodically reruns
//!   the recovery passes and applies completed-job retention.
//!
//! ## Architecture
//!
//! The crate owns no storage and no queue. Everything external sits
//! behind the async ports in [`ports`], each shipped with an in-memory
//! adapter that doubles as the reference implementation and the test
//! harness. Embedders wire the service to their database, folder
//! registry, and message queue by implementing those traits.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Tunable knobs, file loading, and environment overrides
pub mod config;
/// Error types shared across the recovery surface
pub mod error;
/// Ports consumed by the orchestrator, with in-memory adapters
pub mod ports;
/// Recovery orchestration entry points
pub mod recovery;
/// Deterministic storage-folder selection
pub mod selector;
/// Per-kind resume planning
pub mod strategy;
/// Periodic maintenance loop
pub mod sweeper;

pub use config::{ConfigError, RecoveryConfig};
pub use error::{RecoveryError, Result};
pub use recovery::{RecoveryService, RecoverySummary};
pub use selector::{ArtifactKind, StorageSelector};
pub use sweeper::RecoverySweeper;
