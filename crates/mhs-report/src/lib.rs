//! Artifact persistence for the survey pipeline.
//!
//! Every analysis engine computes a pure result value; this crate turns
//! those values into on-disk artifacts. The split keeps the engines
//! testable without a filesystem and makes persistence swappable:
//!
//! - [`FsStore`] writes CSV tables and text reports under
//!   `<root>/tables/`
//! - [`MemStore`] records artifacts in memory for tests
//!
//! Artifacts are write-once: a store call replaces the file wholesale,
//! never appends or mutates.

pub mod error;
pub mod store;
pub mod table;

pub use error::{Result, StoreError};
pub use store::{ArtifactStore, FsStore, MemStore};
pub use table::{RunMetadata, Table};
