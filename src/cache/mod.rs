//! Artifact cache for the style search
//!
//! This module handles:
//! - Storage of per-candidate style, formatted and diff artifacts
//! - Iteration signatures and invalidation when they change
//! - Reuse of artifacts across runs

mod iteration;
mod store;

pub use iteration::IterationCache;
pub use store::{ArtifactStore, CacheError, FsStore, MemoryStore, is_reserved_slot_name};
