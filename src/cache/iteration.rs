//! Per-option iteration cache
//!
//! Each option the search evaluates is one iteration. Artifacts are reused
//! across runs as long as the iteration's signature (option key plus the
//! style accumulated before it) and the source sample are unchanged.

use super::store::{ArtifactKind, ArtifactStore, CacheError, IterationSignature};
use crate::sample::SourceSample;
use crate::style::Style;
use std::path::PathBuf;
use std::sync::Arc;

/// Memoizes style/formatted/diff artifacts per iteration and candidate
pub struct IterationCache {
    store: Arc<dyn ArtifactStore>,
    iteration: u32,
    /// Once an iteration is stale every later one is too, since later
    /// iterations are computed from earlier decisions.
    stale: bool,
}

impl IterationCache {
    /// Cache over `store`; everything is stale if the sample changed
    pub fn new(store: Arc<dyn ArtifactStore>, sample: &SourceSample) -> Self {
        Self {
            store,
            iteration: 0,
            stale: sample.dirty,
        }
    }

    /// Current iteration number; 0 before the first `start_iteration`
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Begin the next iteration.
    ///
    /// Returns `true` if previously cached content for this iteration was
    /// discarded.
    pub fn start_iteration(
        &mut self,
        key: &str,
        base_style: &Style,
        candidates: &[&str],
    ) -> Result<bool, CacheError> {
        self.iteration += 1;

        let signature = IterationSignature {
            key: key.to_string(),
            base_style: base_style.to_json().map_err(|e| CacheError::Serialize {
                what: "base style".into(),
                message: e.to_string(),
            })?,
        };

        if !self.stale {
            let recorded = self.store.read_signature(self.iteration)?;
            if recorded.as_ref() != Some(&signature) {
                tracing::debug!(
                    iteration = self.iteration,
                    key,
                    recorded = recorded.is_some(),
                    "iteration signature changed"
                );
                self.stale = true;
            }
        }

        if self.stale {
            self.store.reset_iteration(self.iteration)?;
        }

        self.store.write_signature(self.iteration, &signature)?;
        for name in candidates {
            self.store.ensure_slot(self.iteration, name)?;
        }

        Ok(self.stale)
    }

    /// Handle for one candidate's artifacts in the current iteration
    pub fn slot(&self, candidate: &str) -> CandidateSlot {
        CandidateSlot {
            store: Arc::clone(&self.store),
            iteration: self.iteration,
            name: candidate.to_string(),
        }
    }

    pub fn has_formatted(&self, candidate: &str) -> Result<bool, CacheError> {
        self.slot(candidate).has_formatted()
    }

    pub fn has_diff(&self, candidate: &str) -> Result<bool, CacheError> {
        self.slot(candidate).has_diff()
    }

    pub fn write_style(&self, candidate: &str, style: &Style) -> Result<(), CacheError> {
        self.slot(candidate).write_style(style)
    }

    pub fn style_path(&self, candidate: &str) -> Option<PathBuf> {
        self.store
            .location(self.iteration, candidate, ArtifactKind::Style)
    }

    pub fn formatted_path(&self, candidate: &str) -> Option<PathBuf> {
        self.store
            .location(self.iteration, candidate, ArtifactKind::Formatted)
    }

    pub fn diff_path(&self, candidate: &str) -> Option<PathBuf> {
        self.store
            .location(self.iteration, candidate, ArtifactKind::Diff)
    }

    pub fn candidate_dir(&self, candidate: &str) -> Option<PathBuf> {
        self.store.slot_dir(self.iteration, candidate)
    }
}

/// One candidate's artifacts within one iteration.
///
/// Cheap to clone and `Send`, so concurrent oracle tasks each own one and
/// write only to their own slot.
#[derive(Clone)]
pub struct CandidateSlot {
    store: Arc<dyn ArtifactStore>,
    iteration: u32,
    name: String,
}

impl CandidateSlot {
    /// Formatted output exists and is non-empty
    pub fn has_formatted(&self) -> Result<bool, CacheError> {
        Ok(self
            .store
            .size(self.iteration, &self.name, ArtifactKind::Formatted)?
            .is_some_and(|size| size > 0))
    }

    /// Diff exists; an empty diff is a valid result for an unchanged sample
    pub fn has_diff(&self) -> Result<bool, CacheError> {
        Ok(self
            .store
            .size(self.iteration, &self.name, ArtifactKind::Diff)?
            .is_some())
    }

    /// Persist the style descriptor; the first write wins
    pub fn write_style(&self, style: &Style) -> Result<(), CacheError> {
        if self
            .store
            .size(self.iteration, &self.name, ArtifactKind::Style)?
            .is_some()
        {
            return Ok(());
        }
        let yaml = style.to_yaml().map_err(|e| CacheError::Serialize {
            what: format!("style for '{}'", self.name),
            message: e.to_string(),
        })?;
        self.store
            .write(self.iteration, &self.name, ArtifactKind::Style, &yaml)
    }

    pub fn read_style(&self) -> Result<Option<String>, CacheError> {
        self.store.read(self.iteration, &self.name, ArtifactKind::Style)
    }

    pub fn write_formatted(&self, content: &str) -> Result<(), CacheError> {
        self.store
            .write(self.iteration, &self.name, ArtifactKind::Formatted, content)
    }

    pub fn read_formatted(&self) -> Result<Option<String>, CacheError> {
        self.store
            .read(self.iteration, &self.name, ArtifactKind::Formatted)
    }

    pub fn write_diff(&self, content: &str) -> Result<(), CacheError> {
        self.store
            .write(self.iteration, &self.name, ArtifactKind::Diff, content)
    }

    pub fn read_diff(&self) -> Result<Option<String>, CacheError> {
        self.store.read(self.iteration, &self.name, ArtifactKind::Diff)
    }
}
