//! Artifact storage backends
//!
//! Artifacts are addressed by `(iteration, candidate, kind)`. `FsStore` lays
//! them out on disk so users can inspect what each candidate produced and
//! later runs can reuse them; `MemoryStore` keeps everything in process.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from artifact storage
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to serialize {what}: {message}")]
    Serialize { what: String, message: String },
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The three per-candidate artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Style descriptor the candidate was formatted with
    Style,
    /// Formatter output
    Formatted,
    /// Unified diff between the sample and the formatter output
    Diff,
}

/// What an iteration's cached artifacts were computed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationSignature {
    /// Option key under evaluation
    pub key: String,
    /// Accumulated style before this option, as compact JSON
    pub base_style: String,
}

/// Key-value storage for per-iteration artifacts
///
/// Implementations must tolerate concurrent writes to distinct candidate slots.
pub trait ArtifactStore: Send + Sync {
    /// Signature recorded for an iteration, if any
    fn read_signature(&self, iteration: u32) -> Result<Option<IterationSignature>, CacheError>;

    /// Record the signature for an iteration
    fn write_signature(
        &self,
        iteration: u32,
        signature: &IterationSignature,
    ) -> Result<(), CacheError>;

    /// Discard everything stored for an iteration
    fn reset_iteration(&self, iteration: u32) -> Result<(), CacheError>;

    /// Make room for a candidate's artifacts; idempotent
    fn ensure_slot(&self, iteration: u32, candidate: &str) -> Result<(), CacheError>;

    fn read(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
    ) -> Result<Option<String>, CacheError>;

    fn write(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<(), CacheError>;

    /// Size in bytes of a stored artifact, `None` if absent
    fn size(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
    ) -> Result<Option<u64>, CacheError>;

    /// Where an artifact lives on disk, for stores that have one
    fn location(&self, _iteration: u32, _candidate: &str, _kind: ArtifactKind) -> Option<PathBuf> {
        None
    }

    /// Directory holding a candidate's artifacts, for stores that have one
    fn slot_dir(&self, _iteration: u32, _candidate: &str) -> Option<PathBuf> {
        None
    }
}

/// Disk layout under the work directory:
///
/// ```text
/// iter<N>/key
/// iter<N>/baseStyle
/// iter<N>/<candidate>/.clang-format
/// iter<N>/<candidate>/formatted.<ext>
/// iter<N>/<candidate>/formatted.diff
/// ```
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    formatted_name: String,
}

const KEY_FILE: &str = "key";
const BASE_STYLE_FILE: &str = "baseStyle";
const STYLE_FILE: &str = ".clang-format";
const DIFF_FILE: &str = "formatted.diff";
const TMP_SUFFIX: &str = ".tmp";

/// Names that would collide with the signature files (or their temp
/// siblings) sharing an iteration directory with the candidate slots
pub fn is_reserved_slot_name(name: &str) -> bool {
    let stem = name.strip_suffix(TMP_SUFFIX).unwrap_or(name);
    stem == KEY_FILE || stem == BASE_STYLE_FILE
}

impl FsStore {
    /// Store rooted at `root`; formatted output keeps the sample's extension
    pub fn new(root: impl Into<PathBuf>, extension: Option<&str>) -> Self {
        let formatted_name = match extension {
            Some(ext) => format!("formatted.{}", ext),
            None => "formatted".into(),
        };
        Self {
            root: root.into(),
            formatted_name,
        }
    }

    fn iteration_dir(&self, iteration: u32) -> PathBuf {
        self.root.join(format!("iter{}", iteration))
    }

    fn candidate_dir(&self, iteration: u32, candidate: &str) -> PathBuf {
        self.iteration_dir(iteration).join(candidate)
    }

    fn artifact_path(&self, iteration: u32, candidate: &str, kind: ArtifactKind) -> PathBuf {
        let name = match kind {
            ArtifactKind::Style => STYLE_FILE,
            ArtifactKind::Formatted => self.formatted_name.as_str(),
            ArtifactKind::Diff => DIFF_FILE,
        };
        self.candidate_dir(iteration, candidate).join(name)
    }

    fn read_optional(path: &Path) -> Result<Option<String>, CacheError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Write through a sibling temp file so readers never see a partial artifact
    fn write_atomic(path: &Path, content: &str) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, content).map_err(|e| CacheError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| CacheError::io(path, e))
    }
}

impl ArtifactStore for FsStore {
    fn read_signature(&self, iteration: u32) -> Result<Option<IterationSignature>, CacheError> {
        let dir = self.iteration_dir(iteration);
        let key = Self::read_optional(&dir.join(KEY_FILE))?;
        let base_style = Self::read_optional(&dir.join(BASE_STYLE_FILE))?;
        Ok(match (key, base_style) {
            (Some(key), Some(base_style)) => Some(IterationSignature { key, base_style }),
            _ => None,
        })
    }

    fn write_signature(
        &self,
        iteration: u32,
        signature: &IterationSignature,
    ) -> Result<(), CacheError> {
        let dir = self.iteration_dir(iteration);
        Self::write_atomic(&dir.join(KEY_FILE), &signature.key)?;
        Self::write_atomic(&dir.join(BASE_STYLE_FILE), &signature.base_style)
    }

    fn reset_iteration(&self, iteration: u32) -> Result<(), CacheError> {
        let dir = self.iteration_dir(iteration);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::io(&dir, e)),
        }
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))
    }

    fn ensure_slot(&self, iteration: u32, candidate: &str) -> Result<(), CacheError> {
        let dir = self.candidate_dir(iteration, candidate);
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))
    }

    fn read(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
    ) -> Result<Option<String>, CacheError> {
        Self::read_optional(&self.artifact_path(iteration, candidate, kind))
    }

    fn write(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<(), CacheError> {
        Self::write_atomic(&self.artifact_path(iteration, candidate, kind), content)
    }

    fn size(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
    ) -> Result<Option<u64>, CacheError> {
        let path = self.artifact_path(iteration, candidate, kind);
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    fn location(&self, iteration: u32, candidate: &str, kind: ArtifactKind) -> Option<PathBuf> {
        Some(self.artifact_path(iteration, candidate, kind))
    }

    fn slot_dir(&self, iteration: u32, candidate: &str) -> Option<PathBuf> {
        Some(self.candidate_dir(iteration, candidate))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    signatures: HashMap<u32, IterationSignature>,
    slots: HashSet<(u32, String)>,
    artifacts: HashMap<(u32, String, ArtifactKind), String>,
}

/// In-process store; nothing survives the run
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

impl ArtifactStore for MemoryStore {
    fn read_signature(&self, iteration: u32) -> Result<Option<IterationSignature>, CacheError> {
        Ok(self.with_state(|s| s.signatures.get(&iteration).cloned()))
    }

    fn write_signature(
        &self,
        iteration: u32,
        signature: &IterationSignature,
    ) -> Result<(), CacheError> {
        self.with_state(|s| s.signatures.insert(iteration, signature.clone()));
        Ok(())
    }

    fn reset_iteration(&self, iteration: u32) -> Result<(), CacheError> {
        self.with_state(|s| {
            s.signatures.remove(&iteration);
            s.slots.retain(|(i, _)| *i != iteration);
            s.artifacts.retain(|(i, _, _), _| *i != iteration);
        });
        Ok(())
    }

    fn ensure_slot(&self, iteration: u32, candidate: &str) -> Result<(), CacheError> {
        self.with_state(|s| s.slots.insert((iteration, candidate.to_string())));
        Ok(())
    }

    fn read(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
    ) -> Result<Option<String>, CacheError> {
        Ok(self.with_state(|s| {
            s.artifacts
                .get(&(iteration, candidate.to_string(), kind))
                .cloned()
        }))
    }

    fn write(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<(), CacheError> {
        self.with_state(|s| {
            s.slots.insert((iteration, candidate.to_string()));
            s.artifacts
                .insert((iteration, candidate.to_string(), kind), content.to_string());
        });
        Ok(())
    }

    fn size(
        &self,
        iteration: u32,
        candidate: &str,
        kind: ArtifactKind,
    ) -> Result<Option<u64>, CacheError> {
        Ok(self.with_state(|s| {
            s.artifacts
                .get(&(iteration, candidate.to_string(), kind))
                .map(|content| content.len() as u64)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn signature(key: &str) -> IterationSignature {
        IterationSignature {
            key: key.into(),
            base_style: "{}".into(),
        }
    }

    fn exercise(store: &dyn ArtifactStore) {
        assert_eq!(store.read_signature(1).unwrap(), None);

        store.write_signature(1, &signature("UseTab")).unwrap();
        store.ensure_slot(1, "Never").unwrap();
        store.ensure_slot(1, "Never").unwrap();
        store
            .write(1, "Never", ArtifactKind::Formatted, "int a;\n")
            .unwrap();
        store.write(1, "Never", ArtifactKind::Diff, "").unwrap();

        assert_eq!(store.read_signature(1).unwrap(), Some(signature("UseTab")));
        assert_eq!(
            store.read(1, "Never", ArtifactKind::Formatted).unwrap().as_deref(),
            Some("int a;\n")
        );
        assert_eq!(store.size(1, "Never", ArtifactKind::Diff).unwrap(), Some(0));
        assert_eq!(store.size(1, "Never", ArtifactKind::Style).unwrap(), None);
        assert_eq!(store.size(1, "Always", ArtifactKind::Formatted).unwrap(), None);

        // Other iterations are untouched by a reset
        store.write_signature(2, &signature("IndentWidth")).unwrap();
        store.reset_iteration(1).unwrap();
        assert_eq!(store.read_signature(1).unwrap(), None);
        assert_eq!(store.read(1, "Never", ArtifactKind::Formatted).unwrap(), None);
        assert_eq!(
            store.read_signature(2).unwrap(),
            Some(signature("IndentWidth"))
        );
    }

    #[test]
    fn test_fs_store_contract() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path(), Some("cpp"));
        exercise(&store);
    }

    #[test]
    fn test_memory_store_contract() {
        let store = MemoryStore::new();
        exercise(&store);
    }

    #[test]
    fn test_fs_layout() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path(), Some("cpp"));

        store.write_signature(3, &signature("UseTab")).unwrap();
        store.write(3, "Always", ArtifactKind::Style, "UseTab: Always\n").unwrap();
        store.write(3, "Always", ArtifactKind::Formatted, "x").unwrap();
        store.write(3, "Always", ArtifactKind::Diff, "y").unwrap();

        let iter = dir.path().join("iter3");
        assert_eq!(std::fs::read_to_string(iter.join("key")).unwrap(), "UseTab");
        assert_eq!(std::fs::read_to_string(iter.join("baseStyle")).unwrap(), "{}");
        assert!(iter.join("Always/.clang-format").exists());
        assert!(iter.join("Always/formatted.cpp").exists());
        assert!(iter.join("Always/formatted.diff").exists());
        assert!(!iter.join("Always/formatted.diff.tmp").exists());

        assert_eq!(
            store.location(3, "Always", ArtifactKind::Diff),
            Some(iter.join("Always/formatted.diff"))
        );
        assert_eq!(store.slot_dir(3, "Always"), Some(iter.join("Always")));
    }

    #[test]
    fn test_fs_store_without_extension() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path(), None);
        assert!(
            store
                .location(1, "Never", ArtifactKind::Formatted)
                .unwrap()
                .ends_with("Never/formatted")
        );
    }
}
