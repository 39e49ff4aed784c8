//! Canonical source sample
//!
//! All input files are concatenated into `<work_dir>/input.<ext>`, which is the
//! text every candidate style is applied to. The sample remembers whether this
//! content differs from what a previous run left behind, so the artifact cache
//! knows when everything it holds is stale.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Separator appended after each input file
const SEPARATOR: &str = "\n";

/// Errors while building the source sample
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("no input files given")]
    NoInputs,

    #[error("failed to read input {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write sample {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The concatenated input every candidate is formatted against
#[derive(Debug, Clone)]
pub struct SourceSample {
    /// Extension of the first input file, without the dot
    pub extension: Option<String>,

    /// Absolute path of the canonical copy
    pub path: PathBuf,

    /// Full sample text
    pub content: Arc<str>,

    /// Lines in the sample, separators included
    pub line_count: usize,

    /// True if the content differs from the copy a previous run persisted
    pub dirty: bool,
}

impl SourceSample {
    /// Concatenate `inputs` into the canonical copy under `work_dir`
    pub fn assemble(work_dir: &Path, inputs: &[PathBuf]) -> Result<Self, SampleError> {
        let first = inputs.first().ok_or(SampleError::NoInputs)?;
        let extension = first
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());

        fs::create_dir_all(work_dir).map_err(|source| SampleError::Write {
            path: work_dir.to_path_buf(),
            source,
        })?;
        let work_dir = fs::canonicalize(work_dir).map_err(|source| SampleError::Write {
            path: work_dir.to_path_buf(),
            source,
        })?;
        let path = work_dir.join(sample_file_name(extension.as_deref()));

        let mut content = String::new();
        let mut line_count = 0;
        for input in inputs {
            let text = fs::read_to_string(input).map_err(|source| SampleError::Read {
                path: input.clone(),
                source,
            })?;
            line_count += text.lines().count() + SEPARATOR.lines().count();
            content.push_str(&text);
            content.push_str(SEPARATOR);
        }

        let previous = fs::read_to_string(&path).ok();
        let dirty = previous.as_deref() != Some(content.as_str());

        fs::write(&path, &content).map_err(|source| SampleError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            files = inputs.len(),
            lines = line_count,
            dirty,
            "assembled source sample"
        );

        Ok(Self {
            extension,
            path,
            content: Arc::from(content),
            line_count,
            dirty,
        })
    }

    /// File name handed to the formatter so it picks the right language
    pub fn file_name(&self) -> String {
        sample_file_name(self.extension.as_deref())
    }
}

fn sample_file_name(extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("input.{}", ext),
        None => "input".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_input_list() {
        let dir = TempDir::new().unwrap();
        let result = SourceSample::assemble(&dir.path().join("work"), &[]);
        assert!(matches!(result, Err(SampleError::NoInputs)));
    }

    #[test]
    fn test_concatenates_with_separators() {
        let dir = TempDir::new().unwrap();
        let a = write_input(&dir, "a.cpp", "int a;\nint b;\n");
        let b = write_input(&dir, "b.h", "int c;\n");
        let work = dir.path().join("work");

        let sample = SourceSample::assemble(&work, &[a, b]).unwrap();

        assert_eq!(&*sample.content, "int a;\nint b;\n\nint c;\n\n");
        assert_eq!(sample.line_count, 5);
        assert_eq!(sample.extension.as_deref(), Some("cpp"));
        assert_eq!(sample.file_name(), "input.cpp");
        assert!(sample.path.is_absolute());
        assert!(sample.path.ends_with("input.cpp"));
        assert_eq!(fs::read_to_string(&sample.path).unwrap(), &*sample.content);
    }

    #[test]
    fn test_unterminated_file_counts_separator_line() {
        let dir = TempDir::new().unwrap();
        let a = write_input(&dir, "a.c", "int a;");

        let sample = SourceSample::assemble(&dir.path().join("work"), &[a]).unwrap();
        assert_eq!(&*sample.content, "int a;\n");
        assert_eq!(sample.line_count, 2);
    }

    #[test]
    fn test_no_extension() {
        let dir = TempDir::new().unwrap();
        let a = write_input(&dir, "Makefile", "all:\n");

        let sample = SourceSample::assemble(&dir.path().join("work"), &[a]).unwrap();
        assert_eq!(sample.extension, None);
        assert_eq!(sample.file_name(), "input");
    }

    #[test]
    fn test_dirty_tracking() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        let a = write_input(&dir, "a.cpp", "int a;\n");

        let first = SourceSample::assemble(&work, &[a.clone()]).unwrap();
        assert!(first.dirty, "no previous copy means dirty");

        let second = SourceSample::assemble(&work, &[a.clone()]).unwrap();
        assert!(!second.dirty);

        write_input(&dir, "a.cpp", "int a = 1;\n");
        let third = SourceSample::assemble(&work, &[a]).unwrap();
        assert!(third.dirty);
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let result =
            SourceSample::assemble(&dir.path().join("work"), &[dir.path().join("nope.cpp")]);
        assert!(matches!(result, Err(SampleError::Read { .. })));
    }
}
