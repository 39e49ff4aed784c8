//! External programs the search treats as black boxes
//!
//! The formatter turns (source, style) into formatted text; the diff program
//! turns (original, formatted) into unified diff text. Both run as child
//! processes in production and are replaced by fakes in tests.
//!
//! # Example
//!
//! ```ignore
//! use stylefit::oracle::{ClangFormat, FormatRequest, FormatterOracle};
//!
//! let formatter = ClangFormat::new("clang-format");
//! let request = FormatRequest::new(source, style, "input.cpp");
//! let formatted = formatter.format(&request).await?;
//! ```

mod clang_format;
mod diff;

pub use clang_format::ClangFormat;
pub use diff::DiffProgram;

use crate::process::ProcessError;
use crate::style::Style;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;

/// Errors from an external program
#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("'{program}' failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' produced no output")]
    EmptyOutput { program: String },

    #[error("invalid style: {message}")]
    Style { message: String },

    #[error("scratch file error: {source}")]
    Scratch { source: std::io::Error },
}

/// Input for one formatter invocation
#[derive(Debug, Clone)]
pub struct FormatRequest {
    /// Source text, shared between concurrent requests
    pub source: Arc<str>,

    /// Complete style to format with
    pub style: Style,

    /// File name whose extension tells the formatter the language
    pub filename_hint: String,
}

impl FormatRequest {
    pub fn new(source: Arc<str>, style: Style, filename_hint: impl Into<String>) -> Self {
        Self {
            source,
            style,
            filename_hint: filename_hint.into(),
        }
    }
}

/// Applies a style to source text
#[async_trait]
pub trait FormatterOracle: Send + Sync {
    /// Format the request's source; empty output is an error
    async fn format(&self, request: &FormatRequest) -> Result<String, OracleError>;

    /// Program name for diagnostics
    fn name(&self) -> &str;

    /// Check whether the program can be found
    async fn is_available(&self) -> bool {
        command_exists(self.name()).await
    }
}

/// Computes a unified diff between two texts
#[async_trait]
pub trait DiffOracle: Send + Sync {
    async fn diff(&self, original: &str, formatted: &str) -> Result<String, OracleError>;

    fn name(&self) -> &str;

    async fn is_available(&self) -> bool {
        command_exists(self.name()).await
    }
}

/// Check that a command resolves on PATH (or exists, if given as a path)
pub async fn command_exists(command: &str) -> bool {
    tokio::process::Command::new("which")
        .arg(command)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
