//! Error types for option-list loading

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the option list that drives the search
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read option list {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse option list {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("option list entry {index} is malformed: {message}")]
    MalformedEntry { index: usize, message: String },

    #[error("option '{option}' has no candidates")]
    NoCandidates { option: String },

    #[error("option '{option}' has an invalid candidate: {message}")]
    InvalidCandidate { option: String, message: String },

    #[error("option '{option}' lists candidate '{name}' more than once")]
    DuplicateCandidate { option: String, name: String },
}
