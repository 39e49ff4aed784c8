//! Unified diff via an external `diff` program

use super::{DiffOracle, OracleError};
use crate::config::DiffConfig;
use crate::process::run_with_input;
use async_trait::async_trait;
use tokio::process::Command;

const ORIGINAL_LABEL: &str = "original";
const FORMATTED_LABEL: &str = "formatted";

/// Diff oracle backed by `diff -u`.
///
/// Both texts are written to a private scratch directory because the program
/// compares files, not buffers.
#[derive(Debug, Clone)]
pub struct DiffProgram {
    command: String,
}

impl DiffProgram {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn from_config(config: &DiffConfig) -> Self {
        Self::new(config.command.clone())
    }
}

#[async_trait]
impl DiffOracle for DiffProgram {
    async fn diff(&self, original: &str, formatted: &str) -> Result<String, OracleError> {
        let scratch = tempfile::tempdir().map_err(|source| OracleError::Scratch { source })?;
        let original_path = scratch.path().join(ORIGINAL_LABEL);
        let formatted_path = scratch.path().join(FORMATTED_LABEL);
        tokio::fs::write(&original_path, original)
            .await
            .map_err(|source| OracleError::Scratch { source })?;
        tokio::fs::write(&formatted_path, formatted)
            .await
            .map_err(|source| OracleError::Scratch { source })?;

        let mut cmd = Command::new(&self.command);
        cmd.arg("-u")
            .args(["--label", ORIGINAL_LABEL, "--label", FORMATTED_LABEL])
            .arg(&original_path)
            .arg(&formatted_path);

        let output = run_with_input(&mut cmd, None).await?;

        // 0: identical, 1: differences found, anything else: trouble
        match output.exit_code() {
            Some(0) | Some(1) => Ok(output.stdout),
            exit_code => Err(OracleError::Failed {
                program: self.command.clone(),
                exit_code,
                stderr: output.stderr.trim().to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        &self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_identical_texts() {
        let differ = DiffProgram::new("diff");
        let output = differ.diff("int a;\n", "int a;\n").await.unwrap();
        assert_eq!(output, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_changed_line() {
        let differ = DiffProgram::new("diff");
        let output = differ
            .diff("int a;\nint  b;\nint c;\n", "int a;\nint b;\nint c;\n")
            .await
            .unwrap();

        let lines: Vec<_> = output.lines().collect();
        assert!(lines[0].starts_with("--- original"));
        assert!(lines[1].starts_with("+++ formatted"));
        assert!(lines.contains(&"-int  b;"));
        assert!(lines.contains(&"+int b;"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let differ = DiffProgram::new("definitely_not_a_real_diff_12345");
        let result = differ.diff("a\n", "b\n").await;
        assert!(matches!(result, Err(OracleError::Process(_))));
    }

    #[test]
    fn test_from_config() {
        let differ = DiffProgram::from_config(&DiffConfig {
            command: "gdiff".into(),
        });
        assert_eq!(differ.name(), "gdiff");
    }
}
