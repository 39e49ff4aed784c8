//! clang-format invocation

use super::{FormatRequest, FormatterOracle, OracleError};
use crate::config::FormatterConfig;
use crate::process::run_with_input;
use async_trait::async_trait;
use tokio::process::Command;

/// Formatter backed by a clang-format executable.
///
/// The source goes in on stdin and the style is passed inline, so a run
/// needs no `.clang-format` lookup relative to the working directory.
#[derive(Debug, Clone)]
pub struct ClangFormat {
    command: String,
    args: Vec<String>,
}

impl ClangFormat {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn from_config(config: &FormatterConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    /// Add leading arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn build_command(&self, request: &FormatRequest) -> Result<Command, OracleError> {
        let style = request.style.to_json().map_err(|e| OracleError::Style {
            message: e.to_string(),
        })?;

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg(format!("--assume-filename={}", request.filename_hint))
            .arg(format!("--style={}", style));
        Ok(cmd)
    }
}

#[async_trait]
impl FormatterOracle for ClangFormat {
    async fn format(&self, request: &FormatRequest) -> Result<String, OracleError> {
        let mut cmd = self.build_command(request)?;
        let output = run_with_input(&mut cmd, Some(request.source.as_bytes())).await?;

        if !output.status.success() {
            return Err(OracleError::Failed {
                program: self.command.clone(),
                exit_code: output.exit_code(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(OracleError::EmptyOutput {
                program: self.command.clone(),
            });
        }

        Ok(output.stdout)
    }

    fn name(&self) -> &str {
        &self.command
    }
}
