//! Process utilities for running the external formatter and diff programs.

use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

fn exit_status_code_parts(code: Option<i32>, _signal: Option<i32>) -> Option<i32> {
    if let Some(code) = code {
        return Some(code);
    }
    #[cfg(unix)]
    {
        if let Some(signal) = _signal {
            return Some(128 + signal);
        }
    }
    None
}

/// Extract exit code from ExitStatus, using 128+signal for signal-terminated processes on Unix.
pub(crate) fn exit_status_code(status: &ExitStatus) -> Option<i32> {
    let code = status.code();
    #[cfg(unix)]
    let signal = status.signal();
    #[cfg(not(unix))]
    let signal = None;
    exit_status_code_parts(code, signal)
}

/// Stream types for child processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdin,
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputStream::Stdin => "stdin",
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        };
        f.write_str(name)
    }
}

/// Errors occurring while running a child process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to use {stream} of '{program}': {source}")]
    Stream {
        program: String,
        stream: OutputStream,
        source: std::io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

/// Captured result of a finished child process.
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl ProcessOutput {
    pub fn exit_code(&self) -> Option<i32> {
        exit_status_code(&self.status)
    }
}

/// Spawn `cmd`, feed it `input` on stdin and collect stdout/stderr.
///
/// Writing and both reads run concurrently so a child that fills its output
/// pipe before draining stdin cannot deadlock us. A child that exits without
/// reading all of its input is not an error here; its exit status decides.
pub(crate) async fn run_with_input(
    cmd: &mut Command,
    input: Option<&[u8]>,
) -> Result<ProcessOutput, ProcessError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();

    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    let stdin_pipe = child.stdin.take();
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let stdin_fut = async move {
        if let (Some(mut pipe), Some(bytes)) = (stdin_pipe, input) {
            let written = match pipe.write_all(bytes).await {
                Ok(()) => pipe.shutdown().await,
                Err(e) => Err(e),
            };
            match written {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err((OutputStream::Stdin, e));
                }
                _ => {}
            }
        }
        Ok(())
    };

    let stdout_fut = read_stream(stdout_pipe, OutputStream::Stdout);
    let stderr_fut = read_stream(stderr_pipe, OutputStream::Stderr);

    let (stdout, stderr) = match tokio::try_join!(stdin_fut, stdout_fut, stderr_fut) {
        Ok(((), stdout, stderr)) => (stdout, stderr),
        Err((stream, source)) => {
            reap(&mut child).await;
            return Err(ProcessError::Stream {
                program,
                stream,
                source,
            });
        }
    };

    let status = child
        .wait()
        .await
        .map_err(|source| ProcessError::Wait {
            program: program.clone(),
            source,
        })?;

    Ok(ProcessOutput {
        stdout,
        stderr,
        status,
    })
}

async fn read_stream<R>(
    pipe: Option<R>,
    stream: OutputStream,
) -> Result<String, (OutputStream, std::io::Error)>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_string(&mut buf)
            .await
            .map_err(|e| (stream, e))?;
    }
    Ok(buf)
}

/// Kill and reap a child to prevent a zombie process
async fn reap(child: &mut Child) {
    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_passthrough() {
        assert_eq!(exit_status_code_parts(Some(0), None), Some(0));
        assert_eq!(exit_status_code_parts(Some(1), None), Some(1));
        assert_eq!(exit_status_code_parts(Some(2), None), Some(2));
    }

    #[cfg(unix)]
    #[test]
    fn signal_exit_code() {
        // SIGKILL (9) -> 128 + 9 = 137
        assert_eq!(exit_status_code_parts(None, Some(9)), Some(137));
        // SIGSEGV (11) -> 128 + 11 = 139
        assert_eq!(exit_status_code_parts(None, Some(11)), Some(139));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_input_is_echoed() {
        let mut cmd = Command::new("cat");
        let output = run_with_input(&mut cmd, Some(b"int main() {}\n".as_slice()))
            .await
            .unwrap();
        assert_eq!(output.stdout, "int main() {}\n");
        assert_eq!(output.stderr, "");
        assert!(output.status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_both_streams_without_input() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("printf 'stdout'; printf 'stderr' >&2");
        let output = run_with_input(&mut cmd, None).await.unwrap();
        assert_eq!(output.stdout, "stdout");
        assert_eq!(output.stderr, "stderr");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_ignoring_input() {
        let input = vec![b'x'; 1 << 20];
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 3");
        let output = run_with_input(&mut cmd, Some(input.as_slice())).await.unwrap();
        assert_eq!(output.exit_code(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_utf8_output() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("printf '\\377'");
        let result = run_with_input(&mut cmd, None).await;
        assert!(matches!(
            result,
            Err(ProcessError::Stream {
                stream: OutputStream::Stdout,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut cmd = Command::new("definitely_not_a_real_command_12345");
        let result = run_with_input(&mut cmd, None).await;
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }
}
