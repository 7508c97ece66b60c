//! Subprocess collaborators that rewrite source over stdin/stdout
//!
//! The tool contract matches the common Python formatter interface
//! (`black -`, `isort -`): source goes in on stdin, the transformed
//! source comes back on stdout, and a non-zero exit means the input was
//! rejected. Processes are killed when they outlive the configured
//! deadline.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use super::{CollabError, CollabResult};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// One configured external tool: an argv plus a wall-clock deadline
pub struct ExternalTool {
    argv: Vec<String>,
    timeout: Duration,
}

impl ExternalTool {
    /// Returns `None` when the argv is empty, which disables the tool
    pub fn from_argv(argv: &[String], timeout_secs: u64) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        Some(Self {
            argv: argv.to_vec(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn command_name(&self) -> &str {
        &self.argv[0]
    }

    /// Pipe `input` through the tool and return its stdout
    pub fn run(&self, input: &str) -> CollabResult<String> {
        let command = self.argv.join(" ");
        debug!(%command, "running external tool");

        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CollabError::Io {
                command: command.clone(),
                source,
            })?;

        // drain both pipes from threads so a chatty child cannot deadlock
        // against a full pipe buffer while stdin is still being written
        let stdout_handle = child.stdout.take().map(spawn_reader);
        let stderr_handle = child.stderr.take().map(spawn_reader);

        // write stdin then drop the handle so the child sees EOF
        if let Some(mut stdin) = child.stdin.take() {
            // a tool that exits without draining stdin closes the pipe;
            // treat the resulting broken pipe as that tool's verdict
            let _ = stdin.write_all(input.as_bytes());
        }

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CollabError::Timeout {
                            command,
                            seconds: self.timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(source) => return Err(CollabError::Io { command, source }),
            }
        };

        let stdout = join_reader(stdout_handle);
        let stderr = join_reader(stderr_handle);

        if !status.success() {
            return Err(CollabError::CommandFailed {
                command,
                status: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<std::thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
