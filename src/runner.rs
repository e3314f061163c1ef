use crate::constants::GIT_TIMEOUT_SECS;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// outcome of a single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub succeeded: bool,
    /// stdout (trailing whitespace removed) on success, diagnostic text on failure
    pub output: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: output.into(),
        }
    }
}

/// runs a version-control command in a working directory
///
/// implementations never panic or return errors: every failure mode is folded
/// into a failed `CommandResult` carrying a diagnostic
pub trait CommandRunner {
    fn run(&self, args: &[&str], cwd: &Path) -> CommandResult;
}

/// runs the `git` binary with a hard timeout
pub struct GitRunner {
    program: String,
    timeout: Duration,
}

impl GitRunner {
    pub fn new() -> Self {
        Self::with_program("git", Duration::from_secs(GIT_TIMEOUT_SECS))
    }

    pub fn with_program(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for GitRunner {
    fn run(&self, args: &[&str], cwd: &Path) -> CommandResult {
        crate::debug!("{} {} (in {})", self.program, args.join(" "), cwd.display());

        if !cwd.is_dir() {
            return CommandResult::failure(format!(
                "working directory not found: {}",
                cwd.display()
            ));
        }

        let spawned = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return CommandResult::failure(format!(
                    "{0} command not found. is {0} installed?",
                    self.program
                ));
            }
            Err(e) => return CommandResult::failure(format!("unexpected error: {e}")),
        };

        // drain both pipes off-thread so a large diff can't block the child
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => {
                let stdout = collect(stdout);
                let stderr = collect(stderr);
                if status.success() {
                    // leading whitespace is significant in porcelain output
                    CommandResult::success(stdout.trim_end())
                } else if stderr.trim().is_empty() {
                    CommandResult::failure(format!(
                        "{} {} exited with {}",
                        self.program,
                        args.first().copied().unwrap_or_default(),
                        status
                    ))
                } else {
                    CommandResult::failure(stderr.trim())
                }
            }
            Ok(None) => {
                if let Err(e) = child.kill() {
                    crate::warning!("failed to kill {}: {}", self.program, e);
                }
                let _ = child.wait();
                // reader threads are left to finish on their own: a grandchild
                // (ssh, credential helper) may still hold the pipes open
                CommandResult::failure(format!(
                    "command timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                CommandResult::failure(format!("failed to wait for {}: {e}", self.program))
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
