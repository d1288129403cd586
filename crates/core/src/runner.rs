//! Subprocess abstraction for talking to the external tool.
//!
//! Provides a trait-based runner so that the real `ratslap` binary and
//! canned test output share the same interface.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::Result;

/// How often a timed child is polled for exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl ToolOutput {
    /// Successful run that printed `stdout` and nothing on stderr.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    /// Failed run that printed `stderr`.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

/// Abstraction over running a program and capturing its output.
pub trait CommandRunner {
    /// Run `program` with `args` to completion.
    fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput>;

    /// Run with a deadline. `Ok(None)` means the program was killed for taking too long.
    fn run_with_timeout(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<Option<ToolOutput>>;
}

/// Runs real processes with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput> {
        debug!(program = %program.display(), ?args, "Running tool");
        let output = Command::new(program).args(args).output()?;
        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        };
        trace!(stdout = %result.stdout, stderr = %result.stderr, "Tool output");
        Ok(result)
    }

    fn run_with_timeout(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<Option<ToolOutput>> {
        debug!(program = %program.display(), ?args, ?timeout, "Running tool with timeout");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= timeout {
                warn!(program = %program.display(), "Tool did not exit in time, killing it");
                // The child may exit between try_wait and kill.
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        };

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        if let Some(mut pipe) = child.stdout.take() {
            pipe.read_to_end(&mut stdout)?;
        }
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_end(&mut stderr)?;
        }

        Ok(Some(ToolOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            success: status.success(),
        }))
    }
}

/// A mock runner for testing.
///
/// Stores predefined argument-vector → output mappings and records every call.
#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock runner that returns preconfigured output.
    pub struct MockRunner {
        responses: Mutex<HashMap<Vec<String>, ToolOutput>>,
        calls: Mutex<Vec<Vec<String>>>,
        hang: Mutex<bool>,
    }

    impl MockRunner {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                hang: Mutex::new(false),
            }
        }

        /// Register the output for an argument vector.
        pub fn on(&self, args: &[&str], output: ToolOutput) {
            let key = args.iter().map(|a| a.to_string()).collect();
            self.responses.lock().unwrap().insert(key, output);
        }

        /// Forget all registered output, as if the binary had been deleted.
        pub fn remove_binary(&self) {
            self.responses.lock().unwrap().clear();
        }

        /// Make every timed run report a timeout.
        pub fn hang_on_timeout(&self) {
            *self.hang.lock().unwrap() = true;
        }

        /// Every argument vector seen so far, in call order.
        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls that started with `flag`.
        pub fn calls_with(&self, flag: &str) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter(|args| args.first().map(String::as_str) == Some(flag))
                .collect()
        }
    }

    impl CommandRunner for MockRunner {
        fn run(&self, _program: &Path, args: &[String]) -> Result<ToolOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            let responses = self.responses.lock().unwrap();
            responses.get(args).cloned().ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("mock: no output registered for {:?}", args),
                ))
            })
        }

        fn run_with_timeout(
            &self,
            program: &Path,
            args: &[String],
            _timeout: Duration,
        ) -> Result<Option<ToolOutput>> {
            if *self.hang.lock().unwrap() {
                return Ok(None);
            }
            self.run(program, args).map(Some)
        }
    }
}
