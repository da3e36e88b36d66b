use std::{future::Future, process::Stdio, time::Duration};

use tokio::{process::Command, time::timeout};
use tracing::{debug, trace};

use crate::errors::ProcessError;

// Upper bound on the captured output of a command, anything past it is dropped
pub const CAPTURE_LIMIT: usize = 112;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    // Exit code of the process, -1 if it was killed by a signal
    pub status: i32,
    // Captured standard output, empty when capture was not requested
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

// Runs external commands on behalf of the clock backends
pub trait ProcessRunner {
    fn run(
        &self,
        argv: &[String],
        capture: bool,
    ) -> impl Future<Output = Result<ProcessOutput, ProcessError>>;
}

// Run commands as child processes, killing them when the timeout expires
#[derive(Debug, Clone)]
pub struct ChildProcessRunner {
    timeout: Duration,
}

impl ChildProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ChildProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ProcessRunner for ChildProcessRunner {
    async fn run(
        &self,
        argv: &[String],
        capture: bool,
    ) -> Result<ProcessOutput, ProcessError> {
        let (program, args) =
            argv.split_first().ok_or(ProcessError::EmptyCommand)?;

        debug!("Running {:?}", argv);

        let stdout = if capture { Stdio::piped() } else { Stdio::null() };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Dropping the future on timeout kills the child
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProcessError::Timeout {
                program: program.clone(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let captured = &output.stdout[..output.stdout.len().min(CAPTURE_LIMIT)];
        let output = ProcessOutput {
            status: output.status.code().unwrap_or(-1),
            output: String::from_utf8_lossy(captured).into_owned(),
        };

        trace!("{} exited with {}: {:?}", program, output.status, output.output);

        Ok(output)
    }
}
