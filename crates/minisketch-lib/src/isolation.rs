//! Crash containment for units of work
//!
//! Work that must not be able to corrupt the coordinating process runs in a
//! child process. The caller blocks until the child terminates; a non-zero
//! exit status or a termination by signal is a fatal failure of the caller.
//!
//! Two ways to describe the unit of work:
//! - any [`Command`], run with [`run_isolated`] / [`run_isolated_or_exit`];
//! - a named job of the current executable. The binary registers its jobs in
//!   an [`IsolatedJobs`] table and calls [`IsolatedJobs::dispatch`] first thing
//!   in `main`; [`run_in_child`] re-executes the binary with
//!   [`ISOLATED_JOB_ENV`] set so that the child runs only that job.

use std::collections::BTreeMap;
use std::io;
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, error};

/// Environment variable naming the job an isolated child must run
pub const ISOLATED_JOB_ENV: &str = "MINISKETCH_ISOLATED_JOB";

/// Ways an isolated unit of work can fail
#[derive(Error, Debug)]
pub enum IsolationError {
    /// The child could not be started
    #[error("failed to spawn child process: {0}")]
    Spawn(#[source] io::Error),
    /// Waiting for the child failed
    #[error("failed to wait for child process: {0}")]
    Wait(#[source] io::Error),
    /// The current executable could not be located for re-execution
    #[error("cannot locate the current executable: {0}")]
    CurrentExe(#[source] io::Error),
    /// The child exited with a non-zero status
    #[error("child process exited with status {0}")]
    Failed(i32),
    /// The child was terminated by a signal
    #[error("child process terminated by signal {0}")]
    Signaled(i32),
    /// The child terminated without an exit code or signal
    #[error("child process terminated abnormally")]
    Abnormal,
}

/// Run `command` to completion in a child process
///
/// # Errors
/// Returns an error if the child cannot be spawned or does not exit with status 0
pub fn run_isolated(command: &mut Command) -> Result<(), IsolationError> {
    debug!("Running isolated child: {:?}", command);
    let mut child = command.spawn().map_err(IsolationError::Spawn)?;
    let status = child.wait().map_err(IsolationError::Wait)?;
    check_status(status)
}

fn check_status(status: ExitStatus) -> Result<(), IsolationError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(IsolationError::Failed(code));
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(IsolationError::Signaled(signal));
        }
    }
    Err(IsolationError::Abnormal)
}

/// Run `command` in a child process, terminating this process if it fails
pub fn run_isolated_or_exit(command: &mut Command) {
    if let Err(e) = run_isolated(command) {
        error!("Child process crashed: {}", e);
        std::process::exit(1);
    }
}

/// Command re-executing the current binary as an isolated child running `job`
pub fn child_command<S: AsRef<str>>(job: &str, args: &[S]) -> Result<Command, IsolationError> {
    let exe = std::env::current_exe().map_err(IsolationError::CurrentExe)?;
    let mut command = Command::new(exe);
    command
        .args(args.iter().map(|arg| arg.as_ref()))
        .env(ISOLATED_JOB_ENV, job);
    Ok(command)
}

/// Run the registered job `job` in an isolated copy of the current binary
///
/// Terminates this process with status 1 if the child fails.
pub fn run_in_child<S: AsRef<str>>(job: &str, args: &[S]) {
    match child_command(job, args) {
        Ok(mut command) => run_isolated_or_exit(&mut command),
        Err(e) => {
            error!("Child process crashed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Entry point of a named job; receives the child's command-line arguments
pub type JobFn = fn(&[String]) -> anyhow::Result<()>;

/// Table of jobs the current binary can run in isolation
#[derive(Default)]
pub struct IsolatedJobs {
    jobs: BTreeMap<&'static str, JobFn>,
}

impl IsolatedJobs {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` under `name`
    pub fn register(mut self, name: &'static str, job: JobFn) -> Self {
        self.jobs.insert(name, job);
        self
    }

    /// Whether a job named `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Run `requested` if set, returning the exit status the child should use
    ///
    /// Returns `None` when no job was requested, i.e. in the parent process.
    pub fn dispatch_with(&self, requested: Option<&str>, args: &[String]) -> Option<i32> {
        let name = requested?;
        let Some(job) = self.jobs.get(name) else {
            error!("Unknown isolated job: {}", name);
            return Some(1);
        };
        debug!("Running isolated job {}", name);
        match job(args) {
            Ok(()) => Some(0),
            Err(e) => {
                error!("Isolated job {} failed: {:#}", name, e);
                Some(1)
            }
        }
    }

    /// In an isolated child, run the requested job and exit
    ///
    /// Does nothing when [`ISOLATED_JOB_ENV`] is not set.
    pub fn dispatch(&self) {
        let Ok(requested) = std::env::var(ISOLATED_JOB_ENV) else {
            return;
        };
        let args: Vec<String> = std::env::args().skip(1).collect();
        if let Some(code) = self.dispatch_with(Some(&requested), &args) {
            std::process::exit(code);
        }
    }
}
