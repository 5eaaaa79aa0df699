//! Running search tools as child processes.
//!
//! Every child is bound to a [`SearchContext`]: the caller's thread polls the
//! child and kills and reaps it once the deadline passes or the token is
//! cancelled. Output pipes are drained on helper threads so a chatty tool
//! cannot block on a full pipe while we wait. Collecting the drained output
//! is bounded by the same deadline, since a detached grandchild can hold a
//! pipe open after the child itself has exited.

use crate::cancel::SearchContext;
use crate::config::ProcessConfig;
use crate::error::{Result, SearchError};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use tracing::{debug, warn};

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Non-empty stdout lines, at most `limit` of them.
    pub fn lines(&self, limit: usize) -> Vec<String> {
        self.stdout
            .lines()
            .filter(|l| !l.is_empty())
            .take(limit)
            .map(String::from)
            .collect()
    }
}

/// Seam between adapters and the operating system.
///
/// Adapters that shell out go through this trait so tests can script tool
/// availability and output.
pub trait CommandRunner: Send + Sync {
    /// Whether `program` can be found on PATH.
    fn command_exists(&self, program: &str) -> bool;

    /// Run `program` to completion within the context's budget.
    fn run(&self, program: &str, args: &[String], ctx: &SearchContext) -> Result<ProcessOutput>;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn command_exists(&self, program: &str) -> bool {
        super::paths::command_exists(program)
    }

    fn run(&self, program: &str, args: &[String], ctx: &SearchContext) -> Result<ProcessOutput> {
        run_with_deadline(program, args, ctx)
    }
}

/// Spawn `program` and wait for it, honoring the deadline and cancellation.
pub fn run_with_deadline(
    program: &str,
    args: &[String],
    ctx: &SearchContext,
) -> Result<ProcessOutput> {
    debug!("Running {} {:?}", program, args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(&mut child, program);
                return Err(e.into());
            }
        }

        if ctx.token().is_cancelled() {
            debug!("Cancelling {}", program);
            kill_and_reap(&mut child, program);
            return Err(SearchError::Cancelled);
        }

        if ctx.is_expired() {
            warn!("{} exceeded {:?}, killing it", program, ctx.timeout());
            kill_and_reap(&mut child, program);
            return Err(SearchError::Timeout {
                tool: program.to_string(),
                after: ctx.timeout(),
            });
        }

        thread::sleep(ProcessConfig::POLL_INTERVAL.min(ctx.remaining()));
    };

    Ok(ProcessOutput {
        success: status.success(),
        code: status.code(),
        stdout: collect(stdout, program, ctx)?,
        stderr: collect(stderr, program, ctx)?,
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Wait for a drained pipe, at least one poll interval and otherwise no
/// longer than the remaining budget.
fn collect(pipe: Option<Receiver<Vec<u8>>>, program: &str, ctx: &SearchContext) -> Result<String> {
    let Some(rx) = pipe else {
        return Ok(String::new());
    };

    match rx.recv_timeout(ctx.remaining().max(ProcessConfig::POLL_INTERVAL)) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
        Err(RecvTimeoutError::Timeout) => {
            warn!("{} exited but its output stayed open past {:?}", program, ctx.timeout());
            Err(SearchError::Timeout {
                tool: program.to_string(),
                after: ctx.timeout(),
            })
        }
    }
}

/// Kill the child and reap it so it does not linger as a zombie.
fn kill_and_reap(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        debug!("kill({}) failed: {} (it may have already exited)", program, e);
    }
    if let Err(e) = child.wait() {
        debug!("wait({}) failed: {}", program, e);
    }
}
