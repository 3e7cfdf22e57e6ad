//! Running external commands with a timeout.
//!
//! Every invocation is a blocking call: spawn with piped output, drain both
//! pipes on background threads, poll for exit, and kill the child when the
//! deadline passes or the [`CancelToken`] fires. The child is owned by a
//! [`ChildGuard`], so it is killed and reaped on every exit path.
//!
//! On unix the child leads its own process group and a kill takes the whole
//! group down. Wrapper scripts that fork the real work therefore cannot
//! outlive the deadline by holding the output pipes open.

use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for a pipe to reach EOF once the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// A command to run: program, arguments, working directory, deadline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, working_dir: &Path, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.to_owned(),
            timeout,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Shell-like rendering for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        let mut s = self.program.display().to_string();
        for a in &self.args {
            s.push(' ');
            s.push_str(&a.to_string_lossy());
        }
        s
    }
}

// ---------------------------------------------------------------------------
// CommandResult
// ---------------------------------------------------------------------------

/// Captured outcome of one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResult {
    pub command: String,
    /// `None` when the process was killed (timeout, cancel) or died from a
    /// signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
    pub cancelled: bool,
}

impl CommandResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Terminated without an exit code and not by us.
    #[must_use]
    pub const fn crashed(&self) -> bool {
        self.exit_code.is_none() && !self.timed_out && !self.cancelled
    }

    /// stdout followed by stderr.
    #[must_use]
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => {
                let sep = if self.stdout.ends_with('\n') { "" } else { "\n" };
                format!("{}{sep}{}", self.stdout, self.stderr)
            }
        }
    }
}

/// The last `n` lines of `text`.
#[must_use]
pub fn tail_lines(text: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].to_vec()
}

// ---------------------------------------------------------------------------
// ExecError
// ---------------------------------------------------------------------------

/// Failures to run a command at all (as opposed to the command failing).
#[derive(Debug)]
pub enum ExecError {
    /// The program could not be started.
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    /// Waiting on the child failed.
    Wait(std::io::Error),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                write!(f, "failed to spawn {}: {source}", program.display())
            }
            Self::Wait(e) => write!(f, "failed to wait for child process: {e}"),
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } | Self::Wait(source) => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// ChildGuard
// ---------------------------------------------------------------------------

/// Owns a running child; kills and reaps it when dropped unreaped.
struct ChildGuard {
    child: Option<Child>,
    pid: u32,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        let pid = child.id();
        Self {
            child: Some(child),
            pid,
        }
    }

    fn try_wait(&mut self) -> std::io::Result<Option<std::process::ExitStatus>> {
        match self.child.as_mut() {
            Some(c) => {
                let status = c.try_wait()?;
                if status.is_some() {
                    self.child = None;
                }
                Ok(status)
            }
            None => Ok(None),
        }
    }

    fn kill(&mut self) {
        if let Some(mut c) = self.child.take() {
            kill_group(self.pid);
            let _ = c.kill();
            let _ = c.wait();
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Start `cmd` as the leader of a new process group.
#[cfg(unix)]
fn own_group(cmd: &mut Command) -> &mut Command {
    use std::os::unix::process::CommandExt as _;
    cmd.process_group(0)
}

#[cfg(not(unix))]
const fn own_group(cmd: &mut Command) -> &mut Command {
    cmd
}

/// SIGKILL every process in group `pgid`. Best effort.
#[cfg(unix)]
fn kill_group(pgid: u32) {
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("kill -KILL -{pgid} 2>/dev/null"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = status {
        debug!(pgid, error = %e, "could not signal process group");
    }
}

#[cfg(not(unix))]
const fn kill_group(_pgid: u32) {}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Collect a drained pipe once the child is gone.
///
/// A descendant still holding the pipe gets its group killed; after a
/// second grace period the output is given up on.
fn collect(rx: &Receiver<String>, pgid: u32) -> String {
    if let Ok(s) = rx.recv_timeout(DRAIN_GRACE) {
        return s;
    }
    debug!(pgid, "pipe still open after exit; killing process group");
    kill_group(pgid);
    rx.recv_timeout(DRAIN_GRACE).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Run `inv` to completion, timeout, or cancellation.
///
/// A non-zero exit is not an error here; it is recorded in the result.
///
/// # Errors
/// [`ExecError::Spawn`] if the program cannot be started and
/// [`ExecError::Wait`] if polling the child fails.
#[instrument(skip_all, fields(command = %inv.display()))]
pub fn run(inv: &Invocation, cancel: &CancelToken) -> Result<CommandResult, ExecError> {
    let start = Instant::now();
    let mut cmd = Command::new(&inv.program);
    cmd.args(&inv.args)
        .current_dir(&inv.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let child = own_group(&mut cmd)
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: inv.program.clone(),
            source,
        })?;

    let mut guard = ChildGuard::new(child);
    let (stdout, stderr): (Option<ChildStdout>, Option<ChildStderr>) =
        match guard.child.as_mut() {
            Some(c) => (c.stdout.take(), c.stderr.take()),
            None => (None, None),
        };
    let stdout = drain(stdout);
    let stderr = drain(stderr);

    let mut timed_out = false;
    let mut cancelled = false;
    let exit_code = loop {
        match guard.try_wait().map_err(ExecError::Wait)? {
            Some(status) => {
                // An interrupt reaching the child first still counts as ours.
                cancelled = cancel.is_cancelled();
                break status.code();
            }
            None if cancel.is_cancelled() => {
                warn!("cancelled; killing child");
                cancelled = true;
                guard.kill();
                break None;
            }
            None if start.elapsed() >= inv.timeout => {
                warn!(timeout_s = inv.timeout.as_secs(), "timed out; killing child");
                timed_out = true;
                guard.kill();
                break None;
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let result = CommandResult {
        command: inv.display(),
        exit_code,
        stdout: collect(&stdout, guard.pid),
        stderr: collect(&stderr, guard.pid),
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        timed_out,
        cancelled,
    };
    debug!(
        exit_code = ?result.exit_code,
        duration_ms = result.duration_ms,
        "command finished"
    );
    Ok(result)
}

/// [`run`], retrying up to `retries` times when the child crashes.
///
/// Waits `cooldown` between attempts. Timeouts and non-zero exits are
/// returned as-is. A crash seen after cancellation is reported as cancelled.
/// The last attempt's result is returned.
///
/// # Errors
/// As [`run`].
pub fn run_with_retries(
    inv: &Invocation,
    retries: u32,
    cooldown: Duration,
    cancel: &CancelToken,
) -> Result<CommandResult, ExecError> {
    let mut attempt = 0;
    loop {
        let mut result = run(inv, cancel)?;
        if cancel.is_cancelled() {
            result.cancelled = true;
            return Ok(result);
        }
        if !result.crashed() || attempt >= retries {
            return Ok(result);
        }
        attempt += 1;
        info!(attempt, retries, "child crashed; retrying after cooldown");
        if !sleep_unless_cancelled(cooldown, cancel) {
            result.cancelled = true;
            return Ok(result);
        }
    }
}

/// Sleep for `d`; returns `false` if cancelled first.
fn sleep_unless_cancelled(d: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + d;
    while Instant::now() < deadline {
        if cancel.is_cancelled() {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        thread::sleep(POLL_INTERVAL.min(left));
    }
    !cancel.is_cancelled()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> Invocation {
        Invocation::new("sh", Path::new("."), timeout)
            .arg("-c")
            .arg(script)
    }

    #[test]
    fn captures_stdout_stderr_and_exit_code() {
        let inv = sh("echo out; echo err >&2; exit 3", Duration::from_secs(10));
        let r = run(&inv, &CancelToken::new()).unwrap();
        assert_eq!(r.exit_code, Some(3));
        assert_eq!(r.stdout, "out\n");
        assert_eq!(r.stderr, "err\n");
        assert!(!r.passed());
        assert!(!r.crashed());
        assert!(!r.timed_out);
        assert_eq!(r.combined_output(), "out\nerr\n");
    }

    #[test]
    fn zero_exit_passes() {
        let r = run(&sh("true", Duration::from_secs(10)), &CancelToken::new()).unwrap();
        assert!(r.passed());
        assert!(r.command.starts_with("sh -c"));
    }

    #[test]
    fn timeout_kills_child() {
        let inv = sh("exec sleep 30", Duration::from_millis(200));
        let start = Instant::now();
        let r = run(&inv, &CancelToken::new()).unwrap();
        assert!(r.timed_out);
        assert_eq!(r.exit_code, None);
        assert!(!r.crashed());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_forked_grandchild() {
        // The shell forks sleep instead of exec'ing it; the grandchild holds
        // the output pipes.
        let inv = sh("sleep 6; true", Duration::from_millis(200));
        let start = Instant::now();
        let r = run(&inv, &CancelToken::new()).unwrap();
        assert!(r.timed_out);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn background_process_outliving_child_does_not_hang() {
        let inv = sh("sleep 6 & echo done", Duration::from_secs(10));
        let start = Instant::now();
        let r = run(&inv, &CancelToken::new()).unwrap();
        assert!(r.passed());
        assert_eq!(r.stdout, "done\n");
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn cancelled_before_start_kills_immediately() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let r = run(&sh("exec sleep 30", Duration::from_secs(60)), &cancel).unwrap();
        assert!(r.cancelled);
        assert!(!r.timed_out);
        assert!(!r.crashed());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let inv = Invocation::new(
            "/nonexistent/definitely-not-a-binary",
            Path::new("."),
            Duration::from_secs(1),
        );
        let err = run(&inv, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert!(err.to_string().contains("definitely-not-a-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn signal_death_is_a_crash_and_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("attempts");
        // Append a line per attempt, then die from SIGKILL.
        let script = format!("echo x >> '{}'; kill -9 $$", counter.display());
        let r = run_with_retries(
            &sh(&script, Duration::from_secs(10)),
            2,
            Duration::from_millis(10),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(r.crashed());
        let attempts = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(attempts.lines().count(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn interrupt_after_cancel_is_cancelled_not_crashed() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("go");
        let counter = dir.path().join("attempts");
        let script = format!(
            "echo x >> '{}'; while [ ! -e '{}' ]; do sleep 0.02; done; kill -INT $$",
            counter.display(),
            flag.display()
        );
        let cancel = CancelToken::new();
        let trigger = {
            let cancel = cancel.clone();
            let flag = flag.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                cancel.cancel();
                std::fs::write(flag, "").unwrap();
            })
        };
        let r = run_with_retries(
            &sh(&script, Duration::from_secs(10)),
            2,
            Duration::from_millis(10),
            &cancel,
        )
        .unwrap();
        trigger.join().unwrap();
        assert!(r.cancelled);
        assert!(!r.crashed());
        let attempts = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(attempts.lines().count(), 1);
    }

    #[test]
    fn non_zero_exit_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("attempts");
        let script = format!("echo x >> '{}'; exit 1", counter.display());
        let r = run_with_retries(
            &sh(&script, Duration::from_secs(10)),
            3,
            Duration::from_millis(10),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(r.exit_code, Some(1));
        let attempts = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(attempts.lines().count(), 1);
    }

    #[test]
    fn tail_lines_takes_last_n() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), vec!["b", "c"]);
        assert_eq!(tail_lines("a\nb", 10), vec!["a", "b"]);
        assert!(tail_lines("", 5).is_empty());
    }

    #[test]
    fn combined_output_inserts_separator() {
        let r = CommandResult {
            command: "x".into(),
            exit_code: Some(1),
            stdout: "no newline".into(),
            stderr: "err".into(),
            duration_ms: 0,
            timed_out: false,
            cancelled: false,
        };
        assert_eq!(r.combined_output(), "no newline\nerr");
    }

    #[test]
    fn sleep_unless_cancelled_returns_early() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let start = Instant::now();
        assert!(!sleep_unless_cancelled(Duration::from_secs(5), &cancel));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
