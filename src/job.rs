//! A single spawned child process plus its captured state.
//!
//! Mirrors the supervisor/collector split in the teacher's `run.rs`
//! (`supervise` + per-stream reader threads), but keeps everything
//! in-process: output is collected into a `Vec<u8>` under a `RwLock`
//! instead of being teed to per-job log files on disk.

use std::io::Read;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::{Arc, RwLock};
use std::thread;

use std::os::unix::process::CommandExt;

use tracing::{debug, info, warn};

use crate::error::JobError;

/// Where a job sits in its lifecycle. Monotone: once terminal, never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Canceled,
    Failed,
}

impl JobState {
    /// The exact wire string spec.md §6 mandates.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            JobState::Queued => "QUEUED",
            JobState::Running => "RUNNING",
            JobState::Finished => "FINISHED",
            JobState::Canceled => "CANCELED",
            JobState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Canceled | JobState::Failed
        )
    }
}

struct JobInner {
    state: JobState,
    output: Vec<u8>,
    pgid: Option<i32>,
    /// Set by `stop()`; consulted by the collector to decide whether a
    /// signal-terminated exit is a cancellation or an unrelated failure
    /// (DESIGN.md, Open Question (c)).
    stop_requested: bool,
}

/// One managed child process. Always held behind an `Arc` so the background
/// collector thread can outlive the call that spawned it.
pub struct Job {
    command: Vec<String>,
    inner: RwLock<JobInner>,
}

impl Job {
    /// Construct a job in the `Queued` state. Does not spawn anything.
    pub fn new(command: Vec<String>) -> Arc<Job> {
        Arc::new(Job {
            command,
            inner: RwLock::new(JobInner {
                state: JobState::Queued,
                output: Vec::new(),
                pgid: None,
                stop_requested: false,
            }),
        })
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// The argv joined with single spaces, as returned on the wire.
    pub fn command_joined(&self) -> String {
        self.command.join(" ")
    }

    pub fn state(&self) -> JobState {
        self.inner.read().expect("job lock poisoned").state
    }

    /// A snapshot copy of the captured output so far.
    pub fn output(&self) -> Vec<u8> {
        self.inner.read().expect("job lock poisoned").output.clone()
    }

    /// Spawn the child and, on success, a background collector thread.
    /// Never blocks on the child's completion.
    pub fn start(self: &Arc<Self>) {
        let mut cmd = std::process::Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        // Place the child in its own process group (pgid == child pid) so a
        // signal to -pgid reaches any descendants it forks. std exposes this
        // directly; no pre_exec/libc needed for the fork side.
        cmd.process_group(0);
        cmd.stdin(Stdio::null());
        // Two pipes, merged by two reader threads below. Strategy (b) from
        // spec.md §4.1 step 3: simpler and safer than juggling raw dup'd fds
        // for a single shared pipe, at the cost of exact byte-interleave
        // ordering between stdout and stderr (acceptable per spec).
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        match cmd.spawn() {
            Err(source) => {
                let err = JobError::SpawnFailure {
                    command: self.command.clone(),
                    source,
                };
                let mut guard = self.inner.write().expect("job lock poisoned");
                guard.output.extend_from_slice(format!("{err}\n").as_bytes());
                guard.state = JobState::Failed;
                warn!(command = ?self.command, %err, "spawn failed");
            }
            Ok(mut child) => {
                let pid = child.id() as i32;
                {
                    let mut guard = self.inner.write().expect("job lock poisoned");
                    guard.pgid = Some(pid);
                    guard.state = JobState::Running;
                }
                info!(pgid = pid, command = ?self.command, "job started");

                let stdout = child.stdout.take().expect("child stdout piped");
                let stderr = child.stderr.take().expect("child stderr piped");

                let job_out = Arc::clone(self);
                let job_err = Arc::clone(self);
                let t_out = thread::spawn(move || job_out.drain(stdout));
                let t_err = thread::spawn(move || job_err.drain(stderr));

                let job = Arc::clone(self);
                thread::spawn(move || job.reap(child, t_out, t_err));
            }
        }
    }

    /// Reader-thread body: append chunks to `output` until EOF. Holds the
    /// lock only while mutating, never while blocked in `read`.
    fn drain(&self, mut stream: impl Read) {
        let mut buf = [0u8; 8192];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let mut guard = self.inner.write().expect("job lock poisoned");
                    guard.output.extend_from_slice(&buf[..n]);
                }
                Err(_) => break,
            }
        }
    }

    /// Collector body: join both reader threads, wait for the child, and
    /// record the terminal state. Runs entirely without holding the lock
    /// except for the final state write.
    fn reap(
        self: Arc<Self>,
        mut child: Child,
        t_out: thread::JoinHandle<()>,
        t_err: thread::JoinHandle<()>,
    ) {
        let _ = t_out.join();
        let _ = t_err.join();

        let status = child.wait();
        let stop_requested = self.inner.read().expect("job lock poisoned").stop_requested;

        let mut guard = self.inner.write().expect("job lock poisoned");
        guard.state = match status {
            Ok(status) => classify_exit(status, stop_requested),
            Err(_) => JobState::Failed,
        };
        debug!(state = ?guard.state, "job reaped");
    }

    /// Send `SIGTERM` to the job's process group. Returns `Ok(true)` if a
    /// running job was signaled, `Ok(false)` if the job was not running
    /// (a no-op success, per spec.md §4.1), and `Err` if the OS rejected the
    /// signal.
    pub fn stop(&self) -> Result<bool, JobError> {
        let pgid = {
            let mut guard = self.inner.write().expect("job lock poisoned");
            if guard.state != JobState::Running {
                return Ok(false);
            }
            guard.stop_requested = true;
            guard.pgid.expect("running job always has a pgid")
        };

        // SAFETY: kill(2) is safe to call with any pid/signal; -pgid targets
        // the whole process group so descendants die with the child.
        let ret = unsafe { libc::kill(-pgid, libc::SIGTERM) };
        if ret != 0 {
            let source = std::io::Error::last_os_error();
            if source.raw_os_error() != Some(libc::ESRCH) {
                return Err(JobError::SignalFailure { pgid, source });
            }
        }
        Ok(true)
    }
}

/// Decide the terminal state of a finished child. A signal-terminated exit
/// is `Canceled` only if this job's own `stop()` requested it; otherwise an
/// externally delivered signal (e.g. the child segfaulting) is `Failed`.
fn classify_exit(status: ExitStatus, stop_requested: bool) -> JobState {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if status.signal().is_some() {
            return if stop_requested {
                JobState::Canceled
            } else {
                JobState::Failed
            };
        }
    }
    if status.success() {
        JobState::Finished
    } else {
        JobState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_for_terminal(job: &Arc<Job>) {
        for _ in 0..200 {
            if job.state().is_terminal() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("job did not reach a terminal state in time");
    }

    #[test]
    fn echo_finishes_with_captured_output() {
        let job = Job::new(vec!["echo".into(), "HELLO".into()]);
        job.start();
        wait_for_terminal(&job);
        assert_eq!(job.state(), JobState::Finished);
        assert_eq!(job.output(), b"HELLO\n");
    }

    #[test]
    fn nonzero_exit_is_failed() {
        let job = Job::new(vec!["false".into()]);
        job.start();
        wait_for_terminal(&job);
        assert_eq!(job.state(), JobState::Failed);
    }

    #[test]
    fn spawn_failure_is_failed_without_collector() {
        let job = Job::new(vec!["/no/such/binary-xyz".into()]);
        job.start();
        assert_eq!(job.state(), JobState::Failed);
        assert!(!job.output().is_empty());
    }

    #[test]
    fn stop_on_queued_job_is_a_noop() {
        let job = Job::new(vec!["sleep".into(), "1".into()]);
        assert_eq!(job.stop().unwrap(), false);
        assert_eq!(job.state(), JobState::Queued);
    }

    #[test]
    fn stop_on_running_job_cancels_it() {
        let job = Job::new(vec!["sleep".into(), "30".into()]);
        job.start();
        for _ in 0..100 {
            if job.state() == JobState::Running {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(job.stop().unwrap(), true);
        wait_for_terminal(&job);
        assert_eq!(job.state(), JobState::Canceled);
    }

    #[test]
    fn stop_twice_second_call_is_noop() {
        let job = Job::new(vec!["sleep".into(), "30".into()]);
        job.start();
        for _ in 0..100 {
            if job.state() == JobState::Running {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(job.stop().unwrap(), true);
        wait_for_terminal(&job);
        assert_eq!(job.stop().unwrap(), false);
    }
}
