use std::{
    fmt,
    io,
    os::unix::process::{CommandExt, ExitStatusExt},
    process::{Command, Stdio},
    thread,
    time::Duration,
};

use libc;
use log::{debug, error, info, warn};

use crate::error::SupervisorError;

const SHELL: &str = "/bin/sh";

/// OS process id of a session leader started by a [`Supervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildPid(pub i32);

impl fmt::Display for ChildPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process lifecycle operations the task state machine relies on.
pub trait Supervisor: Send {
    /// Starts `command` through the shell as a new session leader.
    fn spawn(&self, command: &str) -> Result<ChildPid, SupervisorError>;

    /// Runs `command` to completion and returns its exit code.
    fn run(&self, command: &str) -> Result<i32, SupervisorError>;

    /// Non-blocking check of `children`; returns the first one that exited.
    fn reap(&self, children: &[ChildPid]) -> Result<Option<ChildPid>, SupervisorError>;

    /// Kills the whole process group led by `child` and waits until it is gone.
    fn terminate(&self, child: ChildPid) -> Result<(), SupervisorError>;
}

/// [`Supervisor`] backed by `fork`/`setsid`, `kill` and `waitpid`.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    retry_delay: Duration,
    max_attempts: u32,
}

impl ProcessSupervisor {
    pub fn new(retry_delay: Duration, max_attempts: u32) -> Self {
        Self {
            retry_delay,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(Duration::from_millis(10), 500)
    }
}

enum WaitOutcome {
    Running,
    Exited(i32),
    Gone,
}

fn wait_nohang(child: ChildPid) -> Result<WaitOutcome, SupervisorError> {
    let mut status: libc::c_int = 0;
    let result = unsafe { libc::waitpid(child.0, &mut status, libc::WNOHANG) };
    if result > 0 {
        return Ok(WaitOutcome::Exited(status));
    }
    if result == 0 {
        return Ok(WaitOutcome::Running);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ECHILD) {
        return Ok(WaitOutcome::Gone);
    }
    Err(SupervisorError::Wait {
        pid: child.0,
        source: err,
    })
}

impl Supervisor for ProcessSupervisor {
    fn spawn(&self, command: &str) -> Result<ChildPid, SupervisorError> {
        debug!("running shell command: {}", command);
        let mut shell = Command::new(SHELL);
        shell.arg("-c").arg(command).stdin(Stdio::null());
        unsafe {
            shell.pre_exec(|| {
                if libc::setsid() < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = shell.spawn().map_err(|source| SupervisorError::Spawn {
            command: command.to_string(),
            source,
        })?;
        let pid = child.id() as i32;
        if pid <= 0 {
            return Err(SupervisorError::InvalidPid(pid));
        }
        // Exit status is collected through waitpid, not the Child handle.
        drop(child);
        Ok(ChildPid(pid))
    }

    fn run(&self, command: &str) -> Result<i32, SupervisorError> {
        let status = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| SupervisorError::Spawn {
                command: command.to_string(),
                source,
            })?;
        let code = status
            .code()
            .or_else(|| status.signal().map(|signal| 128 + signal))
            .unwrap_or(-1);
        debug!("executed command: {} , code {}", command, code);
        Ok(code)
    }

    fn reap(&self, children: &[ChildPid]) -> Result<Option<ChildPid>, SupervisorError> {
        for &child in children {
            match wait_nohang(child) {
                Ok(WaitOutcome::Running) => {}
                Ok(WaitOutcome::Exited(status)) => {
                    debug!("child proc finished: pid = {} (status {})", child, status);
                    return Ok(Some(child));
                }
                Ok(WaitOutcome::Gone) => {
                    warn!("child proc {} was already reaped elsewhere", child);
                    return Ok(Some(child));
                }
                Err(e) => {
                    error!("waitpid error: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    fn terminate(&self, child: ChildPid) -> Result<(), SupervisorError> {
        for _ in 0..self.max_attempts {
            let killed = unsafe { libc::kill(-child.0, libc::SIGKILL) };
            thread::sleep(self.retry_delay);
            match wait_nohang(child)? {
                WaitOutcome::Running => continue,
                WaitOutcome::Exited(_) | WaitOutcome::Gone => {
                    info!("stopping child processes with PGID {}, kill={}", child, killed);
                    return Ok(());
                }
            }
        }
        error!(
            "failed to stop child processes with PGID {} after {} attempts",
            child, self.max_attempts
        );
        Err(SupervisorError::TerminationTimedOut {
            pid: child.0,
            attempts: self.max_attempts,
        })
    }
}
