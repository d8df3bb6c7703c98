//! Task state machine.
//!
//! A task is driven entirely by its owner calling [`Task::process`] at a
//! fixed cadence. Every failure is resolved here into a task state; nothing
//! is propagated to the caller.

use std::{mem, path::PathBuf, thread};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::error::TaskError;
use crate::manager::registry::Registry;
use crate::models::task::{Task, TaskState};
use crate::time;
use crate::worker::{command, header};

/// Alt periods within this many hours of zero count as zero.
const ALT_PERIOD_EPSILON: f64 = 1e-4;

impl Task {
    /// Advances the task by one poll.
    pub fn process(&mut self, registry: &mut Registry) {
        if self.state.is_terminal() {
            return;
        }
        let now = registry.now();

        if self.state == TaskState::Active {
            self.supervise(registry, now);
            return;
        }

        if now <= self.schedule_time {
            return;
        }
        if !registry.any_active() {
            debug!("schedule time of task id={} is up, starting", self.id);
            self.start(registry);
            return;
        }

        self.state = TaskState::Waiting;
        // A window that ends past the representable range is never missed.
        let missed = time::add_hours(self.schedule_time, self.max_run_time)
            .map_or(false, |latest_start| now > latest_start);
        if missed {
            self.window_missed();
        }
    }

    /// Tries to claim the admission gate and launch the task's command.
    pub fn start(&mut self, registry: &mut Registry) -> TaskState {
        if self.state.is_terminal() || self.state == TaskState::Active {
            return self.state;
        }
        if !registry.gate.try_acquire(self.id) {
            self.state = TaskState::Waiting;
            return self.state;
        }

        self.state = TaskState::Active;
        self.start_time = Some(registry.now());
        self.elapsed_time = 0.0;

        if let Err(e) = self.launch(registry) {
            error!(
                "failed to start {} task with id={}: {}",
                self.kind.label(),
                self.id,
                e
            );
            self.kill_children(registry);
            registry.gate.release(self.id);
            self.state = TaskState::Error;
            self.last_error = Some(e);
        }
        self.state
    }

    /// Forcefully ends the task. Active process groups are killed and the
    /// gate is released; already settled tasks are left untouched.
    pub fn stop(&mut self, registry: &mut Registry) -> TaskState {
        match self.state {
            TaskState::Finished
            | TaskState::Cancelled
            | TaskState::Stopped
            | TaskState::Error => return self.state,
            TaskState::Waiting => self.state = TaskState::Stopped,
            TaskState::Active => {
                let clean = self.kill_children(registry);
                registry.gate.release(self.id);
                self.state = if clean {
                    TaskState::Stopped
                } else {
                    TaskState::Error
                };
            }
        }
        info!("stopping {} task with id={}", self.kind.label(), self.id);
        self.state
    }

    /// Stops the task and marks it cancelled, whatever the stop reported.
    pub fn cancel(&mut self, registry: &mut Registry) -> TaskState {
        let stopped = self.stop(registry);
        self.state = TaskState::Cancelled;
        info!(
            "cancelled {} task with id={} (stop reported {:?})",
            self.kind.label(),
            self.id,
            stopped
        );
        self.state
    }

    fn launch(&mut self, registry: &Registry) -> Result<(), TaskError> {
        let config = registry.config();
        let started = self.start_time.unwrap_or_else(|| registry.now());

        let data_file = match self.kind.file_tag() {
            Some(tag) => {
                let name = format!("task_{}{}", tag, time::file_stamp(started));
                let path = match &config.data_path {
                    Some(dir) => dir.join(&name),
                    None => PathBuf::from(&name),
                };
                self.data_file = Some(name);
                self.data_path = config.data_path.clone();
                header::write_header(&path, self)?;
                Some(path)
            }
            None => None,
        };

        let plan = command::plan(&self.kind, self.max_run_time, data_file.as_deref(), config);
        if let Some(mount_command) = &plan.mount_command {
            match registry.supervisor().run(mount_command) {
                Ok(code) => debug!("executing command: {} , code {}", mount_command, code),
                Err(e) => warn!("mount command for task id={} failed: {}", self.id, e),
            }
            // Let the mount leave its idle state before it is polled.
            let settle = config.mount.settle_delay();
            if !settle.is_zero() {
                thread::sleep(settle);
            }
        }

        debug!("executing command: {}", plan.command);
        let child = registry.supervisor().spawn(&plan.command)?;
        info!(
            "starting {} task with id={} (pid {})",
            self.kind.label(),
            self.id,
            child
        );
        self.children.push(child);
        Ok(())
    }

    fn supervise(&mut self, registry: &mut Registry, now: DateTime<Utc>) {
        match registry.supervisor().reap(&self.children) {
            Err(e) => {
                error!("waitpid error for task id={}: {}", self.id, e);
                self.stop(registry);
                self.state = TaskState::Error;
                self.last_error = Some(e.into());
                return;
            }
            Ok(Some(exited)) => {
                debug!("child proc of task id={} finished: pid = {}", self.id, exited);
                self.children.retain(|child| *child != exited);
                self.kill_children(registry);
                registry.gate.release(self.id);
                self.state = TaskState::Finished;
                info!("{} task with id={} finished", self.kind.label(), self.id);
                return;
            }
            Ok(None) => {}
        }

        if let Some(started) = self.start_time {
            self.elapsed_time = time::hours_between(started, now);
        }
        if self.elapsed_time > self.max_run_time {
            self.stop(registry);
            info!(
                "forcefully stopped task id={}: maximum runtime of {}h exceeded",
                self.id, self.max_run_time
            );
            self.state = TaskState::Finished;
        }
    }

    fn window_missed(&mut self) {
        if self.alt_period < -ALT_PERIOD_EPSILON {
            warn!(
                "task id={} could not run in its window, cancelling",
                self.id
            );
            self.state = TaskState::Cancelled;
        } else if self.alt_period > ALT_PERIOD_EPSILON {
            match time::add_hours(self.schedule_time, self.alt_period) {
                Some(next) => {
                    self.schedule_time = next;
                    info!(
                        "task id={} missed its window, rescheduled to {}",
                        self.id, self.schedule_time
                    );
                }
                None => warn!(
                    "task id={} missed its window; alt period of {}h is out of range, schedule kept",
                    self.id, self.alt_period
                ),
            }
        }
    }

    /// Terminates every recorded child. Returns false if any survived.
    fn kill_children(&mut self, registry: &Registry) -> bool {
        let mut clean = true;
        for child in mem::take(&mut self.children) {
            if let Err(e) = registry.supervisor().terminate(child) {
                error!(
                    "failed to stop child processes of task id={}: {}",
                    self.id, e
                );
                self.last_error = Some(e.into());
                clean = false;
            }
        }
        clean
    }

    #[cfg(test)]
    pub(crate) fn adopt_child(&mut self, child: crate::worker::supervisor::ChildPid) {
        self.children.push(child);
    }
}
