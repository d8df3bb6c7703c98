use std::{
    thread,
    time::Instant,
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::manager::registry::Registry;
use crate::models::{
    message::SchedulerMessage,
    task::{Task, TaskId, TaskSpec, TaskState, TaskSummary},
};
use crate::time::{Clock, SystemClock};
use crate::worker::supervisor::{ProcessSupervisor, Supervisor};

/// Owns a registry and the tasks submitted to it, and polls them in
/// submission order.
pub struct Scheduler {
    registry: Registry,
    tasks: Vec<Task>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        supervisor: Box<dyn Supervisor>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Scheduler {
            registry: Registry::new(config, supervisor, clock),
            tasks: vec![],
        }
    }

    /// Scheduler running real processes against the system clock.
    pub fn with_system(config: SchedulerConfig) -> Self {
        let supervisor = ProcessSupervisor::new(config.kill_retry_delay(), config.kill_max_attempts);
        Self::new(config, Box::new(supervisor), Box::new(SystemClock))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn submit(&mut self, spec: TaskSpec) -> TaskId {
        let task = self.registry.create_task(spec);
        let id = task.id();
        self.tasks.push(task);
        id
    }

    pub fn poll(&mut self) {
        for task in self.tasks.iter_mut() {
            task.process(&mut self.registry);
        }
    }

    pub fn stop(&mut self, id: TaskId) -> Option<TaskState> {
        let task = self.tasks.iter_mut().find(|task| task.id() == id)?;
        Some(task.stop(&mut self.registry))
    }

    pub fn cancel(&mut self, id: TaskId) -> Option<TaskState> {
        let task = self.tasks.iter_mut().find(|task| task.id() == id)?;
        Some(task.cancel(&mut self.registry))
    }

    /// Drops a task from the schedule, stopping it first if it is active.
    pub fn remove(&mut self, id: TaskId) -> Option<TaskState> {
        let index = self.tasks.iter().position(|task| task.id() == id)?;
        let task = self.tasks.remove(index);
        Some(self.registry.retire(task))
    }

    /// Removes every settled task and returns how many were dropped.
    pub fn purge_settled(&mut self) -> usize {
        let (settled, live): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.state().is_terminal());
        self.tasks = live;
        let count = settled.len();
        for task in settled {
            self.registry.retire(task);
        }
        count
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn summaries(&self) -> Vec<TaskSummary> {
        self.tasks.iter().map(Task::summary).collect()
    }

    pub fn all_settled(&self) -> bool {
        self.tasks.iter().all(|task| task.state().is_terminal())
    }

    fn handle(&mut self, message: SchedulerMessage) {
        match message {
            SchedulerMessage::Submit(spec) => {
                self.submit(spec);
            }
            SchedulerMessage::Stop(id) => {
                if self.stop(id).is_none() {
                    warn!("stop requested for unknown task id={}", id);
                }
            }
            SchedulerMessage::Cancel(id) => {
                if self.cancel(id).is_none() {
                    warn!("cancel requested for unknown task id={}", id);
                }
            }
            SchedulerMessage::Report(reply) => {
                if reply.send(self.summaries()).is_err() {
                    debug!("report requester went away");
                }
            }
            SchedulerMessage::Shutdown => {}
        }
    }

    /// Polls at the configured cadence while serving messages, until
    /// `Shutdown` arrives or, with `exit_when_settled`, every task settled.
    ///
    /// A closed channel is not fatal: polling continues without messages.
    pub fn run(&mut self, receiver: &Receiver<SchedulerMessage>, exit_when_settled: bool) {
        let interval = self.registry.config().poll_interval();
        let mut connected = true;
        let mut next_poll = Instant::now();
        info!("scheduler loop started, polling every {:?}", interval);

        loop {
            let timeout = next_poll.saturating_duration_since(Instant::now());
            if connected {
                match receiver.recv_timeout(timeout) {
                    Ok(SchedulerMessage::Shutdown) => {
                        info!("shutdown requested");
                        break;
                    }
                    Ok(message) => self.handle(message),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        debug!("message channel closed, continuing to poll");
                        connected = false;
                    }
                }
            } else {
                thread::sleep(timeout);
            }

            if Instant::now() >= next_poll {
                self.poll();
                next_poll = Instant::now() + interval;
                if exit_when_settled && self.all_settled() {
                    info!("all tasks settled");
                    break;
                }
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for task in self.tasks.iter_mut() {
            if task.state() == TaskState::Active {
                task.stop(&mut self.registry);
            }
        }
    }
}
