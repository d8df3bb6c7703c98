use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::manager::gate::AdmissionGate;
use crate::models::task::{Task, TaskId, TaskSpec, TaskState};
use crate::time::Clock;
use crate::worker::supervisor::Supervisor;

/// State shared by every task of one scheduler: the admission gate, the
/// live task count, shared paths, and the process/clock backends.
///
/// Tasks borrow the registry mutably for each `process`/`start`/`stop`
/// call; a driver that polls from several threads must wrap it in a lock.
pub struct Registry {
    pub(crate) gate: AdmissionGate,
    num_tasks: usize,
    next_id: u64,
    config: SchedulerConfig,
    supervisor: Box<dyn Supervisor>,
    clock: Box<dyn Clock>,
}

impl Registry {
    pub fn new(
        config: SchedulerConfig,
        supervisor: Box<dyn Supervisor>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            gate: AdmissionGate::default(),
            num_tasks: 0,
            next_id: 0,
            config,
            supervisor,
            clock,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn supervisor(&self) -> &dyn Supervisor {
        self.supervisor.as_ref()
    }

    pub fn any_active(&self) -> bool {
        self.gate.is_held()
    }

    pub fn active_task(&self) -> Option<TaskId> {
        self.gate.holder()
    }

    pub fn num_tasks(&self) -> usize {
        self.num_tasks
    }

    pub fn create_task(&mut self, mut spec: TaskSpec) -> Task {
        if spec.max_run_time.is_nan() {
            warn!("max run time of submitted task is NaN, using 0h");
            spec.max_run_time = 0.0;
        }
        if spec.alt_period.is_nan() {
            warn!("alt period of submitted task is NaN, using 0h");
            spec.alt_period = 0.0;
        }
        self.next_id += 1;
        self.num_tasks += 1;
        let task = Task::new(TaskId(self.next_id), spec, self.now());
        info!(
            "{} task with id={} submitted, scheduled for {}",
            task.kind().label(),
            task.id(),
            task.schedule_time()
        );
        task
    }

    /// Disposes of a task, stopping it first if it is still active.
    pub fn retire(&mut self, mut task: Task) -> TaskState {
        if task.state() == TaskState::Active {
            task.stop(self);
        }
        self.num_tasks = self.num_tasks.saturating_sub(1);
        debug!("task id={} retired in state {:?}", task.id(), task.state());
        task.state()
    }
}
