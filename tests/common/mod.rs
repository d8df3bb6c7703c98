#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use ratsche::{
    ChildPid, ManualClock, Scheduler, SchedulerConfig, Supervisor, SupervisorError, TaskKind,
    TaskSpec,
};

#[derive(Debug, Default)]
pub struct Calls {
    pub spawned: Vec<String>,
    pub ran: Vec<String>,
    pub terminated: Vec<ChildPid>,
    pub exited: Vec<ChildPid>,
}

/// Supervisor that never touches the OS; clones share the call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSupervisor {
    calls: Arc<Mutex<Calls>>,
}

impl RecordingSupervisor {
    pub fn calls<R>(&self, f: impl FnOnce(&mut Calls) -> R) -> R {
        f(&mut self.calls.lock().unwrap())
    }

    pub fn exit(&self, child: ChildPid) {
        self.calls(|c| c.exited.push(child));
    }
}

impl Supervisor for RecordingSupervisor {
    fn spawn(&self, command: &str) -> Result<ChildPid, SupervisorError> {
        self.calls(|c| {
            c.spawned.push(command.to_string());
            Ok(ChildPid(5000 + c.spawned.len() as i32))
        })
    }

    fn run(&self, command: &str) -> Result<i32, SupervisorError> {
        self.calls(|c| c.ran.push(command.to_string()));
        Ok(0)
    }

    fn reap(&self, children: &[ChildPid]) -> Result<Option<ChildPid>, SupervisorError> {
        Ok(self.calls(|c| c.exited.iter().copied().find(|pid| children.contains(pid))))
    }

    fn terminate(&self, child: ChildPid) -> Result<(), SupervisorError> {
        self.calls(|c| c.terminated.push(child));
        Ok(())
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap()
}

pub fn quiet_config() -> SchedulerConfig {
    let mut config = SchedulerConfig::default();
    config.poll_interval_ms = 5;
    config.mount.settle_delay_ms = 0;
    config
}

pub fn fake_scheduler() -> (Scheduler, RecordingSupervisor, ManualClock) {
    let supervisor = RecordingSupervisor::default();
    let clock = ManualClock::new(epoch());
    let scheduler = Scheduler::new(
        quiet_config(),
        Box::new(supervisor.clone()),
        Box::new(clock.clone()),
    );
    (scheduler, supervisor, clock)
}

pub fn due_spec(kind: TaskKind, max_run_time: f64) -> TaskSpec {
    TaskSpec {
        kind,
        submit_time: None,
        schedule_time: epoch() - Duration::minutes(1),
        max_run_time,
        alt_period: 0.0,
        priority: 0,
        user: "observer".into(),
        comment: String::new(),
    }
}
