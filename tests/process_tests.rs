#![cfg(unix)]

mod common;

use std::{
    thread,
    time::{Duration, Instant},
};

use ratsche::{
    ChildPid, ProcessSupervisor, Scheduler, Supervisor, SystemClock, TaskKind, TaskSpec,
    TaskState,
};

use common::quiet_config;

fn supervisor() -> ProcessSupervisor {
    ProcessSupervisor::new(Duration::from_millis(10), 300)
}

fn reap_within(supervisor: &ProcessSupervisor, child: ChildPid, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if supervisor.reap(&[child]).unwrap() == Some(child) {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn spawned_command_leads_its_own_session() {
    let supervisor = supervisor();
    let child = supervisor.spawn("sleep 0.2").unwrap();
    assert!(child.0 > 0);
    assert_eq!(unsafe { libc::getsid(child.0) }, child.0);
    assert!(reap_within(&supervisor, child, Duration::from_secs(5)));
}

#[test]
fn running_child_is_not_reported_as_exited() {
    let supervisor = supervisor();
    let child = supervisor.spawn("sleep 30").unwrap();
    assert_eq!(supervisor.reap(&[child]).unwrap(), None);
    supervisor.terminate(child).unwrap();
}

#[test]
fn terminate_kills_the_whole_process_group() {
    let supervisor = supervisor();
    let child = supervisor.spawn("sleep 30 & sleep 30; wait").unwrap();
    thread::sleep(Duration::from_millis(100));

    supervisor.terminate(child).unwrap();

    // The group leader has been reaped, so it no longer exists at all.
    assert_eq!(unsafe { libc::kill(child.0, 0) }, -1);
}

#[test]
fn run_reports_exit_code() {
    assert_eq!(supervisor().run("exit 3").unwrap(), 3);
    assert_eq!(supervisor().run("true").unwrap(), 0);
}

fn due_maintenance(max_run_time: f64) -> TaskSpec {
    TaskSpec {
        kind: TaskKind::Maintenance,
        submit_time: None,
        schedule_time: chrono::Utc::now() - chrono::Duration::seconds(1),
        max_run_time,
        alt_period: 0.0,
        priority: 0,
        user: "ops".into(),
        comment: String::new(),
    }
}

fn poll_until_settled(scheduler: &mut Scheduler, limit: Duration) {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline && !scheduler.all_settled() {
        scheduler.poll();
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn maintenance_task_finishes_when_its_sleep_ends() {
    let mut scheduler = Scheduler::new(
        quiet_config(),
        Box::new(supervisor()),
        Box::new(SystemClock),
    );
    let id = scheduler.submit(due_maintenance(0.0003));
    poll_until_settled(&mut scheduler, Duration::from_secs(10));

    let task = scheduler.task(id).unwrap();
    assert_eq!(task.state(), TaskState::Finished);
    assert!(task.children().is_empty());
    assert!(!scheduler.registry().any_active());
}

#[test]
fn overrunning_process_is_killed_at_the_deadline() {
    let mut config = quiet_config();
    // Sleep well past max_run_time so only the deadline can end the task.
    config.maintenance_margin_secs = -60.0;
    let mut scheduler = Scheduler::new(config, Box::new(supervisor()), Box::new(SystemClock));
    let id = scheduler.submit(due_maintenance(0.0003));
    scheduler.poll();
    let child = scheduler.task(id).unwrap().children()[0];

    poll_until_settled(&mut scheduler, Duration::from_secs(10));

    let task = scheduler.task(id).unwrap();
    assert_eq!(task.state(), TaskState::Finished);
    assert!(task.last_error().is_none());
    assert_eq!(unsafe { libc::kill(child.0, 0) }, -1);
}
