use std::{
    io::{self, BufRead},
    thread,
};

use crossbeam_channel::{bounded, Sender};
use log::{debug, error};

use crate::models::{
    message::SchedulerMessage,
    task::{TaskId, TaskSummary},
};

#[derive(Debug, PartialEq)]
pub enum ConsoleCommand {
    List,
    Status(TaskId),
    Stop(TaskId),
    Cancel(TaskId),
    Exit,
}

pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut args = line.split_whitespace();
    let command = match args.next() {
        Some(command) => command,
        None => return Ok(None),
    };

    let task_id = |arg: Option<&str>| -> Result<TaskId, String> {
        let raw = arg.ok_or_else(|| "Task ID must be specified.".to_string())?;
        raw.parse::<u64>()
            .map(TaskId)
            .map_err(|_| "Invalid task ID format.".to_string())
    };

    let parsed = match command {
        "list" => ConsoleCommand::List,
        "status" => ConsoleCommand::Status(task_id(args.next())?),
        "stop" => ConsoleCommand::Stop(task_id(args.next())?),
        "cancel" => ConsoleCommand::Cancel(task_id(args.next())?),
        "exit" => ConsoleCommand::Exit,
        other => return Err(format!("Unknown command: {}. Please try again.", other)),
    };
    Ok(Some(parsed))
}

pub fn format_summary(summary: &TaskSummary) -> String {
    let pids = if summary.children.is_empty() {
        "NONE".to_string()
    } else {
        summary
            .children
            .iter()
            .map(|pid| pid.to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    let state = format!("{:?}", summary.state);
    format!(
        "{}\t {:<12} {:<10} {}  eta {:.3}h  pid {}",
        summary.id,
        summary.kind,
        state,
        summary.schedule_time.format("%Y-%m-%d %H:%M:%S"),
        summary.eta,
        pids
    )
}

fn request_report(sender: &Sender<SchedulerMessage>) -> Option<Vec<TaskSummary>> {
    let (reply, response) = bounded(1);
    sender.send(SchedulerMessage::Report(reply)).ok()?;
    response.recv().ok()
}

/// Reads operator commands from stdin and forwards them to the scheduler.
pub fn run_console(sender: Sender<SchedulerMessage>) {
    println!("Scheduler console started. Enter a command or 'exit' to quit.");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read console input: {}", e);
                break;
            }
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        let delivered = match command {
            ConsoleCommand::List => match request_report(&sender) {
                Some(summaries) if summaries.is_empty() => {
                    println!("No scheduled tasks");
                    true
                }
                Some(summaries) => {
                    println!("ID\t Type         State      Scheduled            ETA / PID");
                    println!("{}", "-".repeat(80));
                    for summary in &summaries {
                        println!("{}", format_summary(summary));
                    }
                    true
                }
                None => false,
            },
            ConsoleCommand::Status(id) => match request_report(&sender) {
                Some(summaries) => {
                    match summaries.iter().find(|summary| summary.id == id) {
                        Some(summary) => println!("Task {} status: {:?}", id, summary.state),
                        None => println!("Task {} not found", id),
                    }
                    true
                }
                None => false,
            },
            ConsoleCommand::Stop(id) => {
                let sent = sender.send(SchedulerMessage::Stop(id)).is_ok();
                println!("Sent stop signal for task {}", id);
                sent
            }
            ConsoleCommand::Cancel(id) => {
                let sent = sender.send(SchedulerMessage::Cancel(id)).is_ok();
                println!("Sent cancel signal for task {}", id);
                sent
            }
            ConsoleCommand::Exit => {
                println!("Exiting the scheduler...");
                let _ = sender.send(SchedulerMessage::Shutdown);
                return;
            }
        };
        if !delivered {
            debug!("scheduler loop is gone, closing console");
            return;
        }
    }
}

pub fn spawn_console(sender: Sender<SchedulerMessage>) -> thread::JoinHandle<()> {
    thread::spawn(move || run_console(sender))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::task::TaskState;
    use crate::worker::supervisor::ChildPid;

    #[test]
    fn parses_commands_with_ids() {
        assert_eq!(parse_command("list"), Ok(Some(ConsoleCommand::List)));
        assert_eq!(
            parse_command("  cancel 12 "),
            Ok(Some(ConsoleCommand::Cancel(TaskId(12))))
        );
        assert_eq!(parse_command("stop 3"), Ok(Some(ConsoleCommand::Stop(TaskId(3)))));
        assert_eq!(parse_command(""), Ok(None));
    }

    #[test]
    fn rejects_missing_or_malformed_ids() {
        assert_eq!(
            parse_command("stop"),
            Err("Task ID must be specified.".to_string())
        );
        assert_eq!(
            parse_command("status x1"),
            Err("Invalid task ID format.".to_string())
        );
        assert!(parse_command("launch 1").is_err());
    }

    #[test]
    fn summary_lists_pids() {
        let summary = TaskSummary {
            id: TaskId(4),
            kind: "maintenance",
            state: TaskState::Active,
            schedule_time: Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap(),
            eta: 0.5,
            children: vec![ChildPid(100), ChildPid(101)],
        };
        let line = format_summary(&summary);
        assert!(line.starts_with("4\t maintenance"));
        assert!(line.ends_with("pid 100,101"));
    }
}
