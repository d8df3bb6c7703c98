use crossbeam_channel::Sender;

use super::task::{TaskId, TaskSpec, TaskSummary};

#[derive(Debug)]
pub enum SchedulerMessage {
    Submit(TaskSpec),
    Stop(TaskId),
    Cancel(TaskId),
    Report(Sender<Vec<TaskSummary>>),
    Shutdown,
}
