//! Task scheduling and subprocess supervision for a robotic radio telescope.
//!
//! Tasks are polled cooperatively; at most one may be active at a time.
//! An active task runs an external program as its own session so that the
//! program and everything it starts can be killed as one process group.

pub mod app;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod time;
pub mod worker;

pub use config::{MountConfig, SchedulerConfig};
pub use error::{ConfigError, SupervisorError, TaskError};
pub use manager::{registry::Registry, scheduler::Scheduler};
pub use models::{
    kind::{EquCoords, HorCoords, TaskKind},
    message::SchedulerMessage,
    task::{Task, TaskId, TaskSpec, TaskState, TaskSummary},
};
pub use time::{Clock, ManualClock, SystemClock};
pub use worker::supervisor::{ChildPid, ProcessSupervisor, Supervisor};
