use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::TaskError;
use crate::models::kind::TaskKind;
use crate::worker::supervisor::ChildPid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Waiting,
    Active,
    Stopped,
    Cancelled,
    Error,
    Finished,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Stopped | TaskState::Cancelled | TaskState::Error | TaskState::Finished
        )
    }
}

/// Everything the submitting side knows about a task before it is scheduled.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub submit_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp")]
    pub schedule_time: DateTime<Utc>,
    /// Hours.
    pub max_run_time: f64,
    /// Hours; negative cancels a missed window, positive defers it.
    #[serde(default)]
    pub alt_period: f64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub comment: String,
}

/// Accepts both a native TOML datetime and an RFC 3339 string. Either form
/// must carry an offset.
fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    parse_timestamp(toml::Value::deserialize(deserializer)?)
}

fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Option::<toml::Value>::deserialize(deserializer)?
        .map(parse_timestamp)
        .transpose()
}

fn parse_timestamp<E: serde::de::Error>(value: toml::Value) -> Result<DateTime<Utc>, E> {
    let raw = match value {
        toml::Value::Datetime(datetime) => datetime.to_string(),
        toml::Value::String(raw) => raw,
        other => {
            return Err(E::custom(format!(
                "expected a datetime, found {}",
                other.type_str()
            )))
        }
    };
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| E::custom(format!("invalid datetime {:?}: {}", raw, e)))
}

#[derive(Debug)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) kind: TaskKind,
    pub(crate) state: TaskState,
    pub(crate) submit_time: DateTime<Utc>,
    pub(crate) schedule_time: DateTime<Utc>,
    pub(crate) start_time: Option<DateTime<Utc>>,
    pub(crate) max_run_time: f64,
    pub(crate) elapsed_time: f64,
    pub(crate) alt_period: f64,
    pub(crate) priority: i32,
    pub(crate) user: String,
    pub(crate) comment: String,
    pub(crate) data_file: Option<String>,
    pub(crate) data_path: Option<PathBuf>,
    pub(crate) children: Vec<ChildPid>,
    pub(crate) last_error: Option<TaskError>,
}

/// Snapshot of a task for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub id: TaskId,
    pub kind: &'static str,
    pub state: TaskState,
    pub schedule_time: DateTime<Utc>,
    pub eta: f64,
    pub children: Vec<ChildPid>,
}

impl Task {
    pub(crate) fn new(id: TaskId, spec: TaskSpec, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: spec.kind,
            state: TaskState::Waiting,
            submit_time: spec.submit_time.unwrap_or(now),
            schedule_time: spec.schedule_time,
            start_time: None,
            max_run_time: spec.max_run_time,
            elapsed_time: 0.0,
            alt_period: spec.alt_period,
            priority: spec.priority,
            user: spec.user,
            comment: spec.comment,
            data_file: None,
            data_path: None,
            children: vec![],
            last_error: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn submit_time(&self) -> DateTime<Utc> {
        self.submit_time
    }

    pub fn schedule_time(&self) -> DateTime<Utc> {
        self.schedule_time
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn max_run_time(&self) -> f64 {
        self.max_run_time
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn alt_period(&self) -> f64 {
        self.alt_period
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn data_file(&self) -> Option<&str> {
        self.data_file.as_deref()
    }

    pub fn data_path(&self) -> Option<&PathBuf> {
        self.data_path.as_ref()
    }

    pub fn children(&self) -> &[ChildPid] {
        &self.children
    }

    pub fn last_error(&self) -> Option<&TaskError> {
        self.last_error.as_ref()
    }

    /// Remaining hours while live, zero once the task has settled.
    pub fn eta(&self) -> f64 {
        if self.state.is_terminal() {
            return 0.0;
        }
        self.max_run_time - self.elapsed_time
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            kind: self.kind.label(),
            state: self.state,
            schedule_time: self.schedule_time,
            eta: self.eta(),
            children: self.children.clone(),
        }
    }
}
