use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::task::TaskSpec;

/// Settings shared by every task of one scheduler instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Directory receiving the data files; relative file names when unset.
    pub data_path: Option<PathBuf>,
    /// Directory the measurement programs are run from (`cd <path> && ...`).
    pub executable_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub kill_retry_delay_ms: u64,
    pub kill_max_attempts: u32,
    pub maintenance_margin_secs: f64,
    pub mount: MountConfig,
}

/// How the mount control primitives are invoked.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub port: u16,
    pub device: String,
    pub wait_timeout: u32,
    pub settle_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            executable_path: None,
            poll_interval_ms: 1000,
            kill_retry_delay_ms: 10,
            kill_max_attempts: 500,
            maintenance_margin_secs: 0.25,
            mount: MountConfig::default(),
        }
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            port: 7624,
            device: "Pi Radiotelescope".to_string(),
            wait_timeout: 100,
            settle_delay_ms: 400,
        }
    }
}

impl SchedulerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn kill_retry_delay(&self) -> Duration {
        Duration::from_millis(self.kill_retry_delay_ms)
    }
}

impl MountConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Deserialize)]
struct TaskFile {
    #[serde(default, rename = "task")]
    tasks: Vec<TaskSpec>,
}

/// Reads a list of `[[task]]` entries.
pub fn load_task_file(path: &Path) -> Result<Vec<TaskSpec>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_task_file(&raw)
}

pub fn parse_task_file(raw: &str) -> Result<Vec<TaskSpec>, ConfigError> {
    let file: TaskFile = toml::from_str(raw)?;
    Ok(file.tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SchedulerConfig::from_toml_str("").unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.kill_max_attempts, 500);
        assert_eq!(config.mount.port, 7624);
        assert_eq!(config.mount.device, "Pi Radiotelescope");
        assert!(config.data_path.is_none());
    }

    #[test]
    fn partial_mount_table_keeps_other_defaults() {
        let config = SchedulerConfig::from_toml_str(
            r#"
            data_path = "/var/lib/rt"
            [mount]
            settle_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.data_path, Some(PathBuf::from("/var/lib/rt")));
        assert_eq!(config.mount.settle_delay(), Duration::ZERO);
        assert_eq!(config.mount.wait_timeout, 100);
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(matches!(
            SchedulerConfig::from_toml_str("poll_interval_ms = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn task_file_lists_tagged_entries() {
        let tasks = parse_task_file(
            r#"
            [[task]]
            type = "park"
            schedule_time = "2024-06-01T05:00:00Z"
            max_run_time = 0.25

            [[task]]
            type = "goto_equ"
            target = { ra = 5.58, dec = 22.01 }
            schedule_time = 2024-06-01T21:00:00Z
            max_run_time = 0.1
            alt_period = 24
            "#,
        )
        .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].kind, crate::models::kind::TaskKind::Park);
        assert_eq!(tasks[1].alt_period, 24.0);
        assert!(parse_task_file("").unwrap().is_empty());
    }
}
