use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("spawn returned invalid pid {0}")]
    InvalidPid(i32),
    #[error("waitpid failed for pid {pid}: {source}")]
    Wait { pid: i32, source: std::io::Error },
    #[error("process group {pid} still alive after {attempts} kill attempts")]
    TerminationTimedOut { pid: i32, attempts: u32 },
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("data file i/o error on {path}: {source}")]
    HeaderWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
