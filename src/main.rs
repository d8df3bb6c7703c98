use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::unbounded;
use log::info;
use tracing_subscriber::EnvFilter;

use ratsche::{
    app::cli,
    config::{self, SchedulerConfig},
    Scheduler,
};

/// Radio telescope task scheduler.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML scheduler configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Leave once every submitted task has settled.
    #[arg(long)]
    exit_when_idle: bool,

    /// Do not read operator commands from stdin.
    #[arg(long)]
    no_console: bool,

    /// TOML file of `[[task]]` entries to submit at startup.
    tasks: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };

    let mut scheduler = Scheduler::with_system(config);
    if let Some(path) = &args.tasks {
        let specs = config::load_task_file(path)
            .with_context(|| format!("loading tasks {}", path.display()))?;
        for spec in specs {
            scheduler.submit(spec);
        }
    }

    let (sender, receiver) = unbounded();
    if !args.no_console {
        cli::spawn_console(sender);
    } else {
        drop(sender);
    }

    scheduler.run(&receiver, args.exit_when_idle);
    info!("scheduler stopped");
    Ok(())
}
