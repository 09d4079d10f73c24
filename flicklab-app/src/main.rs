mod device;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use flicklab_experiment::{Paradigm, SessionConfig};

use crate::device::{FilePort, IdleSource, NullPort, SerialLineSource};
use crate::session::Session;

/// Behavioral session runner for the flicker rig.
#[derive(Debug, Parser)]
#[command(name = "flicklab", version, about)]
struct Args {
    /// Session config file (JSON); defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which experiment composition to run.
    #[arg(long, value_enum, default_value = "go-nogo")]
    paradigm: ParadigmArg,

    /// Device node commands are written to.
    #[arg(long)]
    port: Option<PathBuf>,

    /// Device node event lines are read from.
    #[arg(long)]
    events: Option<PathBuf>,

    /// Rehearse without hardware: discard commands, read no events.
    #[arg(long)]
    dry_run: bool,

    /// Directory session files are written into.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Label prefixed to the session files.
    #[arg(long, default_value = "session")]
    label: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ParadigmArg {
    GoNogo,
    GoNogoPostpone,
    LickTraining,
    IntervalChoice,
}

impl From<ParadigmArg> for Paradigm {
    fn from(arg: ParadigmArg) -> Paradigm {
        match arg {
            ParadigmArg::GoNogo => Paradigm::GoNogo,
            ParadigmArg::GoNogoPostpone => Paradigm::GoNogoPostpone,
            ParadigmArg::LickTraining => Paradigm::LickTraining,
            ParadigmArg::IntervalChoice => Paradigm::IntervalChoice,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SessionConfig::default(),
    };

    let session = Session {
        paradigm: args.paradigm.into(),
        config,
        data_dir: args.data_dir,
        label: args.label,
    };

    println!("=== FLICKLAB SESSION ===");
    println!("Paradigm: {:?}", session.paradigm);
    println!("Trials: {}", session.config.number_of_trial);

    if args.dry_run {
        session.run(NullPort, IdleSource)?;
    } else {
        let port_path = args.port.context("--port is required unless --dry-run")?;
        let events_path = args.events.context("--events is required unless --dry-run")?;
        let port = FilePort::open(&port_path)
            .with_context(|| format!("opening {}", port_path.display()))?;
        let source = SerialLineSource::open(&events_path)
            .with_context(|| format!("opening {}", events_path.display()))?;
        session.run(port, source)?;
    }

    Ok(())
}
