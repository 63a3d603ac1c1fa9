use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dirwatch::{sink::Stdout, EventFilter, EventKind, WatchHandle};
use tracing_subscriber::EnvFilter;

/// Print every change made to the entries of a directory.
#[derive(Debug, Parser)]
#[command(name = "dirwatch", version)]
struct Args {
    /// Directory to watch
    #[arg(env = "DIRWATCH_DIR")]
    directory: PathBuf,

    /// Kinds of change to report
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Kind::Created, Kind::Modified, Kind::Deleted]
    )]
    kinds: Vec<Kind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Created,
    Modified,
    Deleted,
}

impl From<Kind> for EventKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Created => EventKind::Created,
            Kind::Modified => EventKind::Modified,
            Kind::Deleted => EventKind::Deleted,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let kinds: EventFilter = args.kinds.iter().copied().map(EventKind::from).collect();

    let watch = WatchHandle::builder()
        .kinds(kinds)
        .watch(&args.directory, Stdout)
        .with_context(|| format!("could not watch {}", args.directory.display()))?;

    let stop = watch.handle();
    let observer = watch.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    watch.join().await.context("watcher stopped unexpectedly")?;

    if !observer.is_stop_requested() {
        anyhow::bail!("watcher stopped without being asked to (standard output closed)");
    }

    println!("Stopping thread");

    Ok(())
}
