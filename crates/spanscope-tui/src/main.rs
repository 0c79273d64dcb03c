mod app;
mod cli;
mod dump;
mod terminal;
mod ui;

use clap::Parser;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use spanscope::TraceFilter;
use spanscope_store::{load_json_file, load_seed_data, TraceStore};

use crate::cli::{Cli, Commands, SourceArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::View {
            source,
            render,
            log_file,
            trace_id,
        } => {
            // The terminal belongs to the UI, so logs go to a file.
            init_file_logging(&log_file)?;
            let store = open_store(&source)?;
            terminal::run(store, render.into(), trace_id).await
        }
        Commands::Dump {
            source,
            render,
            trace_id,
            mode,
            expand_all,
        } => {
            init_stderr_logging();
            let store = open_store(&source)?;
            let output = dump::dump(store, render.into(), trace_id, mode.into(), expand_all).await?;
            print!("{output}");
            Ok(())
        }
        Commands::List {
            source,
            filter,
            json,
        } => {
            init_stderr_logging();
            let store = open_store(&source)?;
            let summaries = store.list_traces(&TraceFilter::from(filter));
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                print!("{}", dump::trace_table(&summaries));
            }
            Ok(())
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_file_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("cannot open log file {}: {e}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Build the store and fill it from the requested sources
fn open_store(source: &SourceArgs) -> anyhow::Result<Arc<TraceStore>> {
    if source.file.is_none() && !source.seed {
        anyhow::bail!("nothing to show: pass --file <traces.json> or --seed");
    }

    let store = TraceStore::new(source.store_config());
    if source.seed {
        load_seed_data(&store);
    }
    if let Some(path) = &source.file {
        for payload in load_json_file(path)? {
            store.insert_payload(payload);
        }
    }
    Ok(store)
}
