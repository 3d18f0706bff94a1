//! ctigraph CLI - turn threat reports into knowledge graph triples.

use clap::Parser;
use ctigraph_cli::commands;
use ctigraph_cli::config::load_ontology;
use ctigraph_cli::{Cli, Command, Config, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> ctigraph_cli::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let ontology = load_ontology(cli.ontology.as_deref())?;

    let format = cli.format.map(Into::into).unwrap_or(config.output.format);
    let color_enabled = !cli.no_color && config.output.color;
    let formatter = Formatter::new(format, color_enabled);

    // First Ctrl-C stops between units and keeps partial results
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current unit");
            flag.store(true, Ordering::SeqCst);
        }
    });

    match cli.command {
        Command::Prefilter(args) => {
            commands::execute_prefilter(args, &config, ontology, &formatter)?;
        }
        Command::Extract(args) => {
            commands::execute_extract(args, &config, ontology, &formatter, &cancel).await?;
        }
        Command::Scan(args) => {
            commands::execute_scan(args, &config, ontology, &formatter, &cancel).await?;
        }
        Command::Validate(args) => {
            commands::execute_validate(args, &config, ontology, &formatter)?;
        }
        Command::Select(args) => {
            commands::execute_select(args, &config, ontology, &formatter)?;
        }
    }

    Ok(())
}
