mod access;
mod analytics;
mod catalog;
mod cli;
mod commands;
mod export;
mod filter;
mod import;
mod model;
mod server;
mod service;
mod storage;

use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = cli::Args::parse();

    match args.cmd {
        cli::Command::Serve(cmd) => server::run(cmd).await.context("serve failed"),
        cli::Command::Export(cmd) => commands::export(cmd).map(|_| ()).context("export failed"),
        cli::Command::Import(cmd) => commands::import(cmd).context("import failed"),
        cli::Command::Stats(cmd) => commands::stats(cmd).context("stats failed"),
    }
}
