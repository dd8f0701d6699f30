use std::path::PathBuf;

use clap::{Parser, Subcommand};

const DEFAULT_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

#[derive(Parser, Debug)]
#[command(name = "clinic-catalog")]
#[command(about = "Clinic catalog backend (SQLite + xlsx bulk transfer)", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Write matching clinics to an .xlsx workbook.
    Export(ExportArgs),
    /// Load clinics from an .xlsx workbook.
    Import(ImportArgs),
    /// Print catalog totals and region/specialty counts as JSON.
    Stats(StatsArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Directory holding the catalog database.
    #[arg(long, env = "CLINIC_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8081)]
    pub port: u16,

    /// Requests sending this value in `x-api-key` may modify the catalog.
    #[arg(long, env = "CLINIC_ADMIN_KEY", hide_env_values = true)]
    pub admin_key: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(long, env = "CLINIC_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Output path; defaults to a timestamped file in the current directory.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Substring of the name, address or contact person.
    #[arg(long, default_value = "")]
    pub search: String,

    /// Exact region.
    #[arg(long, default_value = "")]
    pub region: String,

    /// Substring of the stored specialty list.
    #[arg(long, default_value = "")]
    pub specialty: String,

    /// Substring of the stored media item list.
    #[arg(long, default_value = "")]
    pub media_item: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    #[arg(long, env = "CLINIC_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Workbook to import (.xlsx).
    pub file: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct StatsArgs {
    #[arg(long, env = "CLINIC_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,
}
