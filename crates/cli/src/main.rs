//! Biblio command line
//!
//! Batch stages, each reading and writing JSON artifacts in the data folder:
//!
//! - `fetch-papers`: search the bibliographic API
//! - `generate-translations`: abstracts and titles in one language
//! - `fetch-references`: outgoing citations, with a resumable disk cache
//! - `generate-clusters`: embeddings, projection, density clusters, labels
//! - `generate-threat-scores`: expert-panel judgments per cluster
//! - `generate-graph`: the rendered citation graph between clusters
//! - `pipeline`: every stage in order

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::{error, info};

use biblio_common::{AppConfig, AppError, VERSION};

mod commands;
mod services;
mod telemetry;

use commands::Commands;
use services::Services;

/// Research-axis citation graph pipeline
#[derive(Parser)]
#[command(name = "biblio")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (layered config/ files and APP__ variables otherwise)
    #[arg(long, global = true, env = "BIBLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Data folder holding every artifact
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig, AppError> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(&path.to_string_lossy())?,
            None => AppConfig::load()?,
        };
        if let Some(folder) = &self.data_dir {
            config.data.folder = folder.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(e.exit_code());
        }
    };

    telemetry::init(&config.observability, cli.verbose);
    info!(version = VERSION, data = %config.data.folder.display(), "Starting biblio");

    let services = Services::new(config);
    if let Err(err) = commands::run(&cli.command, &services).await {
        error!(error = %format!("{err:#}"), "Stage failed");
        std::process::exit(commands::exit_code(&err));
    }
}
