use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use publications::apiclient::ApiClient;
use publications::config::LoggingConfig;
use publications::importer::{ImportError, Importer};

#[derive(Parser, Debug)]
#[command(
    name = "publications-importer",
    version,
    about = "Imports publishers and their publications through a running publications API",
    after_help = "Example: publications-importer --url http://publications:8080 publications.json"
)]
struct Args {
    /// Base URL of the publications API, e.g. http://publications-api:8080
    #[arg(long)]
    url: String,

    /// JSON file with the entries to import
    file: PathBuf,
}

async fn run(args: Args) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Path '{}' cannot be read", args.file.display()))?;
    let client = ApiClient::new(&args.url)?;
    let importer = Importer::new(Arc::new(client));

    match importer.run(&bytes).await {
        Ok(summary) => {
            println!(
                "Imported {} publishers and {} publications from {} entries",
                summary.publishers, summary.publications, summary.entries
            );
            Ok(())
        }
        Err(ImportError::Failed(failures)) => {
            for failure in &failures {
                println!("{failure}");
            }
            Err(ImportError::Failed(failures).into())
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    publications::logging::init(&LoggingConfig {
        level: "warn".to_string(),
        ..LoggingConfig::default()
    });

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error running import: {e:#}");
            ExitCode::FAILURE
        }
    }
}
