#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the relay snapshot ingestion tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use relay_metrics_database::{db, run_migrations};
use relay_metrics_ingest::store::PgStore;
use relay_metrics_ingest::{ingest_directory, ingest_snapshot};
use relay_metrics_ingest_models::IngestOutcome;

#[derive(Parser)]
#[command(name = "relay_metrics_ingest", about = "Relay snapshot ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Ingest a single snapshot file
    Ingest {
        /// Path to a `<prefix>-YYYY-MM-DD.csv` snapshot file
        file: PathBuf,
    },
    /// Ingest every snapshot file in a directory, in sorted order
    IngestDir {
        /// Directory to scan for snapshot files
        dir: PathBuf,
    },
}

fn report(outcome: &IngestOutcome) {
    match outcome {
        IngestOutcome::Completed {
            date,
            num_imported,
            num_skipped,
        } => println!("{date}: imported {num_imported} relays, skipped {num_skipped} lines"),
        IngestOutcome::AlreadyIngested { date } => {
            println!("{date}: already ingested, nothing to do");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            log::info!("Running database migrations...");
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;
            log::info!("Migrations complete.");
        }
        Commands::Ingest { file } => {
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;
            let store = PgStore::new(db);

            let outcome = ingest_snapshot(&store, &store, &store, &file).await?;
            report(&outcome);
        }
        Commands::IngestDir { dir } => {
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;
            let store = PgStore::new(db);

            let outcomes = ingest_directory(&store, &store, &store, &dir).await?;
            for outcome in &outcomes {
                report(outcome);
            }

            let imported = outcomes.iter().filter(|o| !o.is_no_op()).count();
            let skipped = outcomes.len() - imported;
            log::info!(
                "Directory ingest complete: {imported} file(s) ingested, {skipped} already done"
            );
        }
    }

    Ok(())
}
