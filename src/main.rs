use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use imessage_search::config::AppConfig;
use imessage_search::logging::init_logging;
use imessage_search::query::format_results;
use imessage_search::service::{source_schema, IndexService};
use imessage_search::{BulkReport, ChatDatabase, ElasticsearchClient};

// Rejections listed individually before the summary line
const MAX_LISTED_FAILURES: usize = 20;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every message from the database into the search index
    Index {
        /// Path of chat.db (preferably a copy)
        #[arg(short, long)]
        db: Option<PathBuf>,

        /// Target index name
        #[arg(short, long)]
        index: Option<String>,

        /// Legacy document type sent with each document
        #[arg(long)]
        doc_type: Option<String>,

        /// Timezone for rendered timestamps (UTC, local, +09:00, Europe/Berlin)
        #[arg(short, long)]
        timezone: Option<String>,

        /// Read the database in place instead of from a temporary copy
        #[arg(long)]
        no_snapshot: bool,
    },
    /// Search indexed messages
    Search {
        /// Search term
        term: String,

        /// Index to search
        #[arg(short, long)]
        index: Option<String>,

        /// Document field to match against
        #[arg(short, long)]
        field: Option<String>,

        /// Number of hits to return
        #[arg(short, long)]
        size: Option<u64>,
    },
    /// Print the columns of the message and handle tables
    Schema {
        /// Path of chat.db (preferably a copy)
        #[arg(short, long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli.command);
    config.validate()?;

    // Initialize logging
    let _log_guard = init_logging(
        Some(&config.logging.level),
        config.logging.format == "json",
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting imessage-search");

    match &cli.command {
        Commands::Index { .. } => index_database(&config).await,
        Commands::Search { term, .. } => search_messages(&config, term).await,
        Commands::Schema { .. } => print_schema(&config),
    }
}

/// Fold command-line flags into the loaded configuration
fn apply_overrides(config: &mut AppConfig, command: &Commands) {
    match command {
        Commands::Index {
            db,
            index,
            doc_type,
            timezone,
            no_snapshot,
        } => {
            if let Some(db) = db {
                config.source.database_path = db.display().to_string();
            }
            if let Some(index) = index {
                config.search.index.clone_from(index);
            }
            if doc_type.is_some() {
                config.search.doc_type.clone_from(doc_type);
            }
            if let Some(timezone) = timezone {
                config.timestamp.timezone.clone_from(timezone);
            }
            if *no_snapshot {
                config.source.snapshot = false;
            }
        },
        Commands::Search { index, field, size, .. } => {
            if let Some(index) = index {
                config.search.index.clone_from(index);
            }
            if let Some(field) = field {
                config.search.query_field.clone_from(field);
            }
            if size.is_some() {
                config.search.page_size = *size;
            }
        },
        Commands::Schema { db } => {
            if let Some(db) = db {
                config.source.database_path = db.display().to_string();
            }
        },
    }
}

fn service(config: &AppConfig) -> Result<IndexService<ElasticsearchClient>> {
    let client = ElasticsearchClient::new(&config.search.url, config.request_timeout())
        .context("Failed to create search backend client")?;
    Ok(IndexService::new(client, config.index_options()?).refresh_after_index(config.search.refresh_after_index))
}

/// Load the source database and bulk-index every message
async fn index_database(config: &AppConfig) -> Result<ExitCode> {
    let database = ChatDatabase::open(Path::new(&config.source.database_path), config.source.snapshot)
        .context("Failed to open source database")?;
    let service = service(config)?;

    info!(
        url = %config.search.url,
        index = %config.search.index,
        timezone = %config.timestamp.timezone,
        "Indexing messages"
    );
    let report = service.index_database(&database).await.context("Indexing failed")?;

    Ok(report_outcome(&report))
}

fn report_outcome(report: &BulkReport) -> ExitCode {
    for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
        warn!(
            rowid = failure.message_rowid,
            status = failure.status,
            reason = %failure.reason,
            "Document rejected"
        );
    }
    if report.failed() > MAX_LISTED_FAILURES {
        warn!("{} more rejected documents not listed", report.failed() - MAX_LISTED_FAILURES);
    }

    if report.is_complete() {
        info!(indexed = report.succeeded, unresolved_handles = report.unresolved_handles, "All messages indexed");
        ExitCode::SUCCESS
    } else {
        error!(
            indexed = report.succeeded,
            failed = report.failed(),
            submitted = report.submitted,
            "Some messages were not indexed"
        );
        ExitCode::FAILURE
    }
}

/// Run a match query and print the hits
#[allow(clippy::print_stdout)]
async fn search_messages(config: &AppConfig, term: &str) -> Result<ExitCode> {
    let service = service(config)?;
    let response = service
        .search(&config.search.query_field, term, config.search.page_size)
        .await
        .context("Search failed")?;

    print!("{}", format_results(&response));
    Ok(ExitCode::SUCCESS)
}

/// Print the discovered table layouts
#[allow(clippy::print_stdout)]
fn print_schema(config: &AppConfig) -> Result<ExitCode> {
    let database = ChatDatabase::open(Path::new(&config.source.database_path), config.source.snapshot)
        .context("Failed to open source database")?;

    for (table, columns) in source_schema(&database)? {
        if columns.is_empty() {
            println!("{table}: (missing)");
        } else {
            println!("{table}: {}", columns.join(", "));
        }
    }
    Ok(ExitCode::SUCCESS)
}
