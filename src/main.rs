use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pubmed_fetcher::config::{find_config_file, load_config, Config};
use pubmed_fetcher::fetch::{EntrezFetcher, PaperFetcher};
use pubmed_fetcher::store::FileStore;
use pubmed_fetcher::{export, router, AppState};

/// PubMed Fetcher - search, retrieve, and export PubMed paper metadata
#[derive(Parser, Debug)]
#[command(name = "pubmed-fetcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search, retrieve, and export PubMed paper metadata", long_about = None)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Override the bind address
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch papers for a query and write them to a CSV file
    Search {
        /// Search query for PubMed
        query: String,

        /// Output CSV file path
        #[arg(short, long)]
        file: PathBuf,

        /// Maximum number of results
        #[arg(long)]
        max_results: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("pubmed_fetcher={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from file if specified or found in default locations
    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        Config::default()
    };

    if config.entrez.email.is_empty() {
        tracing::warn!(
            "no contact email configured; set [entrez] email or ENTREZ_EMAIL per the NCBI usage policy"
        );
    }

    let timeout = Duration::from_secs(config.fetch.timeout_secs);
    let fetcher = EntrezFetcher::new(&config.entrez, timeout)?;

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    match command {
        Commands::Search {
            query,
            file,
            max_results,
        } => {
            let max_results = max_results.unwrap_or(config.fetch.max_results);
            let papers = fetcher.fetch(&query, max_results).await;

            if papers.is_empty() {
                println!("No papers found.");
                return Ok(());
            }

            let csv = export::to_csv(&papers)?;
            fs::write(&file, csv)
                .with_context(|| format!("failed to write {}", file.display()))?;
            println!("Papers saved to '{}'", file.display());
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let store = FileStore::new(&config.storage.snapshot_path, &config.storage.csv_path);
            let state = AppState::new(
                Arc::new(fetcher),
                Arc::new(store),
                config.fetch.max_results,
            );
            let app = router(state);

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {}", addr))?;
            tracing::info!("listening on http://{}", addr);

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
