//! url-cache CLI application
//!
//! Command-line interface for inspecting and filling a disk-backed URL
//! resource cache.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use url_cache::cli::{
    handle_cat, handle_discard, handle_import, handle_remove, handle_resolve, handle_stats,
    handle_status, open_cache, Cli, Commands,
};
use url_cache::config::AppConfig;
use url_cache::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    let config = AppConfig::load(cli.global.config.clone()).await?;

    // Initialize logging based on verbosity
    init_logging(&cli, &config);

    info!("url-cache v{} starting", env!("CARGO_PKG_VERSION"));

    let cache = open_cache(&cli.global, &config).await?;
    let (_, retriever_config) = config.to_runtime_config();

    // Execute the appropriate command
    match cli.command {
        Commands::Resolve { url } => handle_resolve(&cache, &url).await,
        Commands::Status { url } => handle_status(&cache, &url).await,
        Commands::Cat { url } => handle_cat(&cache, &url).await,
        Commands::Import(args) => handle_import(cache, retriever_config, args).await,
        Commands::Stats { json } => handle_stats(&cache, json).await,
        Commands::Discard { url } => handle_discard(&cache, &url).await,
        Commands::Remove { url } => handle_remove(&cache, &url).await,
    }
}

/// Initialize logging based on CLI verbosity settings
///
/// A verbosity flag wins over the configured level.
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.to_lowercase());

    // Create environment filter
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("url_cache={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    // Logs go to stderr so `cat` output stays clean
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
