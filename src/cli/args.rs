//! Command-line argument parsing for the URL cache
//!
//! This module defines the CLI structure using clap derive macros. Every
//! subcommand works on one cache root and addresses resources by URL.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::app::CachePolicy;

/// url-cache - Inspect and fill a disk-backed URL cache
#[derive(Parser, Debug)]
#[command(
    name = "url-cache",
    version,
    about = "Inspect and fill a disk-backed URL resource cache",
    long_about = "Maps URLs onto a hashed directory tree with resumable partial downloads,
per-file locking and content-type tracking."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show where a URL is stored
    Resolve {
        #[arg(value_name = "URL")]
        url: Url,
    },

    /// Show the cache state of a URL
    Status {
        #[arg(value_name = "URL")]
        url: Url,
    },

    /// Write a cached resource to stdout
    Cat {
        #[arg(value_name = "URL")]
        url: Url,
    },

    /// Store a local file as the resource of a URL
    Import(ImportArgs),

    /// Show cache statistics
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the partial download of a URL
    Discard {
        #[arg(value_name = "URL")]
        url: Url,
    },

    /// Delete everything cached for a URL
    Remove {
        #[arg(value_name = "URL")]
        url: Url,
    },
}

/// Arguments for the import command
#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// URL to store the file under
    #[arg(value_name = "URL")]
    pub url: Url,

    /// File providing the bytes
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Content type to record (inferred from the file name if omitted)
    #[arg(long, value_name = "TYPE")]
    pub content_type: Option<String>,

    /// Modification time to record, RFC 3339 (the file's own if omitted)
    #[arg(long, value_name = "TIME", value_parser = parse_timestamp)]
    pub last_modified: Option<DateTime<Utc>>,

    /// Cache policy (overrides the configuration file)
    #[arg(long, value_enum)]
    pub policy: Option<CachePolicy>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    ///
    /// `None` when no flag was given, leaving the configured level in charge.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("url-cache").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_import_args() {
        let parsed = cli(&[
            "import",
            "http://example.org/wms?request=GetMap",
            "map.png",
            "--content-type",
            "image/png",
            "--last-modified",
            "2021-03-04T05:06:07Z",
            "--policy",
            "prefer-cache",
        ]);

        let Commands::Import(args) = parsed.command else {
            panic!("expected import");
        };
        assert_eq!(args.url.as_str(), "http://example.org/wms?request=GetMap");
        assert_eq!(args.file, PathBuf::from("map.png"));
        assert_eq!(args.content_type.as_deref(), Some("image/png"));
        assert_eq!(
            args.last_modified,
            Some(Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap())
        );
        assert_eq!(args.policy, Some(CachePolicy::PreferCache));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = Cli::try_parse_from(["url-cache", "status", "not a url"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let parsed = cli(&["stats", "--cache-dir", "/tmp/tiles", "-v"]);
        assert!(matches!(parsed.command, Commands::Stats { json: false }));
        assert_eq!(parsed.global.cache_dir, Some(PathBuf::from("/tmp/tiles")));
        assert!(parsed.global.verbose);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(cli(&["-q", "stats"]).log_level(), Some(tracing::Level::ERROR));
        assert_eq!(cli(&["-v", "stats"]).log_level(), Some(tracing::Level::INFO));
        assert_eq!(
            cli(&["--very-verbose", "stats"]).log_level(),
            Some(tracing::Level::DEBUG)
        );
        assert_eq!(cli(&["stats"]).log_level(), None);
    }
}
