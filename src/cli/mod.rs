//! Command-line interface components
//!
//! This module contains CLI-specific code for the url-cache binary:
//! argument parsing and the subcommand handlers.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, GlobalArgs, ImportArgs};
pub use commands::{
    handle_cat, handle_discard, handle_import, handle_remove, handle_resolve, handle_stats,
    handle_status, open_cache,
};
