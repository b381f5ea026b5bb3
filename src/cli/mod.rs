//! CLI module - Command-line interface for searchgate
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};

/// searchgate - per-user search gateway for chat inline queries
#[derive(Parser)]
#[command(name = "searchgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API with periodic cache maintenance
    #[command(alias = "daemon", alias = "-d", alias = "--daemon")]
    Serve,

    /// Resolve one inline query as a user and print the items
    #[command(alias = "s")]
    Search {
        /// User to resolve the query for
        #[arg(long)]
        user: i64,
        /// Query text
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Show or change a user's preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Validate a provider API key with a canary query and store it
    Token {
        /// User the key belongs to
        user: i64,
        /// Google API key
        key: String,
    },

    /// Result cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

#[derive(Subcommand)]
pub enum PrefsCommands {
    /// Print current preferences
    Show {
        /// User ID
        user: i64,
    },
    /// Update one or more preferences
    Set {
        /// User ID
        user: i64,
        /// Show result thumbnails
        #[arg(long, value_enum)]
        thumbnails: Option<Toggle>,
        /// Number of results (1-10)
        #[arg(long)]
        limit: Option<i64>,
        /// Two-letter region code, or "none" to clear
        #[arg(long)]
        locale: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Delete expired cache entries
    Purge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        toggle == Toggle::On
    }
}

pub use commands::*;
