//! CLI module - Command-line interface for knowbase
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// knowbase - Knowledge base search aggregator
/// Searches Stack Overflow and Reddit, caching combined results
#[derive(Parser)]
#[command(name = "knowbase")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API with the cache purge scheduler
    #[command(alias = "daemon")]
    Serve,

    /// Search all providers and print the combined results
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Search and email the combined results
    Email {
        /// Recipient address
        to: String,
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Create default config file
    Init,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Delete expired cache entries now
    Purge,
}

pub use commands::*;
