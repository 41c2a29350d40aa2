//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! ```
//! use clap::Parser;
//! use profile_search::commands::{Cli, Commands};
//!
//! let cli = Cli::parse_from(["psearch", "search", "young", "doctors", "--limit", "3"]);
//! match cli.command {
//!     Commands::Search { query, search, .. } => {
//!         assert_eq!(query.join(" "), "young doctors");
//!         assert_eq!(search.limit, 3);
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::search::{DEFAULT_LIMIT, DEFAULT_NUM_CANDIDATES, SearchOptions};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Auto)]
pub struct Cli {
    /// YAML file with settings; environment variables take precedence.
    #[arg(long, short = 'c', global = true, env = "PSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Tuning shared by the search subcommands.
#[derive(Args, Debug, Clone, Copy)]
pub struct SearchArgs {
    /// Number of profiles to return.
    #[arg(long, short = 'l', default_value_t = DEFAULT_LIMIT, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// Size of the candidate pool the vector index considers.
    #[arg(long, short = 'n', default_value_t = DEFAULT_NUM_CANDIDATES, value_parser = clap::value_parser!(u32).range(1..))]
    pub num_candidates: u32,
}

impl From<SearchArgs> for SearchOptions {
    fn from(args: SearchArgs) -> Self {
        SearchOptions::new(args.num_candidates, args.limit)
    }
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the configuration, then print a summary.
    Check,

    /// Add embeddings to every record that does not have one yet.
    Backfill,

    /// Run a single search and print the matching profiles.
    #[clap(name = "search", alias = "s")]
    Search {
        /// Free-text description of the customers to look for.
        query: Vec<String>,

        #[command(flatten)]
        search: SearchArgs,

        /// Print the rows as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Prompt for searches until `exit`.
    #[clap(name = "interactive", alias = "i")]
    Interactive {
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Write a template config.yaml into the configuration directory.
    Init,
}
