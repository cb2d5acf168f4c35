//! CLI argument parsing for the knowledge base tool.
//!
//! CLI flags override all other config sources.

use clap::{Args, Parser, Subcommand};
use knowledge_types::{EntityKind, SearchQuery};

/// Knowledge base CLI
///
/// Search and maintain knowledge base snapshots.
#[derive(Parser, Debug)]
#[command(name = "kb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/knowledge-base/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Snapshot file to load (overrides snapshot_path from config)
    #[arg(short, long, global = true)]
    pub snapshot: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Knowledge base commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ranked free-text search
    Search(SearchArgs),

    /// Show one entity by id
    Get {
        /// Entity id
        id: String,

        /// Restrict the lookup to one kind
        #[arg(short, long)]
        kind: Option<EntityKind>,
    },

    /// List categories
    Categories,

    /// Entity, index and access-log counts
    Stats,

    /// Write the loaded knowledge base as a fresh snapshot
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import snapshot files on top of the loaded knowledge base
    Merge {
        /// Snapshot files, applied in order
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output file (defaults to the loaded snapshot path)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Search arguments
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search text
    pub text: String,

    /// Category id filter
    #[arg(long)]
    pub category: Option<String>,

    /// Entity kind filter (formula, calculation, document, dataset)
    #[arg(short, long)]
    pub kind: Option<EntityKind>,

    /// Tag filter, repeatable; any match passes
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub industry: Option<String>,

    /// Score each term once per field
    #[arg(short, long)]
    pub exact: bool,

    /// Maximum results
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub fn to_query(&self) -> SearchQuery {
        let mut query = SearchQuery::new(self.text.clone())
            .with_tags(self.tags.iter().cloned())
            .with_exact_match(self.exact);
        query.category = self.category.clone();
        query.kind = self.kind;
        query.author = self.author.clone();
        query.industry = self.industry.clone();
        query.limit = self.limit;
        query
    }
}
