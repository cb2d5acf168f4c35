//! Knowledge base CLI
//!
//! Searches and maintains knowledge base snapshot files.
//!
//! # Usage
//!
//! ```bash
//! kb search "asphalt tonnage" [--category ID] [--kind KIND] [--exact] [--limit N]
//! kb get ID
//! kb categories
//! kb stats
//! kb export [--output PATH]
//! kb merge FILE... [--output PATH]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/knowledge-base/config.toml)
//! 3. Environment variables (KB_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use knowledge_cli::{run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
