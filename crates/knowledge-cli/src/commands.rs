//! Command implementations for the knowledge base CLI.
//!
//! Every command loads the configured snapshot into a fresh engine, works on
//! it, and writes a snapshot back only when the command changes content.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use knowledge_engine::RetrievalEngine;
use knowledge_types::{EntityKind, SearchResult, Searchable, Settings};
use tracing::{info, warn};

use crate::cli::{Cli, Commands, SearchArgs};

/// Load settings, apply CLI overrides, initialize logging and dispatch.
pub fn run(cli: Cli) -> Result<()> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    if let Some(snapshot) = &cli.snapshot {
        settings.snapshot_path = snapshot.clone();
    }

    init_logging(&settings)?;

    let snapshot_path = settings.expanded_snapshot_path();
    let engine = load_engine(&settings, &snapshot_path)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Search(args) => search(&engine, &args, &mut out),
        Commands::Get { id, kind } => get(&engine, &id, kind, &mut out),
        Commands::Categories => categories(&engine, &mut out),
        Commands::Stats => stats(&engine, &mut out),
        Commands::Export { output } => match output {
            Some(path) => write_snapshot(&engine, Path::new(&path)),
            None => {
                writeln!(out, "{}", engine.export_json()?)?;
                Ok(())
            }
        },
        Commands::Merge { inputs, output } => {
            let total = merge(&engine, &inputs)?;
            let target = output.map(Into::into).unwrap_or(snapshot_path);
            write_snapshot(&engine, &target)?;
            writeln!(out, "Merged {} entities into {}", total, target.display())?;
            Ok(())
        }
    }
}

fn init_logging(settings: &Settings) -> Result<()> {
    // Logs go to stderr so command output stays pipeable.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Engine holding the snapshot at `path`, or an empty engine if there is none.
pub fn load_engine(settings: &Settings, path: &Path) -> Result<RetrievalEngine> {
    let engine = RetrievalEngine::with_settings(settings);

    if !path.exists() {
        warn!(path = %path.display(), "No snapshot found, starting empty");
        return Ok(engine);
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let count = engine
        .import_json(&json)
        .with_context(|| format!("Failed to import snapshot {}", path.display()))?;
    info!(path = %path.display(), entities = count, "Loaded snapshot");
    Ok(engine)
}

/// Write the engine's contents as a snapshot, creating parent directories.
pub fn write_snapshot(engine: &RetrievalEngine, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
    }
    let json = engine.export_json()?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote snapshot");
    Ok(())
}

fn merge(engine: &RetrievalEngine, inputs: &[String]) -> Result<usize> {
    let mut total = 0;
    for input in inputs {
        let json =
            fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?;
        total += engine
            .import_json(&json)
            .with_context(|| format!("Failed to merge {}", input))?;
    }
    Ok(total)
}

fn search(engine: &RetrievalEngine, args: &SearchArgs, out: &mut impl Write) -> Result<()> {
    let results = engine.search(&args.to_query());

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&results)?)?;
        return Ok(());
    }

    if results.is_empty() {
        writeln!(out, "No results for {:?}", args.text)?;
        return Ok(());
    }

    for result in &results {
        write_result(result, out)?;
    }
    Ok(())
}

fn write_result(result: &SearchResult, out: &mut impl Write) -> Result<()> {
    let heading = result
        .entity
        .primary_fields()
        .first()
        .map(|(_, text)| text.to_string())
        .unwrap_or_default();
    let fields: Vec<&str> = result.matched_fields.iter().map(|f| f.as_str()).collect();

    writeln!(
        out,
        "{:>6.1}  {:<11} {}  {}",
        result.relevance_score,
        result.kind.as_str(),
        result.id(),
        heading
    )?;
    if !fields.is_empty() {
        writeln!(out, "        matched: {}", fields.join(", "))?;
    }
    for highlight in &result.highlights {
        writeln!(out, "        > {}", highlight)?;
    }
    Ok(())
}

fn get(
    engine: &RetrievalEngine,
    id: &str,
    kind: Option<EntityKind>,
    out: &mut impl Write,
) -> Result<()> {
    let entity = match kind {
        Some(kind) => engine.get(kind, id),
        None => engine.find(id),
    }
    .with_context(|| format!("No entity with id {}", id))?;

    writeln!(out, "{}", serde_json::to_string_pretty(&entity)?)?;
    Ok(())
}

fn categories(engine: &RetrievalEngine, out: &mut impl Write) -> Result<()> {
    let categories = engine.list_categories();
    if categories.is_empty() {
        writeln!(out, "No categories")?;
        return Ok(());
    }
    for category in categories {
        match &category.parent_category {
            Some(parent) => writeln!(out, "{:<20} {} (in {})", category.id, category.name, parent)?,
            None => writeln!(out, "{:<20} {}", category.id, category.name)?,
        }
    }
    Ok(())
}

fn stats(engine: &RetrievalEngine, out: &mut impl Write) -> Result<()> {
    let stats = engine.stats();
    for (kind, count) in &stats.entities {
        writeln!(out, "{:<12} {}", kind.as_str(), count)?;
    }
    writeln!(out, "{:<12} {}", "categories", stats.categories)?;
    writeln!(out, "{:<12} {}", "tokens", stats.tokens)?;
    writeln!(out, "{:<12} {}", "postings", stats.postings)?;
    Ok(())
}
