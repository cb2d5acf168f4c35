use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use e2e_tests::{random_phrase, seed_random_corpus, CATEGORIES};
use knowledge_engine::RetrievalEngine;
use knowledge_types::SearchQuery;

const SMALL_CORPUS: usize = 250;
const MEDIUM_CORPUS: usize = 2_500;
const DEFAULT_ITERATIONS: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "search_bench", about = "Knowledge base search latency benchmark")]
struct Args {
    #[arg(long, value_enum, default_value = "small")]
    tier: CorpusTier,
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Write the report here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Serialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum CorpusTier {
    Small,
    Medium,
}

impl CorpusTier {
    /// Iterations of [`seed_random_corpus`]; each adds one entity per kind.
    fn rounds(&self) -> usize {
        match self {
            CorpusTier::Small => SMALL_CORPUS,
            CorpusTier::Medium => MEDIUM_CORPUS,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct StepMetrics {
    p50_ms: f64,
    p90_ms: f64,
    p99_ms: f64,
    samples: usize,
}

#[derive(Debug, Serialize)]
struct BenchmarkOutput {
    tier: CorpusTier,
    entities: usize,
    tokens: usize,
    iterations: usize,
    generated_at: String,
    steps: BTreeMap<String, StepMetrics>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("search_bench: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let engine = RetrievalEngine::new();
    let mut steps = BTreeMap::new();

    let started = Instant::now();
    seed_random_corpus(&engine, &mut rng, args.tier.rounds());
    steps.insert(
        "seed_corpus".to_string(),
        metrics(vec![elapsed_ms(started)]),
    );

    let queries: Vec<String> = (0..args.iterations)
        .map(|i| random_phrase(&mut rng, 1 + i % 3))
        .collect();

    steps.insert(
        "search".to_string(),
        time_each(&queries, |text| {
            engine.search(&SearchQuery::new(text));
        }),
    );
    steps.insert(
        "search_exact".to_string(),
        time_each(&queries, |text| {
            engine.search(&SearchQuery::new(text).with_exact_match(true));
        }),
    );
    steps.insert(
        "search_filtered".to_string(),
        time_each(&queries, |text| {
            let category = CATEGORIES[text.len() % CATEGORIES.len()];
            engine.search(&SearchQuery::new(text).with_category(category).with_limit(10));
        }),
    );

    let started = Instant::now();
    let snapshot = engine.export_snapshot();
    steps.insert("export".to_string(), metrics(vec![elapsed_ms(started)]));

    let started = Instant::now();
    RetrievalEngine::new().import_snapshot(snapshot)?;
    steps.insert("import".to_string(), metrics(vec![elapsed_ms(started)]));

    let stats = engine.stats();
    let output = BenchmarkOutput {
        tier: args.tier,
        entities: stats.total_entities(),
        tokens: stats.tokens,
        iterations: args.iterations,
        generated_at: Utc::now().to_rfc3339(),
        steps,
    };

    let json = serde_json::to_string_pretty(&output)?;
    match &args.out {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn time_each(queries: &[String], mut f: impl FnMut(&str)) -> StepMetrics {
    let samples = queries
        .iter()
        .map(|q| {
            let started = Instant::now();
            f(q);
            elapsed_ms(started)
        })
        .collect();
    metrics(samples)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn metrics(mut samples: Vec<f64>) -> StepMetrics {
    samples.sort_by(|a, b| a.total_cmp(b));
    StepMetrics {
        p50_ms: percentile(&samples, 0.50),
        p90_ms: percentile(&samples, 0.90),
        p99_ms: percentile(&samples, 0.99),
        samples: samples.len(),
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}
