//! End-to-end test infrastructure for the knowledge base.
//!
//! Provides a shared TestHarness and corpus helpers for E2E tests covering
//! the full add-to-search pipeline.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::Rng;

use knowledge_engine::{EngineEvent, RetrievalEngine};
use knowledge_types::{
    Category, FormulaVariable, NewCalculation, NewDataset, NewDocument, NewFormula,
};

/// Paving vocabulary used by generated corpora.
pub const VOCABULARY: &[&str] = &[
    "asphalt", "sealcoat", "crack", "striping", "aggregate", "base", "binder", "compaction",
    "drainage", "grade", "overlay", "milling", "patch", "primer", "slurry", "subgrade",
    "tack", "thermoplastic", "curb", "gutter", "parking", "lot", "driveway", "roller",
    "paver", "emulsion", "coverage", "tonnage", "thickness", "density",
];

/// Categories generated entities are spread across.
pub const CATEGORIES: &[&str] = &["calculations", "specifications", "regulations", "pricing"];

/// Shared test harness for E2E tests.
///
/// Owns an engine with an observer that records every event, plus a temp
/// directory for snapshot files.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub engine: Arc<RetrievalEngine>,
    /// Every event the engine emitted, in order
    pub events: Arc<Mutex<Vec<EngineEvent>>>,
    /// Path for snapshot files
    pub snapshot_path: PathBuf,
}

impl TestHarness {
    /// Create a new test harness with an empty engine.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let snapshot_path = temp_dir.path().join("snapshot.json");

        let engine = Arc::new(RetrievalEngine::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        engine.subscribe_fn(move |event| {
            sink.lock().expect("event sink poisoned").push(event.clone());
        });

        Self {
            _temp_dir: temp_dir,
            engine,
            events,
            snapshot_path,
        }
    }

    /// Copy of the recorded events.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().expect("event sink poisoned").clone()
    }

    /// Register every category in [`CATEGORIES`].
    pub fn seed_categories(&self) {
        for id in CATEGORIES {
            self.engine
                .add_category(Category::new(*id, id.to_uppercase()))
                .expect("Failed to add category");
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The formula from the asphalt tonnage scenario.
pub fn asphalt_tonnage_formula() -> NewFormula {
    NewFormula::new(
        "Asphalt Tonnage Calculation",
        "Calculate the amount of asphalt needed for a paving project based on area and depth",
        "calculations",
    )
    .with_expression("T = A * D * 110 / 2000")
    .with_variable(FormulaVariable::new("A", "Area in square feet").with_unit("sq ft"))
    .with_variable(FormulaVariable::new("D", "Compacted depth in inches").with_unit("in"))
    .with_tags(["paving", "estimating"])
}

/// A sealcoat specification whose content has more than three sentences
/// mentioning "tolerance".
pub fn sealcoat_specification() -> NewDocument {
    NewDocument::new(
        "Sealcoat Application Specification",
        "Surface preparation and application requirements",
        "specifications",
    )
    .with_content(
        "Clean the surface before application. \
         Surface tolerance: ±0.02 feet from grade. \
         Tolerance is verified with a 10 foot straightedge. \
         Areas outside tolerance must be patched. \
         Record every tolerance reading in the daily log. \
         Apply two coats at 0.15 gallons per square yard.",
    )
    .with_tags(["sealcoat", "specification"])
}

/// `count` random words from [`VOCABULARY`], space separated.
pub fn random_phrase(rng: &mut StdRng, count: usize) -> String {
    (0..count)
        .map(|_| VOCABULARY[rng.random_range(0..VOCABULARY.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn phrase_of_length(rng: &mut StdRng, words: std::ops::Range<usize>) -> String {
    let count = rng.random_range(words);
    random_phrase(rng, count)
}

fn random_category(rng: &mut StdRng) -> &'static str {
    CATEGORIES[rng.random_range(0..CATEGORIES.len())]
}

/// Add `count` random entities of every kind; returns the generated ids.
pub fn seed_random_corpus(engine: &RetrievalEngine, rng: &mut StdRng, count: usize) -> Vec<String> {
    let mut ids = Vec::with_capacity(count * 4);
    for _ in 0..count {
        let name = phrase_of_length(rng, 2..4);
        let description = phrase_of_length(rng, 5..10);
        let tag = random_phrase(rng, 1);
        ids.push(
            engine
                .add_formula(
                    NewFormula::new(name, description, random_category(rng)).with_tags([tag]),
                )
                .expect("Failed to add formula"),
        );

        let name = phrase_of_length(rng, 2..4);
        let description = phrase_of_length(rng, 5..10);
        ids.push(
            engine
                .add_calculation(NewCalculation::new(name, description, random_category(rng)))
                .expect("Failed to add calculation"),
        );

        let title = phrase_of_length(rng, 2..4);
        let description = phrase_of_length(rng, 5..10);
        let content = format!(
            "{}. {}.",
            random_phrase(rng, 8),
            random_phrase(rng, 8)
        );
        ids.push(
            engine
                .add_document(
                    NewDocument::new(title, description, random_category(rng))
                        .with_content(content),
                )
                .expect("Failed to add document"),
        );

        let name = phrase_of_length(rng, 2..4);
        let description = phrase_of_length(rng, 5..10);
        ids.push(
            engine
                .add_dataset(NewDataset::new(name, description, random_category(rng)))
                .expect("Failed to add dataset"),
        );
    }
    ids
}
