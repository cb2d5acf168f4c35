//! Configuration loading for the knowledge base.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! Default config file lives at ~/.config/knowledge-base/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::KnowledgeError;

/// Points awarded by the additive relevance scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Per term per field when `exact_match` is set
    #[serde(default = "default_exact_match_points")]
    pub exact_match_points: f32,

    /// Per occurrence of a term in a field otherwise
    #[serde(default = "default_occurrence_points")]
    pub occurrence_points: f32,

    /// Per tag containing a term
    #[serde(default = "default_tag_points")]
    pub tag_points: f32,
}

fn default_exact_match_points() -> f32 {
    10.0
}

fn default_occurrence_points() -> f32 {
    5.0
}

fn default_tag_points() -> f32 {
    15.0
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            exact_match_points: default_exact_match_points(),
            occurrence_points: default_occurrence_points(),
            tag_points: default_tag_points(),
        }
    }
}

impl ScoringSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("exact_match_points", self.exact_match_points),
            ("occurrence_points", self.occurrence_points),
            ("tag_points", self.tag_points),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Snapshot file the CLI loads on startup
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Maximum entries kept in the recent-access log
    #[serde(default = "default_access_log_capacity")]
    pub access_log_capacity: usize,

    /// Entries returned by `recently_accessed`
    #[serde(default = "default_recent_access_limit")]
    pub recent_access_limit: usize,

    /// Highlights attached to each result
    #[serde(default = "default_max_highlights")]
    pub max_highlights: usize,

    #[serde(default)]
    pub scoring: ScoringSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_snapshot_path() -> String {
    ProjectDirs::from("", "", "knowledge-base")
        .map(|p| p.data_local_dir().join("snapshot.json"))
        .unwrap_or_else(|| PathBuf::from("./snapshot.json"))
        .to_string_lossy()
        .to_string()
}

fn default_access_log_capacity() -> usize {
    100
}

fn default_recent_access_limit() -> usize {
    10
}

fn default_max_highlights() -> usize {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            snapshot_path: default_snapshot_path(),
            access_log_capacity: default_access_log_capacity(),
            recent_access_limit: default_recent_access_limit(),
            max_highlights: default_max_highlights(),
            scoring: ScoringSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/knowledge-base/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (KB_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, KnowledgeError> {
        let config_dir = ProjectDirs::from("", "", "knowledge-base")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");
        let scoring = ScoringSettings::default();

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("snapshot_path", default_snapshot_path())
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("access_log_capacity", default_access_log_capacity() as i64)
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("recent_access_limit", default_recent_access_limit() as i64)
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("max_highlights", default_max_highlights() as i64)
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("scoring.exact_match_points", scoring.exact_match_points as f64)
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("scoring.occurrence_points", scoring.occurrence_points as f64)
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .set_default("scoring.tag_points", scoring.tag_points as f64)
            .map_err(|e| KnowledgeError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // KB_LOG_LEVEL, KB_SCORING__TAG_POINTS, ...
        builder = builder.add_source(
            Environment::with_prefix("KB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| KnowledgeError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| KnowledgeError::Config(e.to_string()))?;
        settings.validate().map_err(KnowledgeError::Config)?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_log_capacity == 0 {
            return Err("access_log_capacity must be greater than 0".to_string());
        }
        if self.recent_access_limit > self.access_log_capacity {
            return Err(format!(
                "recent_access_limit ({}) exceeds access_log_capacity ({})",
                self.recent_access_limit, self.access_log_capacity
            ));
        }
        self.scoring.validate()
    }

    /// Expand ~ in snapshot_path to the home directory
    pub fn expanded_snapshot_path(&self) -> PathBuf {
        if let Some(rest) = self.snapshot_path.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.snapshot_path)
    }
}
