//! Versioned export of the whole knowledge base.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Calculation, Category, Dataset, Document, Formula};
use crate::error::KnowledgeError;

/// Current snapshot format version.
pub const FORMAT_VERSION: &str = "1.0";

/// Serializable backup of every category and entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub formulas: Vec<Formula>,
    #[serde(default)]
    pub calculations: Vec<Calculation>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    pub exported_at: DateTime<Utc>,
    pub format_version: String,
}

impl Snapshot {
    /// Empty snapshot stamped with the current time and format version.
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
            formulas: Vec::new(),
            calculations: Vec::new(),
            documents: Vec::new(),
            datasets: Vec::new(),
            exported_at: Utc::now(),
            format_version: FORMAT_VERSION.to_string(),
        }
    }

    /// Number of entities (categories excluded).
    pub fn entity_count(&self) -> usize {
        self.formulas.len() + self.calculations.len() + self.documents.len() + self.datasets.len()
    }

    /// Accept any `1.x` format.
    pub fn check_version(&self) -> Result<(), KnowledgeError> {
        let major = self.format_version.split('.').next().unwrap_or_default();
        if major != "1" {
            return Err(KnowledgeError::Import(format!(
                "unsupported snapshot format version: {}",
                self.format_version
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, KnowledgeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot. Malformed input is reported as an import error.
    pub fn from_json(json: &str) -> Result<Self, KnowledgeError> {
        serde_json::from_str(json)
            .map_err(|e| KnowledgeError::Import(format!("malformed snapshot: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::NewDocument;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::empty();
        assert_eq!(snapshot.entity_count(), 0);
        assert_eq!(snapshot.format_version, FORMAT_VERSION);
        assert!(snapshot.check_version().is_ok());
    }

    #[test]
    fn test_snapshot_json_uses_camel_case_keys() {
        let mut snapshot = Snapshot::empty();
        snapshot.documents.push(
            NewDocument::new("Spec", "Surface tolerances", "specifications")
                .into_document("doc-1".to_string(), Utc::now()),
        );

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"exportedAt\""));
        assert!(json.contains("\"formatVersion\""));

        let decoded = Snapshot::from_json(&json).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.entity_count(), 1);
    }

    #[test]
    fn test_missing_kind_lists_default_to_empty() {
        let json = r#"{"exportedAt":"2024-05-01T00:00:00Z","formatVersion":"1.2"}"#;
        let snapshot = Snapshot::from_json(json).unwrap();
        assert!(snapshot.formulas.is_empty());
        assert!(snapshot.check_version().is_ok());
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut snapshot = Snapshot::empty();
        snapshot.format_version = "2.0".to_string();
        let err = snapshot.check_version().unwrap_err();
        assert!(matches!(err, KnowledgeError::Import(_)));
    }

    #[test]
    fn test_malformed_json_is_import_error() {
        let err = Snapshot::from_json("{ not json").unwrap_err();
        assert!(matches!(err, KnowledgeError::Import(_)));
    }
}
