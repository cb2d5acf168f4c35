//! Drafts for new entities and patches for existing ones.
//!
//! A draft is an entity without id or bookkeeping. The engine validates it,
//! assigns an id and stamps the metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{
    Calculation, CalculationInput, Dataset, Document, DocumentStatus, EntityMeta, Formula,
    FormulaVariable,
};
use crate::error::KnowledgeError;

pub(crate) fn require_text(entity: &str, field: &str, value: &str) -> Result<(), KnowledgeError> {
    if value.trim().is_empty() {
        return Err(KnowledgeError::Validation(format!(
            "{} {} must not be empty",
            entity, field
        )));
    }
    Ok(())
}

pub(crate) fn check_variables(variables: &[FormulaVariable]) -> Result<(), KnowledgeError> {
    for variable in variables {
        require_text("formula variable", "name", &variable.name)?;
    }
    Ok(())
}

pub(crate) fn check_inputs(inputs: &[CalculationInput]) -> Result<(), KnowledgeError> {
    for input in inputs {
        require_text("calculation input", "name", &input.name)?;
    }
    Ok(())
}

/// Input for `add_formula`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFormula {
    pub name: String,
    pub description: String,
    pub expression: String,
    #[serde(default)]
    pub variables: Vec<FormulaVariable>,
    #[serde(default)]
    pub result_unit: Option<String>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl NewFormula {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    pub fn with_variable(mut self, variable: FormulaVariable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Validate required text fields.
    pub fn validate(&self) -> Result<(), KnowledgeError> {
        require_text("formula", "name", &self.name)?;
        require_text("formula", "description", &self.description)?;
        require_text("formula", "category", &self.category)?;
        check_variables(&self.variables)
    }

    pub fn into_formula(self, id: String, now: DateTime<Utc>) -> Formula {
        Formula {
            id,
            name: self.name,
            description: self.description,
            expression: self.expression,
            variables: self.variables,
            result_unit: self.result_unit,
            category: self.category,
            tags: self.tags,
            author: self.author,
            industry: self.industry,
            meta: EntityMeta::new(now),
        }
    }
}

/// Input for `add_calculation`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCalculation {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<CalculationInput>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub logic: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl NewCalculation {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), KnowledgeError> {
        require_text("calculation", "name", &self.name)?;
        require_text("calculation", "description", &self.description)?;
        require_text("calculation", "category", &self.category)?;
        check_inputs(&self.inputs)
    }

    pub fn into_calculation(self, id: String, now: DateTime<Utc>) -> Calculation {
        Calculation {
            id,
            name: self.name,
            description: self.description,
            inputs: self.inputs,
            outputs: self.outputs,
            logic: self.logic,
            category: self.category,
            tags: self.tags,
            author: self.author,
            industry: self.industry,
            meta: EntityMeta::new(now),
        }
    }
}

/// Input for `add_document`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: DocumentStatus,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl NewDocument {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn validate(&self) -> Result<(), KnowledgeError> {
        require_text("document", "title", &self.title)?;
        require_text("document", "description", &self.description)?;
        require_text("document", "category", &self.category)?;
        Ok(())
    }

    pub fn into_document(self, id: String, now: DateTime<Utc>) -> Document {
        Document {
            id,
            title: self.title,
            description: self.description,
            content: self.content,
            document_type: self.document_type,
            version: if self.version.is_empty() {
                "1.0".to_string()
            } else {
                self.version
            },
            status: self.status,
            category: self.category,
            tags: self.tags,
            author: self.author,
            industry: self.industry,
            rating: None,
            rating_count: 0,
            meta: EntityMeta::new(now),
        }
    }
}

/// Input for `add_dataset`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDataset {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub record_count: u64,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl NewDataset {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), KnowledgeError> {
        require_text("dataset", "name", &self.name)?;
        require_text("dataset", "description", &self.description)?;
        require_text("dataset", "category", &self.category)?;
        Ok(())
    }

    pub fn into_dataset(self, id: String, now: DateTime<Utc>) -> Dataset {
        Dataset {
            id,
            name: self.name,
            description: self.description,
            source: self.source,
            format: self.format,
            fields: self.fields,
            record_count: self.record_count,
            category: self.category,
            tags: self.tags,
            author: self.author,
            industry: self.industry,
            meta: EntityMeta::new(now),
        }
    }
}

/// Partial update of a document. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<DocumentStatus>,
    pub version: Option<String>,
}

impl DocumentPatch {
    /// Whether applying the patch changes indexed text.
    pub fn touches_text(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.content.is_some()
            || self.tags.is_some()
    }

    pub fn validate(&self) -> Result<(), KnowledgeError> {
        if let Some(title) = &self.title {
            require_text("document", "title", title)?;
        }
        if let Some(description) = &self.description {
            require_text("document", "description", description)?;
        }
        Ok(())
    }

    pub fn apply(self, document: &mut Document) {
        if let Some(title) = self.title {
            document.title = title;
        }
        if let Some(description) = self.description {
            document.description = description;
        }
        if let Some(content) = self.content {
            document.content = Some(content);
        }
        if let Some(tags) = self.tags {
            document.tags = tags;
        }
        if let Some(status) = self.status {
            document.status = status;
        }
        if let Some(version) = self.version {
            document.version = version;
        }
        document.meta.touch();
    }
}
