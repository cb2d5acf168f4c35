//! Knowledge base entities.
//!
//! Four content kinds share a common retrieval shape (id, category, tags,
//! primary text fields) exposed through the [`Searchable`] trait. Kind-specific
//! fields are carried along but are opaque to scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::{check_inputs, check_variables, require_text};
use crate::error::KnowledgeError;

/// The four indexed content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Formula,
    Calculation,
    Document,
    Dataset,
}

impl EntityKind {
    /// Every kind, in the order results and snapshots enumerate them.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Formula,
        EntityKind::Calculation,
        EntityKind::Document,
        EntityKind::Dataset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Formula => "formula",
            EntityKind::Calculation => "calculation",
            EntityKind::Document => "document",
            EntityKind::Dataset => "dataset",
        }
    }

    /// Parse from string, returning None for unknown kinds.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "formula" => Some(EntityKind::Formula),
            "calculation" | "calculator" => Some(EntityKind::Calculation),
            "document" => Some(EntityKind::Document),
            "dataset" => Some(EntityKind::Dataset),
            _ => None,
        }
    }

    /// Prefix used for generated ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Formula => "fml",
            EntityKind::Calculation => "calc",
            EntityKind::Document => "doc",
            EntityKind::Dataset => "ds",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown entity kind: {}", s))
    }
}

/// Names of the primary text fields reported in search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryField {
    Name,
    Title,
    Description,
    Content,
}

impl PrimaryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryField::Name => "name",
            PrimaryField::Title => "title",
            PrimaryField::Description => "description",
            PrimaryField::Content => "content",
        }
    }
}

impl std::fmt::Display for PrimaryField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping shared by every entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Number of times the entity was fetched through the engine
    #[serde(default)]
    pub access_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl EntityMeta {
    /// Fresh metadata stamped with the given creation time and zeroed counters.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            access_count: 0,
            last_accessed: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Retrieval view over an entity.
///
/// Everything the indexer, scorer and highlighter need is reachable from
/// here; nothing else about an entity is interpreted.
pub trait Searchable {
    fn id(&self) -> &str;
    fn kind(&self) -> EntityKind;
    fn category(&self) -> &str;
    fn tags(&self) -> &[String];
    fn author(&self) -> Option<&str>;
    fn industry(&self) -> Option<&str>;
    fn meta(&self) -> &EntityMeta;
    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Name/title, description and (for documents) content, in that order.
    /// Fields that are absent are omitted.
    fn primary_fields(&self) -> Vec<(PrimaryField, &str)>;

    /// Extra text that is indexed but not scored.
    fn indexed_extras(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Long-form body used for highlight extraction.
    fn long_text(&self) -> Option<&str> {
        None
    }
}

/// A named input of a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaVariable {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl FormulaVariable {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// An engineering formula such as asphalt tonnage or sealcoat coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formula {
    pub id: String,
    pub name: String,
    pub description: String,

    /// Human-readable expression, e.g. `T = A * D * 110 / 2000`
    pub expression: String,

    #[serde(default)]
    pub variables: Vec<FormulaVariable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_unit: Option<String>,

    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(flatten)]
    pub meta: EntityMeta,
}

/// One input of a calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationInput {
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<f64>,
}

/// A calculator definition.
///
/// `logic` is stored verbatim and never evaluated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculation {
    pub id: String,
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

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(flatten)]
    pub meta: EntityMeta,
}

/// Publication state of a document. Callers mask documents through this
/// rather than deleting them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

/// A long-form document: specification, procedure, regulation, guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Free-form document type ("specification", "procedure", ...)
    #[serde(default)]
    pub document_type: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub status: DocumentStatus,

    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// Average rating on a 0-5 scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    #[serde(default)]
    pub rating_count: u32,

    #[serde(flatten)]
    pub meta: EntityMeta,
}

impl Document {
    /// Fold a new rating into the running average.
    pub fn add_rating(&mut self, rating: f32) {
        let total = self.rating.unwrap_or(0.0) * self.rating_count as f32 + rating;
        self.rating_count = self.rating_count.saturating_add(1);
        self.rating = Some(total / self.rating_count as f32);
    }
}

/// A tabular dataset (material prices, historical job costs, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
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

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(flatten)]
    pub meta: EntityMeta,
}

/// Visibility of a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Public,
    Internal,
    Restricted,
}

/// A category is filter vocabulary only; it is never free-text searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_category: Option<String>,

    #[serde(default)]
    pub subcategories: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default)]
    pub access_level: AccessLevel,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            parent_category: None,
            subcategories: Vec::new(),
            icon: None,
            color: None,
            access_level: AccessLevel::Public,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_category = Some(parent.into());
        self
    }

    pub fn with_access_level(mut self, level: AccessLevel) -> Self {
        self.access_level = level;
        self
    }
}

/// Kind-specific hooks behind the shared [`Searchable`] implementation.
trait KindSpecific {
    fn body(&self) -> Option<&str> {
        None
    }

    fn extras(&self) -> Vec<&str> {
        Vec::new()
    }
}

impl KindSpecific for Formula {
    fn extras(&self) -> Vec<&str> {
        self.variables
            .iter()
            .flat_map(|v| [v.name.as_str(), v.description.as_str()])
            .collect()
    }
}

impl KindSpecific for Calculation {}

impl KindSpecific for Document {
    fn body(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

impl KindSpecific for Dataset {}

macro_rules! impl_searchable {
    ($ty:ty, $kind:expr, $name_field:ident => $name_tag:expr) => {
        impl Searchable for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn kind(&self) -> EntityKind {
                $kind
            }

            fn category(&self) -> &str {
                &self.category
            }

            fn tags(&self) -> &[String] {
                &self.tags
            }

            fn author(&self) -> Option<&str> {
                self.author.as_deref()
            }

            fn industry(&self) -> Option<&str> {
                self.industry.as_deref()
            }

            fn meta(&self) -> &EntityMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut EntityMeta {
                &mut self.meta
            }

            fn primary_fields(&self) -> Vec<(PrimaryField, &str)> {
                let mut fields = vec![
                    ($name_tag, self.$name_field.as_str()),
                    (PrimaryField::Description, self.description.as_str()),
                ];
                if let Some(body) = self.body() {
                    fields.push((PrimaryField::Content, body));
                }
                fields
            }

            fn indexed_extras(&self) -> Vec<&str> {
                self.extras()
            }

            fn long_text(&self) -> Option<&str> {
                self.body()
            }
        }
    };
}

impl_searchable!(Formula, EntityKind::Formula, name => PrimaryField::Name);
impl_searchable!(Calculation, EntityKind::Calculation, name => PrimaryField::Name);
impl_searchable!(Document, EntityKind::Document, title => PrimaryField::Title);
impl_searchable!(Dataset, EntityKind::Dataset, name => PrimaryField::Name);

/// Any indexed entity, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum Entity {
    Formula(Formula),
    Calculation(Calculation),
    Document(Document),
    Dataset(Dataset),
}

impl Entity {
    fn inner(&self) -> &dyn Searchable {
        match self {
            Entity::Formula(e) => e,
            Entity::Calculation(e) => e,
            Entity::Document(e) => e,
            Entity::Dataset(e) => e,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Searchable {
        match self {
            Entity::Formula(e) => e,
            Entity::Calculation(e) => e,
            Entity::Document(e) => e,
            Entity::Dataset(e) => e,
        }
    }

    /// The field rules drafts are held to, plus a non-empty id.
    pub fn validate(&self) -> Result<(), KnowledgeError> {
        let kind = self.kind().as_str();
        require_text(kind, "id", self.id())?;
        for (field, text) in self.primary_fields().into_iter().take(2) {
            require_text(kind, field.as_str(), text)?;
        }
        require_text(kind, "category", self.category())?;
        match self {
            Entity::Formula(f) => check_variables(&f.variables),
            Entity::Calculation(c) => check_inputs(&c.inputs),
            Entity::Document(_) | Entity::Dataset(_) => Ok(()),
        }
    }

    pub fn as_formula(&self) -> Option<&Formula> {
        match self {
            Entity::Formula(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_calculation(&self) -> Option<&Calculation> {
        match self {
            Entity::Calculation(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Entity::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Entity::Dataset(d) => Some(d),
            _ => None,
        }
    }
}

impl Searchable for Entity {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn kind(&self) -> EntityKind {
        self.inner().kind()
    }

    fn category(&self) -> &str {
        self.inner().category()
    }

    fn tags(&self) -> &[String] {
        self.inner().tags()
    }

    fn author(&self) -> Option<&str> {
        self.inner().author()
    }

    fn industry(&self) -> Option<&str> {
        self.inner().industry()
    }

    fn meta(&self) -> &EntityMeta {
        self.inner().meta()
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        self.inner_mut().meta_mut()
    }

    fn primary_fields(&self) -> Vec<(PrimaryField, &str)> {
        self.inner().primary_fields()
    }

    fn indexed_extras(&self) -> Vec<&str> {
        self.inner().indexed_extras()
    }

    fn long_text(&self) -> Option<&str> {
        self.inner().long_text()
    }
}

impl From<Formula> for Entity {
    fn from(f: Formula) -> Self {
        Entity::Formula(f)
    }
}

impl From<Calculation> for Entity {
    fn from(c: Calculation) -> Self {
        Entity::Calculation(c)
    }
}

impl From<Document> for Entity {
    fn from(d: Document) -> Self {
        Entity::Document(d)
    }
}

impl From<Dataset> for Entity {
    fn from(d: Dataset) -> Self {
        Entity::Dataset(d)
    }
}
