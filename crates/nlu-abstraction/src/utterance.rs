use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An utterance with its intent and entity mentions.
///
/// Used both as training input and as the normalized shape of a prediction.
/// Predictions may come back without an intent, so `intent` is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledUtterance {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
}

impl LabeledUtterance {
    pub fn new(text: impl Into<String>, intent: Option<String>, entities: Vec<Entity>) -> Self {
        Self { text: text.into(), intent, entities }
    }
}

/// An entity mention inside an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Name of the entity type this mention belongs to.
    pub entity_type: String,
    /// Resolved value, when the provider or the author supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_value: Option<Value>,
    /// Literal text of the mention within the utterance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_text: Option<String>,
    /// Zero-based occurrence of `match_text` in the utterance.
    #[serde(default)]
    pub match_index: usize,
}

impl Entity {
    pub fn new(
        entity_type: impl Into<String>,
        entity_value: Option<Value>,
        match_text: Option<String>,
        match_index: usize,
    ) -> Self {
        Self { entity_type: entity_type.into(), entity_value, match_text, match_index }
    }
}

/// Definition of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    #[serde(flatten)]
    pub kind: EntityTypeKind,
}

impl EntityType {
    pub fn new(name: impl Into<String>, kind: EntityTypeKind) -> Self {
        Self { name: name.into(), kind }
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, EntityTypeKind::Simple)
    }

    pub fn builtin(name: impl Into<String>, builtin_id: impl Into<String>) -> Self {
        Self::new(name, EntityTypeKind::Builtin { builtin_id: builtin_id.into() })
    }

    pub fn list(name: impl Into<String>, values: Vec<SynonymSet>) -> Self {
        Self::new(name, EntityTypeKind::List { values })
    }
}

/// Kind of an entity type, serialized as the `kind` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntityTypeKind {
    /// Machine-learned entity with no fixed values.
    Simple,
    /// A provider prebuilt type, e.g. `AMAZON.NUMBER` or `number`.
    #[serde(rename_all = "camelCase")]
    Builtin { builtin_id: String },
    /// Closed list of canonical values with synonyms.
    List { values: Vec<SynonymSet> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymSet {
    pub canonical_form: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl SynonymSet {
    pub fn new(canonical_form: impl Into<String>, synonyms: Vec<String>) -> Self {
        Self { canonical_form: canonical_form.into(), synonyms }
    }
}
