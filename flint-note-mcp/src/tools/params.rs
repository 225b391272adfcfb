//! Typed argument shapes for every tool, validated by `rmcp` against the
//! `JsonSchema` derived for each struct before a handler ever sees them.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateNoteParams {
    pub note_type: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
    /// When set, render the note type's template before writing.
    #[serde(default)]
    pub use_template: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetNoteParams {
    pub identifier: String,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetNotesParams {
    pub ids: Vec<String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateNoteParams {
    pub identifier: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
    pub content_hash: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenameNoteParams {
    pub identifier: String,
    pub new_title: String,
    pub content_hash: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MoveNoteParams {
    pub identifier: String,
    pub new_type: String,
    pub content_hash: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteNoteParams {
    pub identifier: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BulkDeleteNotesParams {
    #[serde(default)]
    pub note_type: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateNoteTypeParams {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub metadata_schema: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateNoteTypeParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub metadata_schema: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoteTypeNameParams {
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListNoteTypesParams {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteNoteTypeParams {
    pub name: String,
    /// One of `"error"`, `"migrate"`, `"delete"`.
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchNotesParams {
    pub query: String,
    #[serde(default)]
    pub note_type: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MetadataFilterParam {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchNotesAdvancedParams {
    #[serde(default)]
    pub note_type: Option<String>,
    #[serde(default)]
    pub content_contains: Option<String>,
    #[serde(default)]
    pub metadata_filters: Vec<MetadataFilterParam>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_descending: bool,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchNotesSqlParams {
    pub query: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LinkNotesParams {
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub relationship: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoteIdParams {
    pub identifier: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindBrokenLinksParams {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchByLinksParams {
    #[serde(default)]
    pub has_links_to: Vec<String>,
    #[serde(default)]
    pub linked_from: Vec<String>,
    #[serde(default)]
    pub external_domains: Vec<String>,
    #[serde(default)]
    pub broken_links: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MigrateLinksParams {
    #[serde(default)]
    pub force: bool,
}
