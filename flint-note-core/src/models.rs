use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A note as stored on disk plus the metadata the engine derives for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(rename = "type")]
    pub note_type: String,
    pub title: String,
    pub filename: String,
    pub path: String,
    pub content: String,
    pub content_hash: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Lightweight projection of a note used in listings and search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub note_type: String,
    pub title: String,
    pub updated: DateTime<Utc>,
}

/// Description of a note type directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteTypeInfo {
    pub name: String,
    pub description: String,
    pub template: Option<String>,
    pub instructions: Option<String>,
    pub metadata_schema: Option<serde_json::Value>,
    pub note_count: usize,
}

/// A resolved or unresolved internal link between two notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkInfo {
    pub source_note_id: String,
    pub target_note_id: Option<String>,
    pub target_title: String,
    pub link_text: Option<String>,
    pub line_number: u32,
}

/// Kind of an external (non-wikilink) reference found in a note body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalLinkKind {
    Url,
    Image,
    Embed,
}

impl ExternalLinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalLinkKind::Url => "url",
            ExternalLinkKind::Image => "image",
            ExternalLinkKind::Embed => "embed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalLinkInfo {
    pub note_id: String,
    pub url: String,
    pub title: Option<String>,
    pub line_number: u32,
    pub link_type: ExternalLinkKind,
}
