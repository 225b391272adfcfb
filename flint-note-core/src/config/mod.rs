//! Workspace configuration (`.flint-note/config.yml`).
//!
//! The YAML file itself is read by the binary crate (an external
//! collaborator); this module only owns the typed shape and its defaults,
//! mirroring how the rest of this codebase separates settings structs from
//! the file I/O that populates them.

mod deletion;
mod note_types;
mod search;

pub use deletion::DeletionSettings;
pub use note_types::NoteTypeSettings;
pub use search::SearchSettings;

use serde::{Deserialize, Serialize};

fn default_version() -> String {
    "1".to_string()
}

fn default_note_type() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for McpServerSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSettings {
    #[serde(default = "default_true")]
    pub auto_linking: bool,
    #[serde(default)]
    pub auto_tagging: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            auto_linking: true,
            auto_tagging: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    #[serde(default = "default_true")]
    pub restrict_to_workspace: bool,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            restrict_to_workspace: true,
            max_file_size: default_max_file_size(),
            allowed_extensions: vec!["md".to_string()],
        }
    }
}

/// Top-level configuration for a flint-note workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub workspace_root: Option<String>,
    #[serde(default = "default_note_type")]
    pub default_note_type: String,
    #[serde(default)]
    pub mcp_server: McpServerSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub note_types: NoteTypeSettings,
    #[serde(default)]
    pub features: FeatureSettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub deletion: DeletionSettings,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            default_note_type: default_note_type(),
            mcp_server: McpServerSettings::default(),
            search: SearchSettings::default(),
            note_types: NoteTypeSettings::default(),
            features: FeatureSettings::default(),
            security: SecuritySettings::default(),
            deletion: DeletionSettings::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WorkspaceConfig {
    /// Parse a `WorkspaceConfig` from YAML text, falling back to defaults
    /// for every absent field.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_yaml() {
        let config = WorkspaceConfig::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = WorkspaceConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.default_note_type, "general");
        assert!(parsed.search.index_enabled);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = WorkspaceConfig::from_yaml("version: \"1\"\n").unwrap();
        assert_eq!(config.deletion.max_bulk_delete, 50);
        assert!(config.deletion.require_confirmation);
    }
}
