use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteTypeSettings {
    #[serde(default = "default_true")]
    pub auto_create_directories: bool,
    #[serde(default)]
    pub require_descriptions: bool,
    #[serde(default = "default_true")]
    pub allow_custom_templates: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NoteTypeSettings {
    fn default() -> Self {
        Self {
            auto_create_directories: true,
            require_descriptions: false,
            allow_custom_templates: true,
        }
    }
}
