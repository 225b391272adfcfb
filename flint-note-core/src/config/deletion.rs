use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionSettings {
    #[serde(default = "default_true")]
    pub require_confirmation: bool,
    #[serde(default = "default_true")]
    pub create_backups: bool,
    #[serde(default = "default_backup_path")]
    pub backup_path: String,
    #[serde(default)]
    pub allow_note_type_deletion: bool,
    #[serde(default = "default_max_bulk_delete")]
    pub max_bulk_delete: usize,
}

fn default_true() -> bool {
    true
}

fn default_backup_path() -> String {
    ".flint-note/backups".to_string()
}

fn default_max_bulk_delete() -> usize {
    50
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            create_backups: true,
            backup_path: default_backup_path(),
            allow_note_type_deletion: false,
            max_bulk_delete: default_max_bulk_delete(),
        }
    }
}
