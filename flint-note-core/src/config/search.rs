use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_true")]
    pub index_enabled: bool,
    #[serde(default)]
    pub rebuild_on_startup: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_results() -> usize {
    100
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            index_enabled: true,
            rebuild_on_startup: false,
            max_results: default_max_results(),
        }
    }
}
