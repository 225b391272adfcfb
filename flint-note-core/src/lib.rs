pub mod config;
pub mod error;
pub mod field_filter;
pub mod ids;
pub mod models;
pub mod workspace;

pub use config::{DeletionSettings, NoteTypeSettings, SearchSettings, WorkspaceConfig};
pub use error::{FlintError, FlintResult};
pub use field_filter::filter_value;
pub use ids::slugify;
pub use models::{ExternalLinkKind, LinkInfo, Note, NoteSummary, NoteTypeInfo};
pub use workspace::Workspace;
