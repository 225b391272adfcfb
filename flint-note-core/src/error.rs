use std::path::PathBuf;

/// Unified error type returned by every flint-note component.
///
/// The display text of each variant is part of the contract with the tool
/// dispatcher: callers grep for the kind keyword embedded in the message
/// (`content hash`, `protected`, `confirmation`, ...), so wording changes
/// here are a breaking change.
#[derive(Debug, thiserror::Error)]
pub enum FlintError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("note type '{0}' does not exist")]
    InvalidType(String),

    #[error("note is already in note type '{0}'")]
    SameType(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(
        "metadata update rejected: protected field(s) {0} are handled automatically by rename_note"
    )]
    ProtectedField(String),

    #[error("confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("note type '{0}' is not empty")]
    NotEmpty(String),

    #[error("bulk operation exceeds configured limit of {limit} (requested {requested})")]
    BulkLimitExceeded { limit: usize, requested: usize },

    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),

    #[error("invalid sql: {0}")]
    InvalidSql(String),

    #[error("path '{0}' escapes the workspace root")]
    PathOutsideRoot(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("database error: {0}")]
    Db(String),
}

pub type FlintResult<T> = Result<T, FlintError>;

impl FlintError {
    pub fn protected_field(fields: impl IntoIterator<Item = String>) -> Self {
        let joined = fields.into_iter().collect::<Vec<_>>().join(", ");
        FlintError::ProtectedField(joined)
    }
}
