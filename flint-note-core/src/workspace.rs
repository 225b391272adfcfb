//! Workspace root resolution and path safety (component A).

use crate::error::{FlintError, FlintResult};
use std::path::{Component, Path, PathBuf};

/// Directory name reserved for the engine's own state.
pub const RESERVED_DIR: &str = ".flint-note";

const RESERVED_NAMES: &[&str] = &[".", "..", RESERVED_DIR];

/// An opened, validated workspace root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace at `root`, creating the root directory and its
    /// reserved state directory if they do not already exist.
    pub fn open(root: impl Into<PathBuf>) -> FlintResult<Self> {
        let root = normalize_absolute(&root.into());
        std::fs::create_dir_all(&root)?;
        std::fs::create_dir_all(root.join(RESERVED_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reserved_dir(&self) -> PathBuf {
        self.root.join(RESERVED_DIR)
    }

    pub fn db_path(&self) -> PathBuf {
        self.reserved_dir().join("db.sqlite")
    }

    pub fn config_path(&self) -> PathBuf {
        self.reserved_dir().join("config.yml")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.reserved_dir().join("backups")
    }

    /// Absolute path to a note type's directory.
    pub fn note_type_dir(&self, name: &str) -> FlintResult<PathBuf> {
        validate_note_type_name(name)?;
        Ok(self.root.join(name))
    }

    /// Create a note type's directory if it does not already exist.
    pub fn ensure_note_type_dir(&self, name: &str) -> FlintResult<PathBuf> {
        let dir = self.note_type_dir(name)?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// List every note type directory currently present.
    pub fn list_note_type_dirs(&self) -> FlintResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if RESERVED_NAMES.contains(&name.as_str()) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Resolve a path that must lie within the workspace root, rejecting
    /// traversal outside it.
    pub fn resolve_within(&self, relative: &Path) -> FlintResult<PathBuf> {
        let absolute = if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.root.join(relative)
        };
        let normalized = normalize_absolute(&absolute);
        if !normalized.starts_with(&self.root) {
            return Err(FlintError::PathOutsideRoot(normalized));
        }
        Ok(normalized)
    }
}

/// Validate a note type directory name: alphanumeric/underscore/dash only,
/// and not a reserved name.
pub fn validate_note_type_name(name: &str) -> FlintResult<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(FlintError::InvalidInput(format!(
            "invalid note type name '{name}'"
        )));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(FlintError::InvalidInput(format!(
            "note type name '{name}' is reserved"
        )));
    }
    Ok(())
}

fn normalize_absolute(path: &Path) -> PathBuf {
    let mut stack: Vec<std::ffi::OsString> = Vec::new();
    let mut has_root = false;
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                stack.clear();
                stack.push(prefix.as_os_str().to_os_string());
            }
            Component::RootDir => has_root = true,
            Component::CurDir => {}
            Component::ParentDir => {
                stack.pop();
            }
            Component::Normal(part) => stack.push(part.to_os_string()),
        }
    }
    let mut normalized = PathBuf::new();
    if has_root {
        normalized.push(Path::new("/"));
    }
    for part in stack {
        normalized.push(part);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_reserved_dir() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::open(tmp.path()).unwrap();
        assert!(ws.reserved_dir().is_dir());
    }

    #[test]
    fn rejects_invalid_note_type_names() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::open(tmp.path()).unwrap();
        assert!(ws.note_type_dir("../escape").is_err());
        assert!(ws.note_type_dir(".flint-note").is_err());
        assert!(ws.note_type_dir("general").is_ok());
    }

    #[test]
    fn resolve_within_rejects_traversal() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::open(tmp.path()).unwrap();
        assert!(ws.resolve_within(Path::new("../../etc/passwd")).is_err());
        assert!(ws.resolve_within(Path::new("general/note.md")).is_ok());
    }

    #[test]
    fn list_note_type_dirs_skips_reserved() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::open(tmp.path()).unwrap();
        ws.ensure_note_type_dir("general").unwrap();
        ws.ensure_note_type_dir("projects").unwrap();
        assert_eq!(ws.list_note_type_dirs().unwrap(), vec!["general", "projects"]);
    }
}
