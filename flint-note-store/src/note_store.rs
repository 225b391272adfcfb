//! Note CRUD, atomic writes, and optimistic concurrency (component F).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use flint_note_core::error::{FlintError, FlintResult};
use flint_note_core::ids::{note_id, slugify};
use flint_note_core::models::Note;
use flint_note_core::workspace::Workspace;
use flint_note_db::DbPool;
use serde_json::Value;

use crate::db_sync::{self, reresolve_links};
use crate::frontmatter::{self, PROTECTED_FIELDS};
use crate::hash::content_hash;
use crate::template;

/// A single entry in a batch `get_many` response.
pub enum GetManyEntry {
    Found(Note),
    Error { id: String, error: String },
}

/// Owns the workspace root and database pool; every mutating method
/// serialises through the single write lock implied by holding `&self`
/// behind the caller's own synchronisation (an `Arc<Mutex<NoteStore>>` or
/// equivalent at the dispatcher layer).
#[derive(Clone)]
pub struct NoteStore {
    workspace: Workspace,
    db: DbPool,
}

impl NoteStore {
    pub fn new(workspace: Workspace, db: DbPool) -> Self {
        Self { workspace, db }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    /// Create a new note. `title` must be non-empty after trimming.
    pub async fn create(
        &self,
        note_type: &str,
        title: &str,
        content: &str,
        metadata: Option<BTreeMap<String, Value>>,
        template_text: Option<&str>,
    ) -> FlintResult<Note> {
        let trimmed_title = title.trim();
        if trimmed_title.is_empty() {
            return Err(FlintError::InvalidInput(
                "title must not be empty".to_string(),
            ));
        }
        self.workspace.ensure_note_type_dir(note_type)?;

        let slug = slugify(trimmed_title);
        let filename = format!("{slug}.md");
        let path = self.workspace.note_type_dir(note_type)?.join(&filename);
        if path.exists() {
            return Err(FlintError::Conflict(format!(
                "a note named '{filename}' already exists in note type '{note_type}'"
            )));
        }

        let body = match template_text {
            Some(t) => template::render(t, trimmed_title, note_type, content),
            None => content.to_string(),
        };

        let now = Utc::now();
        let mut meta = metadata.unwrap_or_default();
        meta.insert("title".into(), Value::String(trimmed_title.to_string()));
        meta.insert("type".into(), Value::String(note_type.to_string()));
        meta.insert("filename".into(), Value::String(filename.clone()));
        meta.insert("created".into(), Value::String(now.to_rfc3339()));
        meta.insert("updated".into(), Value::String(now.to_rfc3339()));

        let full_text = frontmatter::serialize(&meta, &body);
        atomic_write(&path, &full_text).await?;

        let note = Note {
            id: note_id(note_type, &slug),
            note_type: note_type.to_string(),
            title: trimmed_title.to_string(),
            filename,
            path: path.to_string_lossy().into_owned(),
            content: body,
            content_hash: content_hash(full_text.as_bytes()),
            created: now,
            updated: now,
            metadata: meta,
        };
        db_sync::upsert_note(self.db.rw(), &note).await?;
        Ok(note)
    }

    /// Fetch a note by id (with or without the `.md` suffix). Returns
    /// `Ok(None)` for a missing note; never errors on "missing".
    pub async fn get(&self, id: &str) -> FlintResult<Option<Note>> {
        let id = flint_note_core::ids::with_md_suffix(id);
        let Some((note_type, filename)) = flint_note_core::ids::split_id(&id) else {
            return Err(FlintError::InvalidInput(format!("malformed note id '{id}'")));
        };
        let path = self.workspace.note_type_dir(note_type)?.join(filename);
        if !path.exists() {
            return Ok(None);
        }
        self.read_note_from_disk(note_type, filename, &path)
            .await
            .map(Some)
    }

    pub async fn get_many(&self, ids: &[String]) -> Vec<GetManyEntry> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(id).await {
                Ok(Some(note)) => results.push(GetManyEntry::Found(note)),
                Ok(None) => results.push(GetManyEntry::Error {
                    id: id.clone(),
                    error: format!("not found: {id}"),
                }),
                Err(e) => results.push(GetManyEntry::Error {
                    id: id.clone(),
                    error: e.to_string(),
                }),
            }
        }
        results
    }

    async fn read_note_from_disk(
        &self,
        note_type: &str,
        filename: &str,
        path: &Path,
    ) -> FlintResult<Note> {
        let raw = tokio::fs::read_to_string(path).await?;
        let parsed = frontmatter::parse(&raw);
        let title = parsed
            .metadata
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or(filename)
            .to_string();
        let created = parse_timestamp(&parsed.metadata, "created").unwrap_or_else(Utc::now);
        let updated = parse_timestamp(&parsed.metadata, "updated").unwrap_or(created);

        Ok(Note {
            id: format!("{note_type}/{filename}"),
            note_type: note_type.to_string(),
            title,
            filename: filename.to_string(),
            path: path.to_string_lossy().into_owned(),
            content: parsed.body,
            content_hash: content_hash(raw.as_bytes()),
            created,
            updated,
            metadata: parsed.metadata,
        })
    }

    /// Overwrite a note's body, enforcing optimistic concurrency against
    /// `expected_hash`.
    pub async fn update(&self, id: &str, content: &str, expected_hash: &str) -> FlintResult<Note> {
        self.update_with_metadata(id, Some(content), BTreeMap::new(), expected_hash, false)
            .await
    }

    /// Merge `metadata` into a note's frontmatter and optionally replace
    /// its body, enforcing the protected-field policy unless
    /// `bypass_protection` is set (only the rename/move paths may set it).
    pub async fn update_with_metadata(
        &self,
        id: &str,
        content: Option<&str>,
        metadata: BTreeMap<String, Value>,
        expected_hash: &str,
        bypass_protection: bool,
    ) -> FlintResult<Note> {
        if !bypass_protection {
            let rejected: Vec<String> = metadata
                .keys()
                .filter(|k| PROTECTED_FIELDS.contains(&k.as_str()))
                .cloned()
                .collect();
            if !rejected.is_empty() {
                return Err(FlintError::protected_field(rejected));
            }
        }

        let Some(current) = self.get(id).await? else {
            return Err(FlintError::NotFound(format!("note '{id}' not found")));
        };
        if current.content_hash != expected_hash {
            return Err(FlintError::Conflict(format!(
                "content hash mismatch for '{id}': note has changed since it was last read"
            )));
        }

        let mut new_metadata = current.metadata.clone();
        for (k, v) in metadata {
            match new_metadata.get_mut(&k) {
                Some(existing) => deep_merge(existing, v),
                None => {
                    new_metadata.insert(k, v);
                }
            }
        }
        let now = Utc::now();
        new_metadata.insert("updated".into(), Value::String(now.to_rfc3339()));

        let new_body = content.unwrap_or(&current.content).to_string();
        let full_text = frontmatter::serialize(&new_metadata, &new_body);
        let path = PathBuf::from(&current.path);
        atomic_write(&path, &full_text).await?;

        let note = Note {
            content: new_body,
            content_hash: content_hash(full_text.as_bytes()),
            updated: now,
            metadata: new_metadata,
            ..current
        };
        db_sync::upsert_note(self.db.rw(), &note).await?;
        reresolve_links(self.db.rw()).await?;
        Ok(note)
    }

    /// Rename a note: regenerates its filename/id from `new_title`,
    /// rewrites id-form wikilinks in other notes that pointed to it.
    pub async fn rename(&self, id: &str, new_title: &str, expected_hash: &str) -> FlintResult<Note> {
        let trimmed = new_title.trim();
        if trimmed.is_empty() {
            return Err(FlintError::InvalidInput("title must not be empty".to_string()));
        }
        let Some(current) = self.get(id).await? else {
            return Err(FlintError::NotFound(format!("note '{id}' not found")));
        };
        if current.content_hash != expected_hash {
            return Err(FlintError::Conflict(format!(
                "content hash mismatch for '{id}': note has changed since it was last read"
            )));
        }

        let new_slug = slugify(trimmed);
        let new_filename = format!("{new_slug}.md");
        let new_id = note_id(&current.note_type, &new_slug);
        let new_path = self
            .workspace
            .note_type_dir(&current.note_type)?
            .join(&new_filename);

        if new_filename != current.filename && new_path.exists() {
            return Err(FlintError::Conflict(format!(
                "a note named '{new_filename}' already exists in note type '{}'",
                current.note_type
            )));
        }

        let now = Utc::now();
        let mut metadata = current.metadata.clone();
        metadata.insert("title".into(), Value::String(trimmed.to_string()));
        metadata.insert("filename".into(), Value::String(new_filename.clone()));
        metadata.insert("updated".into(), Value::String(now.to_rfc3339()));

        let full_text = frontmatter::serialize(&metadata, &current.content);
        if new_path != Path::new(&current.path) {
            atomic_write(&new_path, &full_text).await?;
            tokio::fs::remove_file(&current.path).await?;
        } else {
            atomic_write(&new_path, &full_text).await?;
        }

        let note = Note {
            id: new_id.clone(),
            title: trimmed.to_string(),
            filename: new_filename,
            path: new_path.to_string_lossy().into_owned(),
            content_hash: content_hash(full_text.as_bytes()),
            updated: now,
            metadata,
            ..current.clone()
        };

        db_sync::delete_note_row(self.db.rw(), &current.id).await?;
        db_sync::upsert_note(self.db.rw(), &note).await?;
        rewrite_referring_links(self, &current.id, &new_id).await?;
        reresolve_links(self.db.rw()).await?;
        Ok(note)
    }

    /// Move a note into a different, existing note type.
    pub async fn move_note(
        &self,
        id: &str,
        new_type: &str,
        expected_hash: &str,
    ) -> FlintResult<Note> {
        let Some(current) = self.get(id).await? else {
            return Err(FlintError::NotFound(format!("note '{id}' not found")));
        };
        if current.note_type == new_type {
            return Err(FlintError::SameType(new_type.to_string()));
        }
        if !self.workspace.list_note_type_dirs()?.iter().any(|t| t == new_type) {
            return Err(FlintError::InvalidType(new_type.to_string()));
        }
        if current.content_hash != expected_hash {
            return Err(FlintError::Conflict(format!(
                "content hash mismatch for '{id}': note has changed since it was last read"
            )));
        }

        let new_path = self.workspace.note_type_dir(new_type)?.join(&current.filename);
        if new_path.exists() {
            return Err(FlintError::Conflict(format!(
                "a note named '{}' already exists in note type '{new_type}'",
                current.filename
            )));
        }

        let now = Utc::now();
        let mut metadata = current.metadata.clone();
        metadata.insert("type".into(), Value::String(new_type.to_string()));
        metadata.insert("updated".into(), Value::String(now.to_rfc3339()));
        let full_text = frontmatter::serialize(&metadata, &current.content);

        atomic_write(&new_path, &full_text).await?;
        tokio::fs::remove_file(&current.path).await?;

        let new_id = note_id(new_type, flint_note_core::ids::strip_md_suffix(&current.filename));
        let note = Note {
            id: new_id.clone(),
            note_type: new_type.to_string(),
            path: new_path.to_string_lossy().into_owned(),
            content_hash: content_hash(full_text.as_bytes()),
            updated: now,
            metadata,
            ..current.clone()
        };

        db_sync::delete_note_row(self.db.rw(), &current.id).await?;
        db_sync::upsert_note(self.db.rw(), &note).await?;
        rewrite_referring_links(self, &current.id, &new_id).await?;
        reresolve_links(self.db.rw()).await?;
        Ok(note)
    }

    /// Remove a note's file and derived rows with no confirmation/backup
    /// policy; [`crate::deletion`] wraps this with those concerns.
    pub async fn delete_raw(&self, id: &str) -> FlintResult<Note> {
        let Some(current) = self.get(id).await? else {
            return Err(FlintError::NotFound(format!("note '{id}' not found")));
        };
        tokio::fs::remove_file(&current.path).await?;
        db_sync::delete_note_row(self.db.rw(), &current.id).await?;
        Ok(current)
    }
}

/// Recursively merge `incoming` into `existing`. Objects are merged
/// key-by-key; any other value (including arrays) replaces outright.
fn deep_merge(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(existing_map), Value::Object(incoming_map)) => {
            for (k, v) in incoming_map {
                match existing_map.get_mut(&k) {
                    Some(slot) => deep_merge(slot, v),
                    None => {
                        existing_map.insert(k, v);
                    }
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}

fn parse_timestamp(
    metadata: &BTreeMap<String, Value>,
    key: &str,
) -> Option<chrono::DateTime<Utc>> {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Write to a temp file in the destination's own directory, fsync it, then
/// rename over the destination. A crash mid-write never leaves a
/// half-written file at `path`.
async fn atomic_write(path: &Path, contents: &str) -> FlintResult<()> {
    use tokio::io::AsyncWriteExt;

    let tmp_path = path.with_extension("md.tmp");
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Rewrite `[[old_id]]`-form wikilinks in every other note's body to point
/// at `new_id`, after a rename or move.
async fn rewrite_referring_links(store: &NoteStore, old_id: &str, new_id: &str) -> FlintResult<()> {
    let backlinks = crate::graph::backlinks(store.db.rw(), old_id).await?;
    let old_stem = flint_note_core::ids::strip_md_suffix(old_id);
    let new_stem = flint_note_core::ids::strip_md_suffix(new_id);
    let mut seen = std::collections::BTreeSet::new();
    for link in backlinks {
        if !seen.insert(link.source_note_id.clone()) {
            continue;
        }
        let Some(source) = store.get(&link.source_note_id).await? else {
            continue;
        };
        if !source.content.contains(old_stem) {
            continue;
        }
        let rewritten = source
            .content
            .replace(&format!("[[{old_stem}|"), &format!("[[{new_stem}|"))
            .replace(&format!("[[{old_stem}]]"), &format!("[[{new_stem}]]"));
        if rewritten == source.content {
            continue;
        }
        let full_text = frontmatter::serialize(&source.metadata, &rewritten);
        atomic_write(Path::new(&source.path), &full_text).await?;
        let updated_note = Note {
            content: rewritten,
            content_hash: content_hash(full_text.as_bytes()),
            ..source
        };
        db_sync::upsert_note(store.db.rw(), &updated_note).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, NoteStore) {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::open(tmp.path()).unwrap();
        let db = DbPool::open(&workspace.db_path()).await.unwrap();
        (tmp, NoteStore::new(workspace, db))
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_tmp, store) = store().await;
        let note = store
            .create("general", "Hello World", "Hi", None, None)
            .await
            .unwrap();
        assert_eq!(note.id, "general/hello-world.md");

        let fetched = store.get(&note.id).await.unwrap().unwrap();
        assert!(fetched.content_hash.starts_with("sha256:"));
        assert_eq!(fetched.content, "Hi");
    }

    #[tokio::test]
    async fn duplicate_title_in_same_type_conflicts() {
        let (_tmp, store) = store().await;
        store.create("general", "Hello", "a", None, None).await.unwrap();
        let err = store.create("general", "Hello", "b", None, None).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn update_with_stale_hash_fails() {
        let (_tmp, store) = store().await;
        let note = store.create("general", "Hello", "a", None, None).await.unwrap();
        store.update(&note.id, "v1", &note.content_hash).await.unwrap();
        let err = store.update(&note.id, "v2", &note.content_hash).await.unwrap_err();
        assert!(err.to_string().contains("content hash"));
    }

    #[tokio::test]
    async fn metadata_update_rejects_protected_fields() {
        let (_tmp, store) = store().await;
        let note = store.create("general", "Hello", "a", None, None).await.unwrap();
        let mut meta = BTreeMap::new();
        meta.insert("title".to_string(), Value::String("Hacked".to_string()));
        let err = store
            .update_with_metadata(&note.id, None, meta, &note.content_hash, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("protected"));
        assert!(err.to_string().contains("rename_note"));
    }

    #[tokio::test]
    async fn move_rewrites_referring_wikilinks() {
        let (_tmp, store) = store().await;
        store.workspace().ensure_note_type_dir("completed").unwrap();
        let target = store
            .create("projects", "My Project", "body", None, None)
            .await
            .unwrap();
        let source = store
            .create("general", "Reference", "see [[projects/my-project]]", None, None)
            .await
            .unwrap();
        crate::db_sync::reresolve_links(store.db().rw()).await.unwrap();

        store
            .move_note(&target.id, "completed", &target.content_hash)
            .await
            .unwrap();

        let refreshed = store.get(&source.id).await.unwrap().unwrap();
        assert!(refreshed.content.contains("completed/my-project"));
        assert!(store.get(&target.id).await.unwrap().is_none());
    }
}
