//! Confirmation, backup, and bulk-limit policy around note removal
//! (component J). [`crate::note_store::NoteStore::delete_raw`] does the
//! actual file/row removal; everything here is policy wrapped around it.

use std::path::PathBuf;

use chrono::Utc;
use flint_note_core::config::DeletionSettings;
use flint_note_core::error::{FlintError, FlintResult};
use flint_note_core::models::Note;
use serde::{Deserialize, Serialize};

use crate::note_store::NoteStore;
use crate::search::{search_advanced, AdvancedQuery};

/// One entry of a `bulk_delete_notes` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteEntry {
    pub id: String,
    pub deleted: bool,
    pub error: Option<String>,
}

/// Criteria selecting the candidate set for `bulk_delete_notes`.
#[derive(Debug, Clone, Default)]
pub struct BulkDeleteCriteria {
    pub note_type: Option<String>,
    /// Matches notes having any of the given tags.
    pub tags: Option<Vec<String>>,
    pub pattern: Option<String>,
}

/// Delete a single note, enforcing the confirmation and backup policy
/// configured for the workspace.
pub async fn delete_note(
    store: &NoteStore,
    settings: &DeletionSettings,
    id: &str,
    confirm: bool,
) -> FlintResult<Note> {
    require_confirmation(settings, confirm, &format!("delete note '{id}'"))?;

    let Some(current) = store.get(id).await? else {
        return Err(FlintError::NotFound(format!("note '{id}' not found")));
    };
    if settings.create_backups {
        backup_file(store, settings, &current.path).await?;
    }
    store.delete_raw(id).await
}

/// Delete every note matching `criteria`, refusing to run past
/// `settings.max_bulk_delete` without a narrower selection.
pub async fn bulk_delete(
    store: &NoteStore,
    settings: &DeletionSettings,
    criteria: &BulkDeleteCriteria,
    confirm: bool,
) -> FlintResult<Vec<BulkDeleteEntry>> {
    require_confirmation(settings, confirm, "bulk delete notes")?;

    let mut query = AdvancedQuery {
        note_type: criteria.note_type.clone(),
        limit: settings.max_bulk_delete + 1,
        ..Default::default()
    };
    if let Some(tags) = &criteria.tags {
        query.tags_any = tags.clone();
    }
    if let Some(pattern) = &criteria.pattern {
        query.content_contains = Some(pattern.clone());
    }

    let candidates = search_advanced(store.db().ro(), &query).await?;
    if candidates.len() > settings.max_bulk_delete {
        return Err(FlintError::BulkLimitExceeded {
            limit: settings.max_bulk_delete,
            requested: candidates.len(),
        });
    }

    let mut results = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if settings.create_backups {
            if let Some(note) = store.get(&candidate.id).await? {
                if let Err(e) = backup_file(store, settings, &note.path).await {
                    results.push(BulkDeleteEntry {
                        id: candidate.id,
                        deleted: false,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            }
        }
        match store.delete_raw(&candidate.id).await {
            Ok(_) => results.push(BulkDeleteEntry {
                id: candidate.id,
                deleted: true,
                error: None,
            }),
            Err(e) => results.push(BulkDeleteEntry {
                id: candidate.id,
                deleted: false,
                error: Some(e.to_string()),
            }),
        }
    }
    Ok(results)
}

/// What happens to a note type's existing notes when the type is deleted.
#[derive(Debug, Clone)]
pub enum NoteTypeDeleteAction {
    /// Refuse unless the type directory is already empty.
    Error,
    /// Move every note into `target` before removing the directory.
    Migrate { target: String },
    /// Delete every note in the type before removing the directory.
    Delete,
}

/// Remove a note-type directory, handling its existing notes per `action`.
pub async fn delete_note_type(
    store: &NoteStore,
    settings: &DeletionSettings,
    name: &str,
    action: NoteTypeDeleteAction,
    confirm: bool,
) -> FlintResult<()> {
    if !settings.allow_note_type_deletion {
        return Err(FlintError::ConfirmationRequired(
            "note type deletion is disabled by workspace configuration".to_string(),
        ));
    }
    require_confirmation(settings, confirm, &format!("delete note type '{name}'"))?;

    let dir = store.workspace().note_type_dir(name)?;
    let note_ids = list_note_ids(store, name)?;

    match action {
        NoteTypeDeleteAction::Error => {
            if !note_ids.is_empty() {
                return Err(FlintError::NotEmpty(name.to_string()));
            }
        }
        NoteTypeDeleteAction::Migrate { target } => {
            if settings.create_backups && !note_ids.is_empty() {
                backup_directory(store, settings, name, &dir).await?;
            }
            for id in &note_ids {
                let Some(note) = store.get(id).await? else {
                    continue;
                };
                store.move_note(id, &target, &note.content_hash).await?;
            }
        }
        NoteTypeDeleteAction::Delete => {
            if settings.create_backups && !note_ids.is_empty() {
                backup_directory(store, settings, name, &dir).await?;
            }
            for id in &note_ids {
                store.delete_raw(id).await?;
            }
        }
    }

    if dir.is_dir() {
        tokio::fs::remove_dir_all(&dir).await?;
    }
    Ok(())
}

fn require_confirmation(settings: &DeletionSettings, confirm: bool, action: &str) -> FlintResult<()> {
    if settings.require_confirmation && !confirm {
        return Err(FlintError::ConfirmationRequired(action.to_string()));
    }
    Ok(())
}

fn list_note_ids(store: &NoteStore, note_type: &str) -> FlintResult<Vec<String>> {
    let dir = store.workspace().note_type_dir(note_type)?;
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Ok(Vec::new());
    };
    let mut ids = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if filename == "_description.md" || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        ids.push(format!("{note_type}/{filename}"));
    }
    ids.sort();
    Ok(ids)
}

async fn backup_file(store: &NoteStore, settings: &DeletionSettings, source: &str) -> FlintResult<PathBuf> {
    let backup_root = resolve_backup_root(store, settings)?;
    tokio::fs::create_dir_all(&backup_root).await?;
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.f");
    let name = PathBuf::from(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "note.md".to_string());
    let dest = backup_root.join(format!("{stamp}-{name}"));
    tokio::fs::copy(source, &dest).await?;
    Ok(dest)
}

async fn backup_directory(
    store: &NoteStore,
    settings: &DeletionSettings,
    note_type: &str,
    dir: &std::path::Path,
) -> FlintResult<PathBuf> {
    let backup_root = resolve_backup_root(store, settings)?;
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.f");
    let dest = backup_root.join(format!("{stamp}-{note_type}"));
    tokio::fs::create_dir_all(&dest).await?;

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("md") {
            if let Some(filename) = path.file_name() {
                tokio::fs::copy(&path, dest.join(filename)).await?;
            }
        }
    }
    Ok(dest)
}

fn resolve_backup_root(store: &NoteStore, settings: &DeletionSettings) -> FlintResult<PathBuf> {
    store
        .workspace()
        .resolve_within(std::path::Path::new(&settings.backup_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flint_note_db::DbPool;
    use flint_note_core::workspace::Workspace;
    use tempfile::TempDir;

    async fn store() -> (TempDir, NoteStore) {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::open(tmp.path()).unwrap();
        let db = DbPool::open(&workspace.db_path()).await.unwrap();
        (tmp, NoteStore::new(workspace, db))
    }

    #[tokio::test]
    async fn delete_without_confirmation_is_rejected() {
        let (_tmp, store) = store().await;
        let note = store.create("general", "Hello", "a", None, None).await.unwrap();
        let settings = DeletionSettings::default();
        let err = delete_note(&store, &settings, &note.id, false).await.unwrap_err();
        assert!(err.to_string().contains("confirmation"));
    }

    #[tokio::test]
    async fn delete_with_confirmation_backs_up_and_removes() {
        let (_tmp, store) = store().await;
        let note = store.create("general", "Hello", "a", None, None).await.unwrap();
        let settings = DeletionSettings::default();
        delete_note(&store, &settings, &note.id, true).await.unwrap();
        assert!(store.get(&note.id).await.unwrap().is_none());

        let backups = store.workspace().backups_dir();
        let has_backup = std::fs::read_dir(&backups)
            .map(|mut it| it.next().is_some())
            .unwrap_or(false);
        assert!(has_backup);
    }

    #[tokio::test]
    async fn bulk_delete_enforces_limit() {
        let (_tmp, store) = store().await;
        for i in 0..3 {
            store
                .create("general", &format!("Note {i}"), "body", None, None)
                .await
                .unwrap();
        }
        let mut settings = DeletionSettings::default();
        settings.max_bulk_delete = 1;
        let err = bulk_delete(&store, &settings, &BulkDeleteCriteria::default(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, FlintError::BulkLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn delete_note_type_with_error_action_requires_empty_dir() {
        let (_tmp, store) = store().await;
        store.create("notes", "Hello", "a", None, None).await.unwrap();
        let mut settings = DeletionSettings::default();
        settings.allow_note_type_deletion = true;
        let err = delete_note_type(&store, &settings, "notes", NoteTypeDeleteAction::Error, true)
            .await
            .unwrap_err();
        assert!(matches!(err, FlintError::NotEmpty(_)));
    }
}
