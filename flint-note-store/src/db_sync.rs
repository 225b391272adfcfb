//! Keeps the relational index in sync with a note's on-disk state.
//!
//! Every function here runs against the read/write pool and is called from
//! within the note store's write path (component F) immediately after a
//! file write succeeds, or from [`rebuild`] during a full reindex.

use std::collections::BTreeMap;

use chrono::Utc;
use flint_note_core::error::FlintResult;
use flint_note_core::models::Note;
use flint_note_core::workspace::Workspace;
use sqlx::SqlitePool;

use crate::hash::content_hash;
use crate::links::{extract_external_links, extract_wiki_links};
use crate::{frontmatter, FlintError};

fn value_type_tag(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::String(_) => "string",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
        serde_json::Value::Null => "null",
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Insert or update a note's row, its metadata rows, and its internal and
/// external link rows, in one transaction.
pub async fn upsert_note(pool: &SqlitePool, note: &Note) -> FlintResult<()> {
    let mut tx = pool.begin().await.map_err(|e| FlintError::Db(e.to_string()))?;
    upsert_note_tx(&mut tx, note).await?;
    tx.commit().await.map_err(|e| FlintError::Db(e.to_string()))?;
    Ok(())
}

/// Same as [`upsert_note`] but runs against a caller-owned transaction,
/// for call sites that need several notes reindexed atomically.
async fn upsert_note_tx(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, note: &Note) -> FlintResult<()> {
    let metadata_json =
        serde_json::to_string(&note.metadata).map_err(|e| FlintError::Db(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO notes (id, title, content, type, filename, path, content_hash, metadata_json, created, updated)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            type = excluded.type,
            filename = excluded.filename,
            path = excluded.path,
            content_hash = excluded.content_hash,
            metadata_json = excluded.metadata_json,
            updated = excluded.updated
        "#,
    )
    .bind(&note.id)
    .bind(&note.title)
    .bind(&note.content)
    .bind(&note.note_type)
    .bind(&note.filename)
    .bind(&note.path)
    .bind(&note.content_hash)
    .bind(&metadata_json)
    .bind(note.created.to_rfc3339())
    .bind(note.updated.to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(|e| FlintError::Db(e.to_string()))?;

    replace_metadata_rows_tx(tx, &note.id, &note.metadata).await?;
    replace_wiki_links_tx(tx, &note.id, &note.content).await?;
    replace_external_links_tx(tx, &note.id, &note.content).await?;
    Ok(())
}

pub async fn delete_note_row(pool: &SqlitePool, id: &str) -> FlintResult<()> {
    sqlx::query("DELETE FROM notes WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;
    Ok(())
}

async fn replace_metadata_rows_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    note_id: &str,
    metadata: &BTreeMap<String, serde_json::Value>,
) -> FlintResult<()> {
    sqlx::query("DELETE FROM note_metadata WHERE note_id = ?1")
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;

    for (key, value) in metadata {
        if let serde_json::Value::Array(items) = value {
            for item in items {
                sqlx::query(
                    "INSERT INTO note_metadata (note_id, key, value, value_type) VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(note_id)
                .bind(key)
                .bind(value_text(item))
                .bind(value_type_tag(item))
                .execute(&mut **tx)
                .await
                .map_err(|e| FlintError::Db(e.to_string()))?;
            }
        } else {
            sqlx::query(
                "INSERT INTO note_metadata (note_id, key, value, value_type) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(note_id)
            .bind(key)
            .bind(value_text(value))
            .bind(value_type_tag(value))
            .execute(&mut **tx)
            .await
            .map_err(|e| FlintError::Db(e.to_string()))?;
        }
    }
    Ok(())
}

async fn replace_wiki_links_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    note_id: &str,
    content: &str,
) -> FlintResult<()> {
    sqlx::query("DELETE FROM note_links WHERE source_note_id = ?1")
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;

    let now = Utc::now().to_rfc3339();
    for link in extract_wiki_links(content) {
        sqlx::query(
            r#"
            INSERT INTO note_links (source_note_id, target_note_id, target_title, link_text, line_number, created)
            VALUES (
                ?1,
                (SELECT id FROM notes WHERE id = ?2 OR id = ?2 || '.md' OR filename = ?2 || '.md' OR title = ?2),
                ?2, ?3, ?4, ?5
            )
            "#,
        )
        .bind(note_id)
        .bind(&link.target)
        .bind(&link.text)
        .bind(link.line_number as i64)
        .bind(&now)
        .execute(&mut **tx)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;
    }
    Ok(())
}

async fn replace_external_links_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    note_id: &str,
    content: &str,
) -> FlintResult<()> {
    sqlx::query("DELETE FROM external_links WHERE note_id = ?1")
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;

    let now = Utc::now().to_rfc3339();
    for link in extract_external_links(content) {
        sqlx::query(
            "INSERT INTO external_links (note_id, url, title, line_number, link_type, created) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(note_id)
        .bind(&link.url)
        .bind(&link.title)
        .bind(link.line_number as i64)
        .bind(link.kind.as_str())
        .bind(&now)
        .execute(&mut **tx)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;
    }
    Ok(())
}

const RERESOLVE_SQL: &str = r#"
    UPDATE note_links
    SET target_note_id = (
        SELECT id FROM notes
        WHERE id = note_links.target_title
           OR id = note_links.target_title || '.md'
           OR filename = note_links.target_title || '.md'
           OR title = note_links.target_title
    )
    "#;

/// Re-resolve every wikilink's `target_note_id` against the current id
/// table. Called after a rename/move, since a previously-broken link may
/// now resolve, or vice versa.
pub async fn reresolve_links(pool: &SqlitePool) -> FlintResult<()> {
    sqlx::query(RERESOLVE_SQL)
        .execute(pool)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;
    Ok(())
}

async fn reresolve_links_tx(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> FlintResult<()> {
    sqlx::query(RERESOLVE_SQL)
        .execute(&mut **tx)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;
    Ok(())
}

/// Full filesystem scan + reindex, run inside a single transaction (clears
/// every derived table, then reinserts from the notes found on disk). A
/// failure partway through rolls back to the pre-rebuild state.
pub async fn rebuild(pool: &SqlitePool, workspace: &Workspace) -> FlintResult<usize> {
    let mut tx = pool.begin().await.map_err(|e| FlintError::Db(e.to_string()))?;

    sqlx::query("DELETE FROM external_links").execute(&mut *tx).await.map_err(|e| FlintError::Db(e.to_string()))?;
    sqlx::query("DELETE FROM note_links").execute(&mut *tx).await.map_err(|e| FlintError::Db(e.to_string()))?;
    sqlx::query("DELETE FROM note_metadata").execute(&mut *tx).await.map_err(|e| FlintError::Db(e.to_string()))?;
    sqlx::query("DELETE FROM notes").execute(&mut *tx).await.map_err(|e| FlintError::Db(e.to_string()))?;

    let mut count = 0usize;
    for note_type in workspace.list_note_type_dirs()? {
        let dir = workspace.note_type_dir(&note_type)?;
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some("_description.md") {
                continue;
            }
            let Ok(raw) = std::fs::read_to_string(&path) else {
                continue;
            };
            let parsed = frontmatter::parse(&raw);
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let id = format!("{note_type}/{filename}");
            let title = parsed
                .metadata
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(&filename)
                .to_string();
            let created = parsed
                .metadata
                .get("created")
                .and_then(|v| v.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            let updated = parsed
                .metadata
                .get("updated")
                .and_then(|v| v.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(created);

            let note = Note {
                id,
                note_type: note_type.clone(),
                title,
                filename,
                path: path.to_string_lossy().into_owned(),
                content: parsed.body.clone(),
                content_hash: content_hash(raw.as_bytes()),
                created,
                updated,
                metadata: parsed.metadata,
            };
            upsert_note_tx(&mut tx, &note).await?;
            count += 1;
        }
    }
    reresolve_links_tx(&mut tx).await?;
    tx.commit().await.map_err(|e| FlintError::Db(e.to_string()))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flint_note_db::DbPool;
    use std::collections::BTreeMap;

    fn sample_note(id: &str, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id: id.to_string(),
            note_type: "general".to_string(),
            title: "Sample".to_string(),
            filename: "sample.md".to_string(),
            path: format!("/tmp/{id}"),
            content: content.to_string(),
            content_hash: content_hash(content.as_bytes()),
            created: now,
            updated: now,
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn upsert_then_rows_are_queryable() {
        let db = DbPool::open_in_memory().await.unwrap();
        let note = sample_note("general/sample.md", "see [[general/other]]");
        upsert_note(db.rw(), &note).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notes")
            .fetch_one(db.rw())
            .await
            .unwrap();
        assert_eq!(count, 1);

        let (link_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM note_links")
            .fetch_one(db.rw())
            .await
            .unwrap();
        assert_eq!(link_count, 1);
    }

    #[tokio::test]
    async fn delete_note_row_cascades_links() {
        let db = DbPool::open_in_memory().await.unwrap();
        let target = sample_note("general/other.md", "no links");
        let mut source = sample_note("general/sample.md", "see [[general/other.md]]");
        source.filename = "sample.md".into();
        upsert_note(db.rw(), &target).await.unwrap();
        upsert_note(db.rw(), &source).await.unwrap();
        reresolve_links(db.rw()).await.unwrap();

        delete_note_row(db.rw(), &target.id).await.unwrap();

        let (target_id,): (Option<String>,) =
            sqlx::query_as("SELECT target_note_id FROM note_links WHERE source_note_id = ?1")
                .bind(&source.id)
                .fetch_one(db.rw())
                .await
                .unwrap();
        assert_eq!(target_id, None);
    }
}
