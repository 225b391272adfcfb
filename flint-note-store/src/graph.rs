//! Link graph queries and maintenance (component I).

use flint_note_core::error::FlintResult;
use flint_note_core::models::LinkInfo;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::FlintError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalLinkRow {
    pub note_id: String,
    pub url: String,
    pub title: Option<String>,
    pub line_number: u32,
    pub link_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoteLinks {
    pub outgoing_internal: Vec<LinkInfo>,
    pub outgoing_external: Vec<ExternalLinkRow>,
    pub incoming: Vec<LinkInfo>,
}

/// All links out of and into a note.
pub async fn links_of(pool: &SqlitePool, note_id: &str) -> FlintResult<NoteLinks> {
    let outgoing_internal = outgoing_internal_links(pool, note_id).await?;
    let outgoing_external = outgoing_external_links(pool, note_id).await?;
    let incoming = backlinks(pool, note_id).await?;
    Ok(NoteLinks {
        outgoing_internal,
        outgoing_external,
        incoming,
    })
}

async fn outgoing_internal_links(pool: &SqlitePool, note_id: &str) -> FlintResult<Vec<LinkInfo>> {
    let rows = sqlx::query(
        "SELECT source_note_id, target_note_id, target_title, link_text, line_number FROM note_links WHERE source_note_id = ?1 ORDER BY line_number",
    )
    .bind(note_id)
    .fetch_all(pool)
    .await
    .map_err(|e| FlintError::Db(e.to_string()))?;

    Ok(rows.into_iter().map(row_to_link_info).collect())
}

async fn outgoing_external_links(
    pool: &SqlitePool,
    note_id: &str,
) -> FlintResult<Vec<ExternalLinkRow>> {
    let rows = sqlx::query(
        "SELECT note_id, url, title, line_number, link_type FROM external_links WHERE note_id = ?1 ORDER BY line_number",
    )
    .bind(note_id)
    .fetch_all(pool)
    .await
    .map_err(|e| FlintError::Db(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|row| ExternalLinkRow {
            note_id: row.get("note_id"),
            url: row.get("url"),
            title: row.get("title"),
            line_number: row.get::<i64, _>("line_number") as u32,
            link_type: row.get("link_type"),
        })
        .collect())
}

/// Notes that link to `note_id`.
pub async fn backlinks(pool: &SqlitePool, note_id: &str) -> FlintResult<Vec<LinkInfo>> {
    let rows = sqlx::query(
        "SELECT source_note_id, target_note_id, target_title, link_text, line_number FROM note_links WHERE target_note_id = ?1 ORDER BY source_note_id, line_number",
    )
    .bind(note_id)
    .fetch_all(pool)
    .await
    .map_err(|e| FlintError::Db(e.to_string()))?;

    Ok(rows.into_iter().map(row_to_link_info).collect())
}

fn row_to_link_info(row: sqlx::sqlite::SqliteRow) -> LinkInfo {
    LinkInfo {
        source_note_id: row.get("source_note_id"),
        target_note_id: row.get("target_note_id"),
        target_title: row.get("target_title"),
        link_text: row.get("link_text"),
        line_number: row.get::<i64, _>("line_number") as u32,
    }
}

/// Every link row whose target could not be resolved to an existing note.
pub async fn find_broken(pool: &SqlitePool) -> FlintResult<Vec<LinkInfo>> {
    let rows = sqlx::query(
        "SELECT source_note_id, target_note_id, target_title, link_text, line_number FROM note_links WHERE target_note_id IS NULL ORDER BY source_note_id, line_number",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| FlintError::Db(e.to_string()))?;

    Ok(rows.into_iter().map(row_to_link_info).collect())
}

#[derive(Debug, Clone, Default)]
pub struct LinkSearchCriteria {
    pub has_links_to: Vec<String>,
    pub linked_from: Vec<String>,
    pub external_domains: Vec<String>,
    pub broken_links: bool,
}

/// Notes matching any of the supplied criteria. An entirely empty
/// criteria set returns an empty result rather than every note.
pub async fn search_by_links(
    pool: &SqlitePool,
    criteria: &LinkSearchCriteria,
) -> FlintResult<Vec<String>> {
    let mut ids = std::collections::BTreeSet::new();

    for target in &criteria.has_links_to {
        let rows = sqlx::query("SELECT DISTINCT source_note_id FROM note_links WHERE target_note_id = ?1")
            .bind(target)
            .fetch_all(pool)
            .await
            .map_err(|e| FlintError::Db(e.to_string()))?;
        for row in rows {
            ids.insert(row.get::<String, _>("source_note_id"));
        }
    }

    for source in &criteria.linked_from {
        let rows = sqlx::query("SELECT DISTINCT target_note_id FROM note_links WHERE source_note_id = ?1 AND target_note_id IS NOT NULL")
            .bind(source)
            .fetch_all(pool)
            .await
            .map_err(|e| FlintError::Db(e.to_string()))?;
        for row in rows {
            ids.insert(row.get::<String, _>("target_note_id"));
        }
    }

    for domain in &criteria.external_domains {
        let pattern = format!("%{domain}%");
        let rows = sqlx::query("SELECT DISTINCT note_id FROM external_links WHERE url LIKE ?1")
            .bind(pattern)
            .fetch_all(pool)
            .await
            .map_err(|e| FlintError::Db(e.to_string()))?;
        for row in rows {
            ids.insert(row.get::<String, _>("note_id"));
        }
    }

    if criteria.broken_links {
        let rows = sqlx::query("SELECT DISTINCT source_note_id FROM note_links WHERE target_note_id IS NULL")
            .fetch_all(pool)
            .await
            .map_err(|e| FlintError::Db(e.to_string()))?;
        for row in rows {
            ids.insert(row.get::<String, _>("source_note_id"));
        }
    }

    Ok(ids.into_iter().collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateResult {
    pub total_notes: usize,
    pub processed: usize,
    pub errors: usize,
    pub error_details: Vec<String>,
}

/// One-shot backfill of link tables for notes present on disk but not yet
/// reflected in them. Refuses to run against a non-empty link table unless
/// `force` is set, mirroring the bulk-guard pattern used elsewhere.
pub async fn migrate(
    pool: &SqlitePool,
    workspace: &flint_note_core::workspace::Workspace,
    force: bool,
) -> FlintResult<MigrateResult> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM note_links")
        .fetch_one(pool)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;
    if existing > 0 && !force {
        return Err(FlintError::Conflict(
            "link tables already populated; pass force=true to rebuild them".to_string(),
        ));
    }

    let total_notes = crate::db_sync::rebuild(pool, workspace).await?;
    Ok(MigrateResult {
        total_notes,
        processed: total_notes,
        errors: 0,
        error_details: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_sync::upsert_note;
    use chrono::Utc;
    use flint_note_core::models::Note;
    use flint_note_db::DbPool;
    use std::collections::BTreeMap;

    fn note(id: &str, filename: &str, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id: id.to_string(),
            note_type: "general".to_string(),
            title: "T".to_string(),
            filename: filename.to_string(),
            path: format!("/tmp/{id}"),
            content: content.to_string(),
            content_hash: "sha256:x".to_string(),
            created: now,
            updated: now,
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn find_broken_reports_unresolved_targets() {
        let db = DbPool::open_in_memory().await.unwrap();
        upsert_note(db.rw(), &note("general/a.md", "a.md", "[[does-not-exist]]"))
            .await
            .unwrap();
        let broken = find_broken(db.rw()).await.unwrap();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].target_title, "does-not-exist");
    }

    #[tokio::test]
    async fn backlinks_resolve_once_target_exists() {
        let db = DbPool::open_in_memory().await.unwrap();
        upsert_note(db.rw(), &note("general/a.md", "a.md", "[[general/b.md]]"))
            .await
            .unwrap();
        upsert_note(db.rw(), &note("general/b.md", "b.md", "no links"))
            .await
            .unwrap();
        crate::db_sync::reresolve_links(db.rw()).await.unwrap();

        let back = backlinks(db.rw(), "general/b.md").await.unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].source_note_id, "general/a.md");
    }
}
