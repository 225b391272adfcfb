//! Query surface over the read-only connection (component H).

use flint_note_core::error::{FlintError, FlintResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub note_type: String,
    pub score: f64,
    pub snippet: String,
    pub filename: String,
    pub path: String,
}

/// `search_notes`: FTS by default, literal regex scan when `regex` is set.
pub async fn search_text(
    pool: &SqlitePool,
    query: &str,
    note_type: Option<&str>,
    limit: usize,
    regex: bool,
) -> FlintResult<Vec<SearchResult>> {
    if regex {
        return search_regex(pool, query, note_type, limit).await;
    }
    search_fts(pool, query, note_type, limit).await
}

async fn search_fts(
    pool: &SqlitePool,
    query: &str,
    note_type: Option<&str>,
    limit: usize,
) -> FlintResult<Vec<SearchResult>> {
    let sql = r#"
        SELECT n.id, n.title, n.type, n.filename, n.path,
               snippet(notes_fts, 2, '[', ']', '...', 8) AS snippet,
               bm25(notes_fts) AS rank
        FROM notes_fts
        JOIN notes n ON n.id = notes_fts.id
        WHERE notes_fts MATCH ?1
          AND (?2 IS NULL OR n.type = ?2)
        ORDER BY rank
        LIMIT ?3
    "#;
    let rows = sqlx::query(sql)
        .bind(fts_query(query))
        .bind(note_type)
        .bind(limit as i64)
        .fetch_all(pool)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let rank: f64 = row.get("rank");
            SearchResult {
                id: row.get("id"),
                title: row.get("title"),
                note_type: row.get("type"),
                score: normalize_bm25(rank),
                snippet: row.get("snippet"),
                filename: row.get("filename"),
                path: row.get("path"),
            }
        })
        .collect())
}

fn fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `bm25()` reports more negative for a stronger match. Flip and squash
/// into `[0, 1)` so a higher score always means a better match.
fn normalize_bm25(rank: f64) -> f64 {
    let relevance = (-rank).max(0.0);
    relevance / (1.0 + relevance)
}

/// Larger than any realistic per-note content-hit count, so a single title
/// hit always sorts above a content-only match.
const TITLE_HIT_WEIGHT: f64 = 1_000_000.0;

async fn search_regex(
    pool: &SqlitePool,
    pattern: &str,
    note_type: Option<&str>,
    limit: usize,
) -> FlintResult<Vec<SearchResult>> {
    let re = Regex::new(pattern).map_err(|e| FlintError::InvalidRegex(e.to_string()))?;

    let sql = "SELECT id, title, type, content, filename, path FROM notes WHERE (?1 IS NULL OR type = ?1)";
    let rows = sqlx::query(sql)
        .bind(note_type)
        .fetch_all(pool)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;

    let mut results = Vec::new();
    for row in rows {
        let content: String = row.get("content");
        let title: String = row.get("title");
        let title_hits = re.find_iter(&title).count();
        let content_hits = re.find_iter(&content).count();
        if title_hits == 0 && content_hits == 0 {
            continue;
        }
        let snippet = re
            .find(&content)
            .map(|m| context_snippet(&content, m.start(), m.end()))
            .unwrap_or_default();
        // Title hits always outrank content-only hits; multi-hit notes
        // outrank single-hit notes within the same tier.
        let score = title_hits as f64 * TITLE_HIT_WEIGHT + content_hits as f64;
        results.push(SearchResult {
            id: row.get("id"),
            title,
            note_type: row.get("type"),
            score,
            snippet,
            filename: row.get("filename"),
            path: row.get("path"),
        });
    }
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    results.truncate(limit);
    Ok(results)
}

fn context_snippet(content: &str, start: usize, end: usize) -> String {
    let before = content[..start].chars().rev().take(40).collect::<Vec<_>>();
    let before: String = before.into_iter().rev().collect();
    let after: String = content[end..].chars().take(40).collect();
    format!("{before}[{}]{after}", &content[start..end])
}

#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct AdvancedQuery {
    pub note_type: Option<String>,
    pub content_contains: Option<String>,
    pub metadata_filters: Vec<MetadataFilter>,
    /// Matches notes having any of these tags (an `IN` match against the
    /// `tags` metadata key), rather than the exact-one-value match
    /// `metadata_filters` gives.
    pub tags_any: Vec<String>,
    pub sort_by: Option<String>,
    pub sort_descending: bool,
    pub limit: usize,
    pub offset: usize,
}

/// `search_notes_advanced`: structured filtering over `notes` joined with
/// `note_metadata`.
pub async fn search_advanced(pool: &SqlitePool, query: &AdvancedQuery) -> FlintResult<Vec<SearchResult>> {
    let mut sql = String::from("SELECT DISTINCT n.id, n.title, n.type, n.filename, n.path FROM notes n");
    let mut conditions = Vec::new();
    let mut joins = 0;
    for filter in &query.metadata_filters {
        joins += 1;
        sql.push_str(&format!(
            " JOIN note_metadata m{joins} ON m{joins}.note_id = n.id AND m{joins}.key = '{}' AND m{joins}.value = '{}'",
            filter.key.replace('\'', "''"),
            filter.value.replace('\'', "''")
        ));
    }
    if !query.tags_any.is_empty() {
        joins += 1;
        let values = query
            .tags_any
            .iter()
            .map(|t| format!("'{}'", t.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(
            " JOIN note_metadata m{joins} ON m{joins}.note_id = n.id AND m{joins}.key = 'tags' AND m{joins}.value IN ({values})"
        ));
    }
    if let Some(note_type) = &query.note_type {
        conditions.push(format!("n.type = '{}'", note_type.replace('\'', "''")));
    }
    if let Some(needle) = &query.content_contains {
        conditions.push(format!("n.content LIKE '%{}%'", needle.replace('\'', "''")));
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    let sort_column = match query.sort_by.as_deref() {
        Some("title") => "n.title",
        Some("created") => "n.created",
        _ => "n.updated",
    };
    sql.push_str(&format!(
        " ORDER BY {sort_column} {} LIMIT {} OFFSET {}",
        if query.sort_descending { "DESC" } else { "ASC" },
        query.limit.max(1),
        query.offset
    ));

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| FlintError::Db(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|row| SearchResult {
            id: row.get("id"),
            title: row.get("title"),
            note_type: row.get("type"),
            score: 1.0,
            snippet: String::new(),
            filename: row.get("filename"),
            path: row.get("path"),
        })
        .collect())
}

/// `search_notes_sql`: a user-supplied SELECT, executed on the read-only
/// pool. The pool itself rejects writes; this guard rejects non-SELECT
/// statements before they are even sent.
pub async fn search_sql(
    pool: &SqlitePool,
    query: &str,
    params: &[serde_json::Value],
) -> FlintResult<Vec<serde_json::Value>> {
    let normalized = query.trim_start().to_uppercase();
    if !normalized.starts_with("SELECT") {
        return Err(FlintError::InvalidSql(
            "only SELECT statements are allowed".to_string(),
        ));
    }

    let mut q = sqlx::query(query);
    for param in params {
        q = match param {
            serde_json::Value::String(s) => q.bind(s.clone()),
            serde_json::Value::Number(n) if n.is_i64() => q.bind(n.as_i64()),
            serde_json::Value::Number(n) => q.bind(n.as_f64()),
            serde_json::Value::Bool(b) => q.bind(*b),
            serde_json::Value::Null => q.bind(Option::<String>::None),
            other => q.bind(other.to_string()),
        };
    }

    let rows = q.fetch_all(pool).await.map_err(|e| FlintError::Db(e.to_string()))?;
    Ok(rows.into_iter().map(row_to_json).collect())
}

fn row_to_json(row: sqlx::sqlite::SqliteRow) -> serde_json::Value {
    use sqlx::ValueRef;
    let mut obj = serde_json::Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let raw = row.try_get_raw(idx).ok();
        let value = raw
            .and_then(|v| {
                if v.is_null() {
                    return Some(serde_json::Value::Null);
                }
                row.try_get::<String, _>(idx).ok().map(serde_json::Value::String)
                    .or_else(|| row.try_get::<i64, _>(idx).ok().map(|n| serde_json::Value::Number(n.into())))
                    .or_else(|| row.try_get::<f64, _>(idx).ok().and_then(|f| serde_json::Number::from_f64(f)).map(serde_json::Value::Number))
            })
            .unwrap_or(serde_json::Value::Null);
        obj.insert(name, value);
    }
    serde_json::Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_sync::upsert_note;
    use chrono::Utc;
    use flint_note_core::models::Note;
    use flint_note_db::DbPool;
    use std::collections::BTreeMap;

    fn note(id: &str, title: &str, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id: id.to_string(),
            note_type: "general".to_string(),
            title: title.to_string(),
            filename: format!("{title}.md"),
            path: format!("/tmp/{id}"),
            content: content.to_string(),
            content_hash: "sha256:x".to_string(),
            created: now,
            updated: now,
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn fts_search_finds_matching_note() {
        let db = DbPool::open_in_memory().await.unwrap();
        upsert_note(db.rw(), &note("general/a.md", "Rust Notes", "learning about async rust"))
            .await
            .unwrap();
        let results = search_text(db.rw(), "async", None, 10, false).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "general/a.md");
    }

    #[tokio::test]
    async fn invalid_regex_is_rejected() {
        let db = DbPool::open_in_memory().await.unwrap();
        let err = search_text(db.rw(), "[", None, 10, true).await.unwrap_err();
        assert!(err.to_string().contains("regular expression"));
    }

    #[tokio::test]
    async fn sql_guard_rejects_non_select() {
        let db = DbPool::open_in_memory().await.unwrap();
        let err = search_sql(db.ro(), "DELETE FROM notes", &[]).await.unwrap_err();
        assert!(err.to_string().contains("SELECT"));
    }
}
