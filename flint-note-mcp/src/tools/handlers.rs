//! One function per advertised tool: validates nothing itself (that's
//! `flint_note_store`'s job), just maps typed params onto engine calls and
//! shapes the JSON payload the dispatcher returns.

use flint_note_core::error::{FlintError, FlintResult};
use flint_note_core::ids::strip_md_suffix;
use flint_note_store::{
    AdvancedQuery, BulkDeleteCriteria, FlintEngine, LinkSearchCriteria, MetadataFilter,
    NoteTypeDeleteAction,
};
use serde::Serialize;
use serde_json::Value;

use super::params::*;

fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).expect("internal types always serialize to JSON")
}

fn project(value: Value, fields: &Option<Vec<String>>) -> Value {
    match fields {
        Some(specs) if !specs.is_empty() => {
            flint_note_core::field_filter::filter_value(&value, specs, false)
        }
        _ => value,
    }
}

/// Same as [`project`] but re-merges the fields search results pin
/// regardless of the requested projection.
fn project_search_result(value: Value, fields: &Option<Vec<String>>) -> Value {
    let projected = project(value.clone(), fields);
    let (Value::Object(mut out), Value::Object(original)) = (projected, value) else {
        return value;
    };
    for key in ["score", "snippet", "filename", "path"] {
        if let Some(v) = original.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    Value::Object(out)
}

pub async fn create_note(engine: &FlintEngine, p: CreateNoteParams) -> FlintResult<Value> {
    let template = if p.use_template {
        engine.note_types().get_template(&p.note_type).await?
    } else {
        None
    };
    let note = engine
        .store()
        .create(&p.note_type, &p.title, &p.content, p.metadata, template.as_deref())
        .await?;
    Ok(to_value(&note))
}

pub async fn get_note(engine: &FlintEngine, p: GetNoteParams) -> FlintResult<Value> {
    let note = engine
        .store()
        .get(&p.identifier)
        .await?
        .ok_or_else(|| FlintError::NotFound(format!("note '{}' not found", p.identifier)))?;
    Ok(project(to_value(&note), &p.fields))
}

pub async fn get_notes(engine: &FlintEngine, p: GetNotesParams) -> FlintResult<Value> {
    let entries = engine.store().get_many(&p.ids).await;
    let results: Vec<Value> = entries
        .into_iter()
        .map(|entry| match entry {
            flint_note_store::GetManyEntry::Found(note) => project(to_value(&note), &p.fields),
            flint_note_store::GetManyEntry::Error { id, error } => {
                serde_json::json!({"id": id, "error": error})
            }
        })
        .collect();
    Ok(Value::Array(results))
}

pub async fn update_note(engine: &FlintEngine, p: UpdateNoteParams) -> FlintResult<Value> {
    let note = engine
        .store()
        .update_with_metadata(
            &p.identifier,
            p.content.as_deref(),
            p.metadata.unwrap_or_default(),
            &p.content_hash,
            false,
        )
        .await?;
    Ok(to_value(&note))
}

pub async fn rename_note(engine: &FlintEngine, p: RenameNoteParams) -> FlintResult<Value> {
    let note = engine
        .store()
        .rename(&p.identifier, &p.new_title, &p.content_hash)
        .await?;
    Ok(to_value(&note))
}

pub async fn move_note(engine: &FlintEngine, p: MoveNoteParams) -> FlintResult<Value> {
    let note = engine
        .store()
        .move_note(&p.identifier, &p.new_type, &p.content_hash)
        .await?;
    Ok(to_value(&note))
}

pub async fn delete_note(engine: &FlintEngine, p: DeleteNoteParams) -> FlintResult<Value> {
    let note = engine.delete_note(&p.identifier, p.confirm).await?;
    Ok(to_value(&note))
}

pub async fn bulk_delete_notes(engine: &FlintEngine, p: BulkDeleteNotesParams) -> FlintResult<Value> {
    let criteria = BulkDeleteCriteria {
        note_type: p.note_type,
        tags: p.tags,
        pattern: p.pattern,
    };
    let results = engine.bulk_delete(&criteria, p.confirm).await?;
    Ok(to_value(&results))
}

pub async fn create_note_type(engine: &FlintEngine, p: CreateNoteTypeParams) -> FlintResult<Value> {
    let info = engine
        .note_types()
        .create(
            &p.name,
            &p.description,
            p.template.as_deref(),
            p.instructions.as_deref(),
            p.metadata_schema,
        )
        .await?;
    Ok(to_value(&info))
}

pub async fn update_note_type(engine: &FlintEngine, p: UpdateNoteTypeParams) -> FlintResult<Value> {
    let info = engine
        .note_types()
        .update(
            &p.name,
            p.description.as_deref(),
            p.template.as_deref(),
            p.instructions.as_deref(),
            p.metadata_schema,
        )
        .await?;
    Ok(to_value(&info))
}

pub async fn get_note_type_info(engine: &FlintEngine, p: NoteTypeNameParams) -> FlintResult<Value> {
    Ok(to_value(&engine.note_types().get_info(&p.name).await?))
}

pub async fn get_note_type_template(engine: &FlintEngine, p: NoteTypeNameParams) -> FlintResult<Value> {
    let template = engine.note_types().get_template(&p.name).await?;
    Ok(serde_json::json!({"template": template}))
}

pub async fn list_note_types(engine: &FlintEngine, _p: ListNoteTypesParams) -> FlintResult<Value> {
    Ok(to_value(&engine.note_types().list()?))
}

pub async fn delete_note_type(engine: &FlintEngine, p: DeleteNoteTypeParams) -> FlintResult<Value> {
    let action = match p.action.as_str() {
        "error" => NoteTypeDeleteAction::Error,
        "delete" => NoteTypeDeleteAction::Delete,
        "migrate" => {
            let target = p.target.ok_or_else(|| {
                FlintError::InvalidInput("migrate action requires a target note type".to_string())
            })?;
            NoteTypeDeleteAction::Migrate { target }
        }
        other => {
            return Err(FlintError::InvalidInput(format!(
                "unknown delete_note_type action '{other}'"
            )))
        }
    };
    engine.delete_note_type(&p.name, action, p.confirm).await?;
    Ok(serde_json::json!({"deleted": p.name}))
}

pub async fn search_notes(engine: &FlintEngine, p: SearchNotesParams) -> FlintResult<Value> {
    let results = engine
        .search_text(&p.query, p.note_type.as_deref(), p.limit, p.regex)
        .await?;
    let values = results
        .into_iter()
        .map(|r| project_search_result(to_value(&r), &p.fields))
        .collect();
    Ok(Value::Array(values))
}

pub async fn search_notes_advanced(engine: &FlintEngine, p: SearchNotesAdvancedParams) -> FlintResult<Value> {
    let query = AdvancedQuery {
        note_type: p.note_type,
        content_contains: p.content_contains,
        metadata_filters: p
            .metadata_filters
            .into_iter()
            .map(|f| MetadataFilter { key: f.key, value: f.value })
            .collect(),
        sort_by: p.sort_by,
        sort_descending: p.sort_descending,
        limit: p.limit,
        offset: p.offset,
    };
    let results = engine.search_advanced(&query).await?;
    let values = results
        .into_iter()
        .map(|r| project_search_result(to_value(&r), &p.fields))
        .collect();
    Ok(Value::Array(values))
}

pub async fn search_notes_sql(engine: &FlintEngine, p: SearchNotesSqlParams) -> FlintResult<Value> {
    let rows = engine.search_sql(&p.query, &p.params).await?;
    Ok(Value::Array(rows))
}

pub async fn link_notes(engine: &FlintEngine, p: LinkNotesParams) -> FlintResult<Value> {
    let source = engine
        .store()
        .get(&p.source_id)
        .await?
        .ok_or_else(|| FlintError::NotFound(format!("note '{}' not found", p.source_id)))?;

    let target_stem = strip_md_suffix(&p.target_id);
    let appended = match &p.relationship {
        Some(relationship) => format!("\n\n[[{target_stem}|{relationship}]]\n"),
        None => format!("\n\n[[{target_stem}]]\n"),
    };
    let new_content = format!("{}{appended}", source.content);
    let note = engine
        .store()
        .update(&source.id, &new_content, &source.content_hash)
        .await?;
    Ok(to_value(&note))
}

pub async fn get_note_links(engine: &FlintEngine, p: NoteIdParams) -> FlintResult<Value> {
    Ok(to_value(&engine.links_of(&p.identifier).await?))
}

pub async fn get_backlinks(engine: &FlintEngine, p: NoteIdParams) -> FlintResult<Value> {
    Ok(to_value(&engine.backlinks(&p.identifier).await?))
}

pub async fn find_broken_links(engine: &FlintEngine, _p: FindBrokenLinksParams) -> FlintResult<Value> {
    let links = engine.find_broken_links().await?;
    Ok(serde_json::json!({"count": links.len(), "broken_links": links}))
}

pub async fn search_by_links(engine: &FlintEngine, p: SearchByLinksParams) -> FlintResult<Value> {
    let criteria = LinkSearchCriteria {
        has_links_to: p.has_links_to,
        linked_from: p.linked_from,
        external_domains: p.external_domains,
        broken_links: p.broken_links,
    };
    Ok(to_value(&engine.search_by_links(&criteria).await?))
}

pub async fn migrate_links(engine: &FlintEngine, p: MigrateLinksParams) -> FlintResult<Value> {
    Ok(to_value(&engine.migrate_links(p.force).await?))
}
