use std::collections::BTreeMap;

use flint_note_core::config::WorkspaceConfig;
use flint_note_mcp::tools::handlers;
use flint_note_mcp::tools::params::{
    CreateNoteParams, GetNoteParams, LinkNotesParams, NoteIdParams, SearchNotesParams,
};
use flint_note_store::FlintEngine;
use tempfile::TempDir;

async fn engine() -> (TempDir, FlintEngine) {
    let tmp = TempDir::new().unwrap();
    let engine = FlintEngine::open(tmp.path(), WorkspaceConfig::default())
        .await
        .unwrap();
    (tmp, engine)
}

#[tokio::test]
async fn create_then_get_round_trips_through_handlers() {
    let (_tmp, engine) = engine().await;
    let created = handlers::create_note(
        &engine,
        CreateNoteParams {
            note_type: "general".to_string(),
            title: "Hello".to_string(),
            content: "body text".to_string(),
            metadata: None,
            use_template: false,
        },
    )
    .await
    .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let fetched = handlers::get_note(
        &engine,
        GetNoteParams {
            identifier: id.clone(),
            fields: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(fetched["content"], "body text");
}

#[tokio::test]
async fn get_note_projects_requested_fields_only() {
    let (_tmp, engine) = engine().await;
    let mut metadata = BTreeMap::new();
    metadata.insert("status".to_string(), serde_json::json!("draft"));
    let created = handlers::create_note(
        &engine,
        CreateNoteParams {
            note_type: "general".to_string(),
            title: "Projected".to_string(),
            content: "body".to_string(),
            metadata: Some(metadata),
            use_template: false,
        },
    )
    .await
    .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let fetched = handlers::get_note(
        &engine,
        GetNoteParams {
            identifier: id,
            fields: Some(vec!["id".to_string(), "metadata.status".to_string()]),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        fetched,
        serde_json::json!({"id": created["id"], "metadata": {"status": "draft"}})
    );
}

#[tokio::test]
async fn link_notes_appends_wikilink_and_resolves_backlink() {
    let (_tmp, engine) = engine().await;
    let source = handlers::create_note(
        &engine,
        CreateNoteParams {
            note_type: "general".to_string(),
            title: "Source".to_string(),
            content: "intro".to_string(),
            metadata: None,
            use_template: false,
        },
    )
    .await
    .unwrap();
    let target = handlers::create_note(
        &engine,
        CreateNoteParams {
            note_type: "general".to_string(),
            title: "Target".to_string(),
            content: "body".to_string(),
            metadata: None,
            use_template: false,
        },
    )
    .await
    .unwrap();

    handlers::link_notes(
        &engine,
        LinkNotesParams {
            source_id: source["id"].as_str().unwrap().to_string(),
            target_id: target["id"].as_str().unwrap().to_string(),
            relationship: Some("references".to_string()),
        },
    )
    .await
    .unwrap();

    let backlinks = handlers::get_backlinks(
        &engine,
        NoteIdParams {
            identifier: target["id"].as_str().unwrap().to_string(),
        },
    )
    .await
    .unwrap();
    let incoming = backlinks.as_array().unwrap();
    assert_eq!(incoming.len(), 1);
}

#[tokio::test]
async fn search_notes_finds_created_note_by_title() {
    let (_tmp, engine) = engine().await;
    handlers::create_note(
        &engine,
        CreateNoteParams {
            note_type: "general".to_string(),
            title: "Distinctive Title".to_string(),
            content: "filler body text".to_string(),
            metadata: None,
            use_template: false,
        },
    )
    .await
    .unwrap();

    let results = handlers::search_notes(
        &engine,
        SearchNotesParams {
            query: "Distinctive".to_string(),
            note_type: None,
            limit: 10,
            regex: false,
            fields: None,
        },
    )
    .await
    .unwrap();
    let hits = results.as_array().unwrap();
    assert_eq!(hits.len(), 1);
}
