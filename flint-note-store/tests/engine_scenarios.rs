use flint_note_core::config::WorkspaceConfig;
use flint_note_store::{FlintEngine, NoteTypeDeleteAction};
use tempfile::TempDir;

async fn engine() -> (TempDir, FlintEngine) {
    let tmp = TempDir::new().unwrap();
    let engine = FlintEngine::open(tmp.path(), WorkspaceConfig::default()).await.unwrap();
    (tmp, engine)
}

#[tokio::test]
async fn create_then_get_round_trips_with_hash() {
    let (_tmp, engine) = engine().await;
    let note = engine
        .store()
        .create("general", "Hello World", "Hi", None, None)
        .await
        .unwrap();
    assert_eq!(note.id, "general/hello-world.md");

    let fetched = engine.store().get(&note.id).await.unwrap().unwrap();
    assert!(fetched.content_hash.starts_with("sha256:"));
    assert!(fetched.content.contains("Hi"));
}

#[tokio::test]
async fn update_enforces_optimistic_lock() {
    let (_tmp, engine) = engine().await;
    let note = engine.store().create("general", "Hello", "a", None, None).await.unwrap();
    let h0 = note.content_hash.clone();

    let updated = engine.store().update(&note.id, "v1", &h0).await.unwrap();
    assert_eq!(updated.content, "v1");

    let err = engine.store().update(&note.id, "v2", &h0).await.unwrap_err();
    assert!(err.to_string().contains("content hash"));
}

#[tokio::test]
async fn move_rewrites_wikilinks_and_vacates_old_id() {
    let (_tmp, engine) = engine().await;
    engine.store().workspace().ensure_note_type_dir("completed").unwrap();

    let target = engine
        .store()
        .create("projects", "My Project", "body", None, None)
        .await
        .unwrap();
    let source = engine
        .store()
        .create(
            "general",
            "Reference",
            "see [[projects/my-project]]",
            None,
            None,
        )
        .await
        .unwrap();

    engine
        .store()
        .move_note(&target.id, "completed", &target.content_hash)
        .await
        .unwrap();

    let refreshed = engine.store().get(&source.id).await.unwrap().unwrap();
    assert!(refreshed.content.contains("completed/my-project"));
    assert!(engine.store().get(&target.id).await.unwrap().is_none());
}

#[tokio::test]
async fn broken_link_is_detected() {
    let (_tmp, engine) = engine().await;
    engine
        .store()
        .create("general", "Dangling", "[[does-not-exist]]", None, None)
        .await
        .unwrap();

    let broken = engine.find_broken_links().await.unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].target_title, "does-not-exist");
}

#[tokio::test]
async fn type_deletion_with_migration_moves_notes_and_rewrites_links() {
    let (_tmp, engine) = engine().await;
    engine.store().workspace().ensure_note_type_dir("temporary").unwrap();
    engine.store().workspace().ensure_note_type_dir("archive").unwrap();

    let a = engine
        .store()
        .create("temporary", "Alpha", "first", None, None)
        .await
        .unwrap();
    let b = engine
        .store()
        .create("temporary", "Beta", "see [[temporary/alpha]]", None, None)
        .await
        .unwrap();

    engine
        .delete_note_type(
            "temporary",
            NoteTypeDeleteAction::Migrate {
                target: "archive".to_string(),
            },
            true,
        )
        .await
        .unwrap();

    assert!(engine.store().get(&a.id).await.unwrap().is_none());
    assert!(engine.store().get(&b.id).await.unwrap().is_none());

    let moved_a = engine.store().get("archive/alpha.md").await.unwrap().unwrap();
    let moved_b = engine.store().get("archive/beta.md").await.unwrap().unwrap();
    assert!(moved_b.content.contains("archive/alpha"));
    assert_eq!(moved_a.note_type, "archive");

    assert!(!engine.store().workspace().note_type_dir("temporary").unwrap().is_dir());
}

#[tokio::test]
async fn field_projection_keeps_only_requested_paths() {
    let (_tmp, engine) = engine().await;
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert(
        "tags".to_string(),
        serde_json::json!(["a", "b"]),
    );
    metadata.insert("status".to_string(), serde_json::json!("x"));

    let note = engine
        .store()
        .create("general", "Projected", "body", Some(metadata), None)
        .await
        .unwrap();

    let value = serde_json::to_value(&note).unwrap();
    let specs = vec!["id".to_string(), "metadata.tags".to_string()];
    let projected = flint_note_core::field_filter::filter_value(&value, &specs, false);

    assert_eq!(
        projected,
        serde_json::json!({"id": note.id, "metadata": {"tags": ["a", "b"]}})
    );
}
