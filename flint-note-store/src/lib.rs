//! Filesystem-backed note storage, indexing, and query engine.
//!
//! [`FlintEngine`] is the single entry point the dispatcher crate talks
//! to. Everything else in this crate is scoped to one concern
//! (frontmatter codec, hashing, link extraction, database sync, search,
//! deletion policy) and can be used directly by tests or by callers that
//! only need one piece.

pub mod db_sync;
pub mod deletion;
pub mod frontmatter;
pub mod graph;
pub mod hash;
pub mod links;
pub mod note_store;
pub mod note_types;
pub mod search;
pub mod template;

pub use flint_note_core::error::{FlintError, FlintResult};
pub use flint_note_core::models::{ExternalLinkKind, LinkInfo, Note, NoteSummary, NoteTypeInfo};

use std::path::Path;

use flint_note_core::config::WorkspaceConfig;
use flint_note_core::workspace::Workspace;
use flint_note_db::DbPool;

pub use deletion::{BulkDeleteCriteria, BulkDeleteEntry, NoteTypeDeleteAction};
pub use graph::{ExternalLinkRow, LinkSearchCriteria, MigrateResult, NoteLinks};
pub use note_store::{GetManyEntry, NoteStore};
pub use note_types::NoteTypeManager;
pub use search::{AdvancedQuery, MetadataFilter, SearchResult};

/// Owns a workspace's store, database, and configuration, and exposes
/// every operation the tool dispatcher needs behind one struct. Loading
/// the configuration YAML itself is left to the caller (the binary
/// crate), matching how [`WorkspaceConfig`] keeps file I/O out of the
/// settings type.
pub struct FlintEngine {
    store: NoteStore,
    config: WorkspaceConfig,
}

impl FlintEngine {
    pub async fn open(root: impl AsRef<Path>, config: WorkspaceConfig) -> FlintResult<Self> {
        let workspace = Workspace::open(root.as_ref())?;
        let db = DbPool::open(&workspace.db_path())
            .await
            .map_err(|e| FlintError::Db(e.to_string()))?;
        Ok(Self {
            store: NoteStore::new(workspace, db),
            config,
        })
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn note_types(&self) -> NoteTypeManager<'_> {
        NoteTypeManager::new(self.store.workspace())
    }

    pub async fn search_text(
        &self,
        query: &str,
        note_type: Option<&str>,
        limit: usize,
        regex: bool,
    ) -> FlintResult<Vec<SearchResult>> {
        search::search_text(self.store.db().ro(), query, note_type, limit, regex).await
    }

    pub async fn search_advanced(&self, query: &AdvancedQuery) -> FlintResult<Vec<SearchResult>> {
        search::search_advanced(self.store.db().ro(), query).await
    }

    pub async fn search_sql(
        &self,
        query: &str,
        params: &[serde_json::Value],
    ) -> FlintResult<Vec<serde_json::Value>> {
        search::search_sql(self.store.db().ro(), query, params).await
    }

    pub async fn links_of(&self, note_id: &str) -> FlintResult<NoteLinks> {
        graph::links_of(self.store.db().ro(), note_id).await
    }

    pub async fn backlinks(&self, note_id: &str) -> FlintResult<Vec<LinkInfo>> {
        graph::backlinks(self.store.db().ro(), note_id).await
    }

    pub async fn find_broken_links(&self) -> FlintResult<Vec<LinkInfo>> {
        graph::find_broken(self.store.db().ro()).await
    }

    pub async fn search_by_links(&self, criteria: &LinkSearchCriteria) -> FlintResult<Vec<String>> {
        graph::search_by_links(self.store.db().ro(), criteria).await
    }

    pub async fn migrate_links(&self, force: bool) -> FlintResult<MigrateResult> {
        graph::migrate(self.store.db().rw(), self.store.workspace(), force).await
    }

    pub async fn delete_note(&self, id: &str, confirm: bool) -> FlintResult<Note> {
        deletion::delete_note(&self.store, &self.config.deletion, id, confirm).await
    }

    pub async fn bulk_delete(
        &self,
        criteria: &BulkDeleteCriteria,
        confirm: bool,
    ) -> FlintResult<Vec<BulkDeleteEntry>> {
        deletion::bulk_delete(&self.store, &self.config.deletion, criteria, confirm).await
    }

    pub async fn delete_note_type(
        &self,
        name: &str,
        action: NoteTypeDeleteAction,
        confirm: bool,
    ) -> FlintResult<()> {
        deletion::delete_note_type(&self.store, &self.config.deletion, name, action, confirm).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn engine_open_creates_then_searches_a_note() {
        let tmp = TempDir::new().unwrap();
        let engine = FlintEngine::open(tmp.path(), WorkspaceConfig::default()).await.unwrap();
        engine
            .store()
            .create("general", "Shopping List", "milk and eggs", None, None)
            .await
            .unwrap();

        let results = engine.search_text("eggs", None, 10, false).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Shopping List");
    }
}
