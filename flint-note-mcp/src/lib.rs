//! MCP-over-stdio dispatcher: wires the 22 flint-note tools and the
//! `flint-note://` resource URIs onto a [`flint_note_store::FlintEngine`].

pub mod tools;

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ListResourcesResult, PaginatedRequestParam,
    ProtocolVersion, RawResource, ReadResourceRequestParam, ReadResourceResult,
    ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{tool, tool_handler, tool_router, ErrorData, RoleServer};

use flint_note_core::error::FlintError;
use flint_note_store::FlintEngine;
use tools::params::*;

fn ok_json(value: serde_json::Value) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn as_result(outcome: Result<serde_json::Value, FlintError>) -> Result<CallToolResult, ErrorData> {
    match outcome {
        Ok(value) => ok_json(value),
        Err(err) => Ok(CallToolResult::error(vec![Content::text(err.to_string())])),
    }
}

#[derive(Clone)]
pub struct FlintNoteServer {
    engine: Arc<FlintEngine>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FlintNoteServer {
    pub fn new(engine: Arc<FlintEngine>) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Create a new note of a given type, optionally seeded from that type's template.")]
    async fn create_note(&self, params: Parameters<CreateNoteParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::create_note(&self.engine, params.0).await)
    }

    #[tool(description = "Fetch a single note by id, optionally projected to a list of dotted field paths.")]
    async fn get_note(&self, params: Parameters<GetNoteParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::get_note(&self.engine, params.0).await)
    }

    #[tool(description = "Fetch several notes by id in one call; missing ids report an error entry instead of failing the whole request.")]
    async fn get_notes(&self, params: Parameters<GetNotesParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::get_notes(&self.engine, params.0).await)
    }

    #[tool(description = "Merge metadata and/or replace the body of an existing note. Requires the note's current content_hash to guard against concurrent edits.")]
    async fn update_note(&self, params: Parameters<UpdateNoteParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::update_note(&self.engine, params.0).await)
    }

    #[tool(description = "Rename a note's title, rewriting id-form wikilinks that point to it from other notes.")]
    async fn rename_note(&self, params: Parameters<RenameNoteParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::rename_note(&self.engine, params.0).await)
    }

    #[tool(description = "Move a note to a different note type, rewriting referring wikilinks.")]
    async fn move_note(&self, params: Parameters<MoveNoteParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::move_note(&self.engine, params.0).await)
    }

    #[tool(description = "Delete a single note. Requires confirm=true unless the workspace has confirmation disabled.")]
    async fn delete_note(&self, params: Parameters<DeleteNoteParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::delete_note(&self.engine, params.0).await)
    }

    #[tool(description = "Delete every note matching note_type/tag/pattern criteria, up to the workspace's configured bulk limit.")]
    async fn bulk_delete_notes(&self, params: Parameters<BulkDeleteNotesParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::bulk_delete_notes(&self.engine, params.0).await)
    }

    #[tool(description = "Create a new note type directory with a description, optional template, and optional metadata schema.")]
    async fn create_note_type(&self, params: Parameters<CreateNoteTypeParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::create_note_type(&self.engine, params.0).await)
    }

    #[tool(description = "Update a note type's description, template, instructions, or metadata schema.")]
    async fn update_note_type(&self, params: Parameters<UpdateNoteTypeParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::update_note_type(&self.engine, params.0).await)
    }

    #[tool(description = "Get a note type's description, template presence, and note count.")]
    async fn get_note_type_info(&self, params: Parameters<NoteTypeNameParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::get_note_type_info(&self.engine, params.0).await)
    }

    #[tool(description = "Fetch a note type's raw template text, if it has one.")]
    async fn get_note_type_template(&self, params: Parameters<NoteTypeNameParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::get_note_type_template(&self.engine, params.0).await)
    }

    #[tool(description = "List every note type defined in the workspace.")]
    async fn list_note_types(&self, params: Parameters<ListNoteTypesParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::list_note_types(&self.engine, params.0).await)
    }

    #[tool(description = "Delete a note type. action is one of \"error\" (refuse unless empty), \"migrate\" (move notes to target first), or \"delete\" (remove notes too).")]
    async fn delete_note_type(&self, params: Parameters<DeleteNoteTypeParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::delete_note_type(&self.engine, params.0).await)
    }

    #[tool(description = "Full-text search over note titles and bodies, or a regex scan when regex=true.")]
    async fn search_notes(&self, params: Parameters<SearchNotesParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::search_notes(&self.engine, params.0).await)
    }

    #[tool(description = "Search notes by note type, content substring, and metadata filters, with sorting and pagination.")]
    async fn search_notes_advanced(&self, params: Parameters<SearchNotesAdvancedParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::search_notes_advanced(&self.engine, params.0).await)
    }

    #[tool(description = "Run a read-only SELECT query against the note database directly.")]
    async fn search_notes_sql(&self, params: Parameters<SearchNotesSqlParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::search_notes_sql(&self.engine, params.0).await)
    }

    #[tool(description = "Add a wikilink from one note to another, with an optional relationship label.")]
    async fn link_notes(&self, params: Parameters<LinkNotesParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::link_notes(&self.engine, params.0).await)
    }

    #[tool(description = "List the outgoing links (internal and external) a note contains.")]
    async fn get_note_links(&self, params: Parameters<NoteIdParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::get_note_links(&self.engine, params.0).await)
    }

    #[tool(description = "List the notes that link to a given note.")]
    async fn get_backlinks(&self, params: Parameters<NoteIdParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::get_backlinks(&self.engine, params.0).await)
    }

    #[tool(description = "List wikilinks across the workspace whose target note does not exist.")]
    async fn find_broken_links(&self, params: Parameters<FindBrokenLinksParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::find_broken_links(&self.engine, params.0).await)
    }

    #[tool(description = "Find notes by their link graph: linking to, linked from, external domains, or having broken links.")]
    async fn search_by_links(&self, params: Parameters<SearchByLinksParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::search_by_links(&self.engine, params.0).await)
    }

    #[tool(description = "Rebuild the link graph by rescanning every note's wikilinks.")]
    async fn migrate_links(&self, params: Parameters<MigrateLinksParams>) -> Result<CallToolResult, ErrorData> {
        as_result(tools::handlers::migrate_links(&self.engine, params.0).await)
    }
}

#[tool_handler]
impl rmcp::ServerHandler for FlintNoteServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "flint-note".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Local, filesystem-backed note store exposed as MCP tools: create, search, \
                 link, and delete plain-text notes organized by note type."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resources = vec![
            RawResource::new("flint-note://types", "Note types").no_annotation(),
            RawResource::new("flint-note://recent", "Recently updated notes").no_annotation(),
            RawResource::new("flint-note://stats", "Workspace statistics").no_annotation(),
        ];
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let body = match request.uri.as_str() {
            "flint-note://types" => {
                let names = self
                    .engine
                    .note_types()
                    .list()
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                serde_json::json!({"note_types": names})
            }
            "flint-note://recent" => {
                let notes = self
                    .engine
                    .search_sql(
                        "SELECT id, title, type, updated FROM notes ORDER BY updated DESC LIMIT 20",
                        &[],
                    )
                    .await
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                serde_json::json!({"notes": notes})
            }
            "flint-note://stats" => {
                let note_types = self
                    .engine
                    .note_types()
                    .list()
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                let note_count = self
                    .engine
                    .search_sql("SELECT COUNT(*) as count FROM notes", &[])
                    .await
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                let link_count = self
                    .engine
                    .search_sql("SELECT COUNT(*) as count FROM note_links", &[])
                    .await
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                let broken_link_count = self
                    .engine
                    .find_broken_links()
                    .await
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?
                    .len();
                serde_json::json!({
                    "note_count": note_count.first().and_then(|r| r.get("count")).cloned().unwrap_or(serde_json::json!(0)),
                    "note_type_count": note_types.len(),
                    "link_count": link_count.first().and_then(|r| r.get("count")).cloned().unwrap_or(serde_json::json!(0)),
                    "broken_link_count": broken_link_count,
                })
            }
            other => {
                return Err(ErrorData::invalid_params(
                    format!("unknown resource uri '{other}'"),
                    None,
                ))
            }
        };
        let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}
