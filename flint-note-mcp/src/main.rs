use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flint_note_core::config::WorkspaceConfig;
use flint_note_mcp::FlintNoteServer;
use flint_note_store::FlintEngine;

#[derive(Parser, Debug)]
#[command(name = "flint-note-mcp", about = "MCP server for a flint-note workspace")]
struct Cli {
    /// Root directory of the flint-note workspace
    #[arg(long, env = "FLINT_NOTE_WORKSPACE")]
    workspace: PathBuf,

    /// Rebuild the search index and link graph from the notes on disk before serving
    #[arg(long, env = "FORCE_INDEX_REBUILD")]
    force_index_rebuild: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_path = cli.workspace.join(".flint-note").join("config.yml");
    let config = match tokio::fs::read_to_string(&config_path).await {
        Ok(text) => WorkspaceConfig::from_yaml(&text)?,
        Err(_) => WorkspaceConfig::default(),
    };

    let engine = match FlintEngine::open(&cli.workspace, config).await {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("failed to open workspace {}: {e}", cli.workspace.display());
            std::process::exit(1);
        }
    };

    if cli.force_index_rebuild {
        tracing::info!("rebuilding link graph from notes on disk");
        engine.migrate_links(true).await?;
    }

    let server = FlintNoteServer::new(Arc::new(engine));
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("error starting MCP server: {e}");
    })?;

    tracing::info!("flint-note MCP server started for {}", cli.workspace.display());
    service.waiting().await?;

    Ok(())
}
