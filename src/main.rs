//! Nutritrack
//!
//! An MCP server for nutrition and health tracking.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};

use nutritrack::config::{self, Config};
use nutritrack::mcp::NutritrackService;
use nutritrack::{build_info, db};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // Logging goes to stderr so it does not interfere with MCP stdio
    config::init_logging(&config);

    build_info::print_startup_banner();
    tracing::info!("Starting MCP server on stdio");

    let db_path = config.database_path.clone();
    tracing::info!(path = %db_path.display(), pool_size = config.pool_size, "Opening database");

    // Ensure data directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = db::Database::with_pool_size(&db_path, config.pool_size)?;

    database.with_conn(|conn| {
        if db::migrations::needs_migration(conn)? {
            db::migrations::run_migrations(conn)?;
        }
        let version = db::migrations::get_schema_version(conn)?;
        tracing::info!(version, "Database schema ready");
        Ok(())
    })?;

    let service = NutritrackService::new(db_path, database);

    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;

    server.waiting().await?;

    Ok(())
}
