use std::sync::Arc;

use sea_orm::Database;

use soins_core::AppConfig;

use crate::engine::{MigrationEngine, MigrationOutcome};
use crate::error::MigrationError;
use crate::extensions::PgExtensionEnsurer;
use crate::tool::CliSchemaTool;

/// Startup entry point: connects to the target and shadow databases, wires
/// the CLI tool and runs the engine to completion. The HTTP surface must not
/// accept traffic until this returns.
pub async fn run_startup_migrations(
    config: &AppConfig,
) -> Result<MigrationOutcome, MigrationError> {
    let target = Database::connect(config.database.url.expose()).await?;
    let shadow = Database::connect(config.migration.shadow_database_url.expose()).await?;

    let tool = CliSchemaTool::new(
        &config.migration.tool_bin,
        &config.migration.migrations_dir,
        &config.migration.schema_dir,
        config.database.url.expose(),
        config.migration.shadow_database_url.expose(),
        config.migration.tool_timeout,
    );

    let engine = MigrationEngine::new(
        Arc::new(tool),
        Arc::new(PgExtensionEnsurer::new(target, shadow)),
        &config.migration.migrations_dir,
    );

    engine.ensure_applied().await
}
