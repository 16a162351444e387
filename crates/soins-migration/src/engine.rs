use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::MigrationError;
use crate::extensions::ExtensionEnsurer;
use crate::fixup::inject_uuid_extension;
use crate::naming::derive_migration_name;
use crate::status::{MigrationStatus, StatusLabel};
use crate::tool::SchemaTool;

pub const INITIAL_MIGRATION_NAME: &str = "initial_schema_from_sql_files";

/// What one `ensure_applied` invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No pending files and no drift.
    UpToDate,
    /// Pending files were applied.
    AppliedPending { count: u64 },
    /// Empty history against an empty target: the initial migration was
    /// generated and applied.
    GeneratedInitial,
    /// Drift was detected, generated under a derived name and applied.
    GeneratedDrift { name: String, changes: usize },
}

/// Decision the status report maps to, before any tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    ApplyPending,
    GenerateInitial,
    CheckDrift,
}

fn plan(status: &MigrationStatus) -> Plan {
    if status.pending > 0 {
        Plan::ApplyPending
    } else if status.label == StatusLabel::UpToDate && status.executed == 0 {
        Plan::GenerateInitial
    } else {
        Plan::CheckDrift
    }
}

/// Reconciles the on-disk migration history with the live database on every
/// start. The whole engine runs under a process-wide lock: a concurrent
/// invocation fails fast with `AlreadyInProgress` instead of queueing.
pub struct MigrationEngine {
    tool: Arc<dyn SchemaTool>,
    extensions: Arc<dyn ExtensionEnsurer>,
    migrations_dir: PathBuf,
    lock: Mutex<()>,
}

impl MigrationEngine {
    pub fn new(
        tool: Arc<dyn SchemaTool>,
        extensions: Arc<dyn ExtensionEnsurer>,
        migrations_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool,
            extensions,
            migrations_dir: migrations_dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub async fn ensure_applied(&self) -> Result<MigrationOutcome, MigrationError> {
        let _guard = self
            .lock
            .try_lock()
            .map_err(|_| MigrationError::AlreadyInProgress)?;

        let raw = self.tool.status().await?;
        let status = MigrationStatus::parse(&raw)?;
        tracing::info!(
            label = ?status.label,
            executed = status.executed,
            pending = status.pending,
            current_version = status.current_version.as_deref().unwrap_or("none"),
            "migration status read"
        );

        match plan(&status) {
            Plan::ApplyPending => {
                self.extensions.ensure_all().await?;
                self.apply().await?;
                tracing::info!(count = status.pending, "pending migrations applied");
                Ok(MigrationOutcome::AppliedPending {
                    count: status.pending,
                })
            }
            Plan::GenerateInitial => {
                self.extensions.ensure_all().await?;
                self.generate(INITIAL_MIGRATION_NAME).await?;
                self.apply().await?;
                tracing::info!("initial schema migration generated and applied");
                Ok(MigrationOutcome::GeneratedInitial)
            }
            Plan::CheckDrift => {
                self.extensions.ensure_all().await?;
                let dry_run = self.tool.diff(None).await?;
                let changes = change_lines(&dry_run);
                if changes.is_empty() {
                    tracing::info!("schema is up to date");
                    return Ok(MigrationOutcome::UpToDate);
                }

                let name = derive_migration_name(&changes);
                self.generate(&name).await?;
                self.apply().await?;
                tracing::info!(
                    name = name.as_str(),
                    changes = changes.len(),
                    "drift migration generated and applied"
                );
                Ok(MigrationOutcome::GeneratedDrift {
                    name,
                    changes: changes.len(),
                })
            }
        }
    }

    /// diff-generate, then fix the artifact up and re-seal the digest when
    /// the fixup touched it.
    async fn generate(&self, name: &str) -> Result<(), MigrationError> {
        self.tool.diff(Some(name)).await.map_err(reclassify)?;
        if inject_uuid_extension(&self.migrations_dir).await?.is_some() {
            self.tool.hash().await?;
        }
        Ok(())
    }

    async fn apply(&self) -> Result<(), MigrationError> {
        self.tool.apply().await.map_err(reclassify)?;
        Ok(())
    }
}

/// `already exists` in the tool output means the target holds tables the
/// history does not know about; the operator must baseline, the engine does
/// not self-heal.
fn reclassify(err: MigrationError) -> MigrationError {
    match err {
        MigrationError::ToolFailure { ref output, .. } if output.contains("already exists") => {
            MigrationError::TablesPreExist
        }
        other => other,
    }
}

/// Non-empty, non-comment lines of a dry-run diff.
fn change_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .map(String::from)
        .collect()
}
