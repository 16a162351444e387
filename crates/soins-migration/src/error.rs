use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// A second invocation while the engine lock is held. The caller retries
    /// later; no state was touched.
    #[error("migration run already in progress")]
    AlreadyInProgress,

    /// The target database holds tables the history does not know about.
    /// The engine does not self-heal this; an operator must baseline with
    /// `migrate hash`.
    #[error("tables pre-exist in the target database — run `migrate hash` to baseline")]
    TablesPreExist,

    #[error("schema tool failed ({command}): {output}")]
    ToolFailure { command: String, output: String },

    #[error("schema tool timed out after {secs}s ({command})")]
    Timeout { command: String, secs: u64 },

    #[error("unparseable schema tool status output: {0}")]
    StatusUnparseable(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
