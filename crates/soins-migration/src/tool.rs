use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::MigrationError;

/// Seam over the external schema diff/apply CLI. The engine owns the control
/// policy; implementations own process mechanics.
#[async_trait]
pub trait SchemaTool: Send + Sync {
    /// Free-form status report (`Migration Status:` et al.).
    async fn status(&self) -> Result<String, MigrationError>;

    /// Applies the pending files against the target database.
    async fn apply(&self) -> Result<String, MigrationError>;

    /// With a name: generates a migration file. Without: dry-run, returning
    /// the pending change statements one per line.
    async fn diff(&self, name: Option<&str>) -> Result<String, MigrationError>;

    /// Recomputes the integrity digest over the migration directory.
    async fn hash(&self) -> Result<String, MigrationError>;
}

/// Spawns the tool binary per call; the child is killed when the configured
/// timeout expires.
pub struct CliSchemaTool {
    bin: String,
    migrations_dir: PathBuf,
    schema_dir: PathBuf,
    database_url: String,
    shadow_database_url: String,
    timeout: Duration,
}

impl CliSchemaTool {
    pub fn new(
        bin: impl Into<String>,
        migrations_dir: impl Into<PathBuf>,
        schema_dir: impl Into<PathBuf>,
        database_url: impl Into<String>,
        shadow_database_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            bin: bin.into(),
            migrations_dir: migrations_dir.into(),
            schema_dir: schema_dir.into(),
            database_url: database_url.into(),
            shadow_database_url: shadow_database_url.into(),
            timeout,
        }
    }

    fn dir_arg(&self) -> String {
        file_url(&self.migrations_dir)
    }

    fn schema_arg(&self) -> String {
        file_url(&self.schema_dir)
    }

    async fn run(&self, args: Vec<String>) -> Result<String, MigrationError> {
        let command_line = format!("{} {}", self.bin, args.join(" "));
        tracing::debug!(command = command_line.as_str(), "running schema tool");

        let child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // dropping the wait future kills the child (kill_on_drop)
                return Err(MigrationError::Timeout {
                    command: command_line,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(stdout)
        } else {
            Err(MigrationError::ToolFailure {
                command: command_line,
                output: format!("{stdout}{stderr}"),
            })
        }
    }
}

#[async_trait]
impl SchemaTool for CliSchemaTool {
    async fn status(&self) -> Result<String, MigrationError> {
        self.run(vec![
            "migrate".into(),
            "status".into(),
            "--url".into(),
            self.database_url.clone(),
            "--dir".into(),
            self.dir_arg(),
        ])
        .await
    }

    async fn apply(&self) -> Result<String, MigrationError> {
        self.run(vec![
            "migrate".into(),
            "apply".into(),
            "--url".into(),
            self.database_url.clone(),
            "--dir".into(),
            self.dir_arg(),
        ])
        .await
    }

    async fn diff(&self, name: Option<&str>) -> Result<String, MigrationError> {
        let mut args = vec!["migrate".to_string(), "diff".to_string()];
        match name {
            Some(name) => args.push(name.to_string()),
            None => args.push("--dry-run".to_string()),
        }
        args.extend([
            "--dir".to_string(),
            self.dir_arg(),
            "--dev-url".to_string(),
            self.shadow_database_url.clone(),
            "--to".to_string(),
            self.schema_arg(),
        ]);
        self.run(args).await
    }

    async fn hash(&self) -> Result<String, MigrationError> {
        self.run(vec![
            "migrate".into(),
            "hash".into(),
            "--dir".into(),
            self.dir_arg(),
        ])
        .await
    }
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}
