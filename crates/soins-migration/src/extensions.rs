use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection};

use crate::error::MigrationError;

/// Extensions the generated schemas rely on. `uuid-ossp` provides
/// `uuid_generate_v4()`, the default for every primary key.
pub const REQUIRED_EXTENSIONS: &[&str] = &["uuid-ossp"];

/// Engine-facing seam: the required extensions must exist on the target and
/// on the shadow database before any generation or application step.
#[async_trait]
pub trait ExtensionEnsurer: Send + Sync {
    async fn ensure_all(&self) -> Result<(), MigrationError>;
}

/// Issues idempotent `CREATE EXTENSION IF NOT EXISTS` on both databases.
pub struct PgExtensionEnsurer {
    target: DatabaseConnection,
    shadow: DatabaseConnection,
}

impl PgExtensionEnsurer {
    pub fn new(target: DatabaseConnection, shadow: DatabaseConnection) -> Self {
        Self { target, shadow }
    }

    async fn ensure(conn: &DatabaseConnection, role: &str) -> Result<(), MigrationError> {
        for extension in REQUIRED_EXTENSIONS {
            conn.execute_unprepared(&format!(
                "CREATE EXTENSION IF NOT EXISTS \"{extension}\""
            ))
            .await?;
            tracing::debug!(extension, database = role, "extension ensured");
        }
        Ok(())
    }
}

#[async_trait]
impl ExtensionEnsurer for PgExtensionEnsurer {
    async fn ensure_all(&self) -> Result<(), MigrationError> {
        Self::ensure(&self.target, "target").await?;
        Self::ensure(&self.shadow, "shadow").await?;
        Ok(())
    }
}
