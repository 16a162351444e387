pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod fixup;
pub mod naming;
pub mod status;
pub mod tool;

pub use bootstrap::run_startup_migrations;
pub use engine::{MigrationEngine, MigrationOutcome, INITIAL_MIGRATION_NAME};
pub use error::MigrationError;
pub use extensions::{ExtensionEnsurer, PgExtensionEnsurer, REQUIRED_EXTENSIONS};
pub use fixup::inject_uuid_extension;
pub use naming::derive_migration_name;
pub use status::{MigrationStatus, StatusLabel};
pub use tool::{CliSchemaTool, SchemaTool};
