pub mod config;
pub mod context;
pub mod error;
pub mod health;
pub mod keys;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, MigrationConfig, RedisConfig, Secret, SessionConfig};
pub use context::{EstablishmentContext, SessionContext};
pub use error::{Error, ErrorBody, ErrorDetails, Result};
pub use health::{ComponentHealth, HealthReport};
pub use keys::TenantKeyBuilder;
pub use types::{AdminType, ClientType, UserStatus};
