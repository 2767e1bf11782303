//! # Data Models
//!
//! SeaORM entities for the Backup Audit schema.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod backup_routine;
pub mod backup_tool;
pub mod backup_validation;
pub mod client;
pub mod routine_server;
pub mod server;
pub mod user;

pub use backup_routine::{Entity as BackupRoutine, Frequency};
pub use backup_tool::Entity as BackupTool;
pub use backup_validation::{Entity as BackupValidation, ValidationStatus};
pub use client::Entity as Client;
pub use routine_server::Entity as RoutineServer;
pub use server::Entity as Server;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "backup-audit".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
