//! Database migrations for the Backup Audit service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_090000_create_users;
mod m2025_01_10_090100_create_clients;
mod m2025_01_10_090200_create_servers;
mod m2025_01_10_090300_create_backup_tools;
mod m2025_01_10_090400_create_backup_routines;
mod m2025_01_10_090500_create_routine_servers;
mod m2025_01_10_090600_create_backup_validations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_090000_create_users::Migration),
            Box::new(m2025_01_10_090100_create_clients::Migration),
            Box::new(m2025_01_10_090200_create_servers::Migration),
            Box::new(m2025_01_10_090300_create_backup_tools::Migration),
            Box::new(m2025_01_10_090400_create_backup_routines::Migration),
            Box::new(m2025_01_10_090500_create_routine_servers::Migration),
            Box::new(m2025_01_10_090600_create_backup_validations::Migration),
        ]
    }
}
