//! Migration to create the routine_servers join table.
//!
//! Holds the many-to-many set of servers a routine backs up.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RoutineServers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RoutineServers::RoutineId).integer().not_null())
                    .col(ColumnDef::new(RoutineServers::ServerId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_routine_servers")
                            .col(RoutineServers::RoutineId)
                            .col(RoutineServers::ServerId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routine_servers_routine_id")
                            .from(RoutineServers::Table, RoutineServers::RoutineId)
                            .to(BackupRoutines::Table, BackupRoutines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routine_servers_server_id")
                            .from(RoutineServers::Table, RoutineServers::ServerId)
                            .to(Servers::Table, Servers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_routine_servers_server_id")
                    .table(RoutineServers::Table)
                    .col(RoutineServers::ServerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_routine_servers_server_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(RoutineServers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RoutineServers {
    Table,
    RoutineId,
    ServerId,
}

#[derive(DeriveIden)]
enum BackupRoutines {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Servers {
    Table,
    Id,
}
