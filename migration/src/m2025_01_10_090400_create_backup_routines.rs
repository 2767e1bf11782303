//! Migration to create the backup_routines table.
//!
//! Routines are descriptive only: frequency, execution time and retention are
//! stored for display and never drive any execution.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BackupRoutines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BackupRoutines::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BackupRoutines::ClientId).integer().null())
                    .col(ColumnDef::new(BackupRoutines::ToolId).integer().not_null())
                    .col(
                        ColumnDef::new(BackupRoutines::Description)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackupRoutines::Frequency)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(BackupRoutines::ExecutionTime).time().not_null())
                    .col(
                        ColumnDef::new(BackupRoutines::RetentionDays)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackupRoutines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BackupRoutines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_backup_routines_client_id")
                            .from(BackupRoutines::Table, BackupRoutines::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_backup_routines_tool_id")
                            .from(BackupRoutines::Table, BackupRoutines::ToolId)
                            .to(BackupTools::Table, BackupTools::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_backup_routines_client_id")
                    .table(BackupRoutines::Table)
                    .col(BackupRoutines::ClientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_backup_routines_client_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(BackupRoutines::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BackupRoutines {
    Table,
    Id,
    ClientId,
    ToolId,
    Description,
    Frequency,
    ExecutionTime,
    RetentionDays,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum BackupTools {
    Table,
    Id,
}
