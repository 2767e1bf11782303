//! Migration to create the backup_validations table.
//!
//! Validations cascade with their routine. The validator is protected from
//! deletion while validations reference them; the last editor is cleared.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BackupValidations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BackupValidations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BackupValidations::RoutineId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BackupValidations::UserId).integer().not_null())
                    .col(ColumnDef::new(BackupValidations::EditedById).integer().null())
                    .col(
                        ColumnDef::new(BackupValidations::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackupValidations::Notes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(BackupValidations::EvidencePath)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackupValidations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BackupValidations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_backup_validations_routine_id")
                            .from(BackupValidations::Table, BackupValidations::RoutineId)
                            .to(BackupRoutines::Table, BackupRoutines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_backup_validations_user_id")
                            .from(BackupValidations::Table, BackupValidations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_backup_validations_edited_by_id")
                            .from(BackupValidations::Table, BackupValidations::EditedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Every listing orders by creation time
        manager
            .create_index(
                Index::create()
                    .name("idx_backup_validations_created_at")
                    .table(BackupValidations::Table)
                    .col(BackupValidations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_backup_validations_routine_id")
                    .table(BackupValidations::Table)
                    .col(BackupValidations::RoutineId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_backup_validations_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_backup_validations_routine_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(BackupValidations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BackupValidations {
    Table,
    Id,
    RoutineId,
    UserId,
    EditedById,
    Status,
    Notes,
    EvidencePath,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BackupRoutines {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
