//! Migration to create the clients table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clients::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Clients::LegalName).string_len(200).not_null())
                    .col(ColumnDef::new(Clients::TradeName).string_len(150).not_null())
                    .col(
                        ColumnDef::new(Clients::TaxId)
                            .string_len(18)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Clients::TechnicalContact)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Clients::ContactEmail).string_len(254).not_null())
                    .col(
                        ColumnDef::new(Clients::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Clients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Clients::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // The dashboard lists active clients only
        manager
            .create_index(
                Index::create()
                    .name("idx_clients_active")
                    .table(Clients::Table)
                    .col(Clients::Active)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_clients_active").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
    LegalName,
    TradeName,
    TaxId,
    TechnicalContact,
    ContactEmail,
    Active,
    CreatedAt,
    UpdatedAt,
}
