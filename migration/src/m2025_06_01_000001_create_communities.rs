//! Migration to create the communities table.
//!
//! Communities are the tenant unit of the console. The slug is human-assigned
//! and acts as the join key for every tenant-scoped document.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Communities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Communities::Slug)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Communities::Name).text().null())
                    .col(
                        ColumnDef::new(Communities::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Communities::CredentialsCiphertext)
                            .binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Communities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Communities::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Communities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Communities {
    Table,
    Slug,
    Name,
    Status,
    CredentialsCiphertext,
    CreatedAt,
    UpdatedAt,
}
