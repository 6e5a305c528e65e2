//! Migration to create the principals table.
//!
//! Principals are authenticated user records with a role and a community
//! association. Household fields from bulk import live in a JSON column.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Principals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Principals::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Principals::Email).text().not_null())
                    .col(ColumnDef::new(Principals::PasswordHash).text().not_null())
                    .col(ColumnDef::new(Principals::DisplayName).text().null())
                    .col(ColumnDef::new(Principals::Phone).text().null())
                    .col(ColumnDef::new(Principals::PhotoUrl).text().null())
                    .col(
                        ColumnDef::new(Principals::Role)
                            .text()
                            .not_null()
                            .default("resident"),
                    )
                    .col(
                        ColumnDef::new(Principals::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Principals::CommunitySlug).text().null())
                    .col(ColumnDef::new(Principals::Household).json_binary().null())
                    .col(
                        ColumnDef::new(Principals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Principals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Emails must be unique so bulk import can upsert by email.
        manager
            .create_index(
                Index::create()
                    .name("idx_principals_email")
                    .table(Principals::Table)
                    .col(Principals::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Community-scoped listings filter on the slug.
        manager
            .create_index(
                Index::create()
                    .name("idx_principals_community_slug")
                    .table(Principals::Table)
                    .col(Principals::CommunitySlug)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_principals_email").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_principals_community_slug")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Principals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Principals {
    Table,
    Id,
    Email,
    PasswordHash,
    DisplayName,
    Phone,
    PhotoUrl,
    Role,
    Status,
    CommunitySlug,
    Household,
    CreatedAt,
    UpdatedAt,
}
