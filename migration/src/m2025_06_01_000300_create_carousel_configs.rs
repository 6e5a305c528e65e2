//! Migration to create carousel_configs table.
//!
//! One document per community; saves replace the whole document so readers
//! never observe a half-updated slide list.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CarouselConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CarouselConfigs::CommunitySlug)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CarouselConfigs::Document)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CarouselConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_carousel_configs_community_slug")
                            .from(CarouselConfigs::Table, CarouselConfigs::CommunitySlug)
                            .to(Communities::Table, Communities::Slug)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CarouselConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CarouselConfigs {
    Table,
    CommunitySlug,
    Document,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Communities {
    Table,
    Slug,
}
