//! Migration to create button_configs table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ButtonConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ButtonConfigs::CommunitySlug)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ButtonConfigs::Document)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ButtonConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_button_configs_community_slug")
                            .from(ButtonConfigs::Table, ButtonConfigs::CommunitySlug)
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
            .drop_table(Table::drop().table(ButtonConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ButtonConfigs {
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
