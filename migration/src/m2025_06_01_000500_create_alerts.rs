//! Migration to create the alerts table.
//!
//! Alerts are resident-submitted emergency signals that only community admins
//! may transition through Active -> Acknowledged -> Resolved.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Alerts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alerts::CommunitySlug).text().not_null())
                    .col(ColumnDef::new(Alerts::Unit).text().not_null())
                    .col(ColumnDef::new(Alerts::SubmitterId).uuid().not_null())
                    .col(ColumnDef::new(Alerts::SubmitterName).text().null())
                    .col(ColumnDef::new(Alerts::SubmitterPhone).text().null())
                    .col(
                        ColumnDef::new(Alerts::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Alerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Alerts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alerts_community_slug")
                            .from(Alerts::Table, Alerts::CommunitySlug)
                            .to(Communities::Table, Communities::Slug)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_alerts_community_slug")
                    .table(Alerts::Table)
                    .col(Alerts::CommunitySlug)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_alerts_community_slug").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    CommunitySlug,
    Unit,
    SubmitterId,
    SubmitterName,
    SubmitterPhone,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Communities {
    Table,
    Slug,
}
