//! Migration to create the media_assets table.
//!
//! Tracks third-party media mirrored into the internal object store. Keyed on
//! (organization, source URL) so repeated ingestion converges.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MediaAssets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MediaAssets::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MediaAssets::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(MediaAssets::SourceUrl).text().not_null())
                    .col(ColumnDef::new(MediaAssets::SourceType).text().not_null())
                    .col(ColumnDef::new(MediaAssets::SourceTable).text().not_null())
                    .col(ColumnDef::new(MediaAssets::RecordId).text().not_null())
                    .col(ColumnDef::new(MediaAssets::StoragePath).text().null())
                    .col(ColumnDef::new(MediaAssets::ContentType).text().null())
                    .col(ColumnDef::new(MediaAssets::ByteSize).big_integer().null())
                    .col(
                        ColumnDef::new(MediaAssets::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(MediaAssets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MediaAssets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_assets_org_source_url")
                    .table(MediaAssets::Table)
                    .col(MediaAssets::OrganizationId)
                    .col(MediaAssets::SourceUrl)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_media_assets_org_source_url")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(MediaAssets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MediaAssets {
    Table,
    Id,
    OrganizationId,
    SourceUrl,
    SourceType,
    SourceTable,
    RecordId,
    StoragePath,
    ContentType,
    ByteSize,
    Status,
    CreatedAt,
    UpdatedAt,
}
