//! Migration to create the market_watch_documents table.
//!
//! One document per (organization, calendar month); `month_key` is the
//! "YYYY-MM" bucket the idempotency check keys on.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketWatchDocuments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketWatchDocuments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarketWatchDocuments::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketWatchDocuments::MonthKey)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketWatchDocuments::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(MarketWatchDocuments::Content).text().null())
                    .col(
                        ColumnDef::new(MarketWatchDocuments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MarketWatchDocuments::UpdatedAt)
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
                    .name("idx_market_watch_org_month")
                    .table(MarketWatchDocuments::Table)
                    .col(MarketWatchDocuments::OrganizationId)
                    .col(MarketWatchDocuments::MonthKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_market_watch_org_month").to_owned())
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(MarketWatchDocuments::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum MarketWatchDocuments {
    Table,
    Id,
    OrganizationId,
    MonthKey,
    Status,
    Content,
    CreatedAt,
    UpdatedAt,
}
