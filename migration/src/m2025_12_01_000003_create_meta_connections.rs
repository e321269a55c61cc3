//! Migration to create the meta_connections table.
//!
//! Stores one linked Meta (Facebook) ads account per (organization, email),
//! with an encrypted long-lived access token and the discovered ad-account
//! metadata.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MetaConnections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MetaConnections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MetaConnections::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MetaConnections::UserId).uuid().not_null())
                    .col(ColumnDef::new(MetaConnections::Email).text().not_null())
                    .col(ColumnDef::new(MetaConnections::UserName).text().null())
                    .col(
                        ColumnDef::new(MetaConnections::AccessTokenCiphertext)
                            .binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MetaConnections::RefreshTokenCiphertext)
                            .binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MetaConnections::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MetaConnections::AdAccountIds)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MetaConnections::AdAccountDetails)
                            .json_binary()
                            .null(),
                    )
                    .col(ColumnDef::new(MetaConnections::BusinessId).text().null())
                    .col(
                        ColumnDef::new(MetaConnections::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(MetaConnections::ConnectedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MetaConnections::UpdatedAt)
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
                    .name("idx_meta_connections_org_email")
                    .table(MetaConnections::Table)
                    .col(MetaConnections::OrganizationId)
                    .col(MetaConnections::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meta_connections_org_id")
                    .table(MetaConnections::Table)
                    .col(MetaConnections::OrganizationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_meta_connections_org_email")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_meta_connections_org_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(MetaConnections::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MetaConnections {
    Table,
    Id,
    OrganizationId,
    UserId,
    Email,
    UserName,
    AccessTokenCiphertext,
    RefreshTokenCiphertext,
    ExpiresAt,
    AdAccountIds,
    AdAccountDetails,
    BusinessId,
    IsActive,
    ConnectedAt,
    UpdatedAt,
}
