//! Migration to create the gmail_connections table.
//!
//! Stores one linked Gmail account per (organization, email), with encrypted
//! access and refresh tokens. Rows are soft-revoked via `is_active`, never
//! deleted, when the provider reports the grant as revoked.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GmailConnections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GmailConnections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GmailConnections::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GmailConnections::UserId).uuid().not_null())
                    .col(ColumnDef::new(GmailConnections::Email).text().not_null())
                    .col(
                        ColumnDef::new(GmailConnections::AccessTokenCiphertext)
                            .binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GmailConnections::RefreshTokenCiphertext)
                            .binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GmailConnections::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GmailConnections::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GmailConnections::ConnectedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(GmailConnections::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Upsert key: one connection per (organization, provider email)
        manager
            .create_index(
                Index::create()
                    .name("idx_gmail_connections_org_email")
                    .table(GmailConnections::Table)
                    .col(GmailConnections::OrganizationId)
                    .col(GmailConnections::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gmail_connections_user_id")
                    .table(GmailConnections::Table)
                    .col(GmailConnections::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_gmail_connections_org_email")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_gmail_connections_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(GmailConnections::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GmailConnections {
    Table,
    Id,
    OrganizationId,
    UserId,
    Email,
    AccessTokenCiphertext,
    RefreshTokenCiphertext,
    ExpiresAt,
    IsActive,
    ConnectedAt,
    UpdatedAt,
}
