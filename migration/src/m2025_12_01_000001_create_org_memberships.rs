//! Migration to create the org_memberships table.
//!
//! Membership rows are written by the account-management side of the product;
//! this service only reads them for authorization checks.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrgMemberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrgMemberships::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrgMemberships::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(OrgMemberships::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrgMemberships::Role)
                            .text()
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(OrgMemberships::CreatedAt)
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
                    .name("idx_org_memberships_user_org")
                    .table(OrgMemberships::Table)
                    .col(OrgMemberships::UserId)
                    .col(OrgMemberships::OrganizationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_org_memberships_user_org").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(OrgMemberships::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrgMemberships {
    Table,
    Id,
    UserId,
    OrganizationId,
    Role,
    CreatedAt,
}
