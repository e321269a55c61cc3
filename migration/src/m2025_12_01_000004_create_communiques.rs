//! Migration to create the communiques table.
//!
//! A communique row is the durable source of truth for a press-release
//! generation request; the automation engine fills in content asynchronously.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Communiques::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Communiques::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Communiques::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Communiques::UserId).uuid().not_null())
                    .col(ColumnDef::new(Communiques::ClientMarque).text().not_null())
                    .col(
                        ColumnDef::new(Communiques::SujetPrincipal)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Communiques::DateDiffusion).text().not_null())
                    .col(ColumnDef::new(Communiques::ContactNom).text().not_null())
                    .col(ColumnDef::new(Communiques::ContactEmail).text().not_null())
                    .col(
                        ColumnDef::new(Communiques::ContactTelephone)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Communiques::Angle).text().null())
                    .col(ColumnDef::new(Communiques::CiblesMedia).text().null())
                    .col(
                        ColumnDef::new(Communiques::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Communiques::Content).text().null())
                    .col(
                        ColumnDef::new(Communiques::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Communiques::UpdatedAt)
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
                    .name("idx_communiques_org_id")
                    .table(Communiques::Table)
                    .col(Communiques::OrganizationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_communiques_org_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Communiques::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Communiques {
    Table,
    Id,
    OrganizationId,
    UserId,
    ClientMarque,
    SujetPrincipal,
    DateDiffusion,
    ContactNom,
    ContactEmail,
    ContactTelephone,
    Angle,
    CiblesMedia,
    Status,
    Content,
    CreatedAt,
    UpdatedAt,
}
