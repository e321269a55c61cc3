//! Database migrations for the Pressrelay API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_12_01_000001_create_org_memberships;
mod m2025_12_01_000002_create_gmail_connections;
mod m2025_12_01_000003_create_meta_connections;
mod m2025_12_01_000004_create_communiques;
mod m2025_12_01_000005_create_market_watch_documents;
mod m2025_12_01_000006_create_media_assets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_12_01_000001_create_org_memberships::Migration),
            Box::new(m2025_12_01_000002_create_gmail_connections::Migration),
            Box::new(m2025_12_01_000003_create_meta_connections::Migration),
            Box::new(m2025_12_01_000004_create_communiques::Migration),
            Box::new(m2025_12_01_000005_create_market_watch_documents::Migration),
            Box::new(m2025_12_01_000006_create_media_assets::Migration),
        ]
    }
}
