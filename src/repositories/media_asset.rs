//! Media asset repository.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::models::media_asset::{self, Entity as MediaAsset};

/// Outcome of a completed mirror, keyed by the source URL.
pub struct PersistedAsset<'a> {
    pub organization_id: Uuid,
    pub source_url: &'a str,
    pub source_type: &'a str,
    pub source_table: &'a str,
    pub record_id: &'a str,
    pub storage_path: &'a str,
    pub content_type: &'a str,
    pub byte_size: i64,
}

#[derive(Debug, Clone)]
pub struct MediaAssetRepository {
    pub db: Arc<DatabaseConnection>,
}

impl MediaAssetRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a mirrored asset; re-ingesting the same source URL for an
    /// organization updates the existing row.
    pub async fn upsert(&self, asset: PersistedAsset<'_>) -> Result<media_asset::Model> {
        let now = Utc::now();
        let row = media_asset::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(asset.organization_id),
            source_url: Set(asset.source_url.to_string()),
            source_type: Set(asset.source_type.to_string()),
            source_table: Set(asset.source_table.to_string()),
            record_id: Set(asset.record_id.to_string()),
            storage_path: Set(Some(asset.storage_path.to_string())),
            content_type: Set(Some(asset.content_type.to_string())),
            byte_size: Set(Some(asset.byte_size)),
            status: Set("stored".to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = MediaAsset::insert(row)
            .on_conflict(
                OnConflict::columns([
                    media_asset::Column::OrganizationId,
                    media_asset::Column::SourceUrl,
                ])
                .update_columns([
                    media_asset::Column::SourceType,
                    media_asset::Column::SourceTable,
                    media_asset::Column::RecordId,
                    media_asset::Column::StoragePath,
                    media_asset::Column::ContentType,
                    media_asset::Column::ByteSize,
                    media_asset::Column::Status,
                    media_asset::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await?;

        Ok(model)
    }
}
