//! Market watch document repository.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::models::market_watch_document::{self, Entity as MarketWatchDocument};

#[derive(Debug, Clone)]
pub struct MarketWatchRepository {
    pub db: Arc<DatabaseConnection>,
}

impl MarketWatchRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The document for `(organization_id, month_key)`, when one exists.
    pub async fn find_by_month(
        &self,
        organization_id: Uuid,
        month_key: &str,
    ) -> Result<Option<market_watch_document::Model>> {
        Ok(MarketWatchDocument::find()
            .filter(market_watch_document::Column::OrganizationId.eq(organization_id))
            .filter(market_watch_document::Column::MonthKey.eq(month_key))
            .one(self.db.as_ref())
            .await?)
    }

    pub async fn create_pending(
        &self,
        organization_id: Uuid,
        month_key: &str,
    ) -> Result<market_watch_document::Model> {
        let now = Utc::now();
        let row = market_watch_document::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            month_key: Set(month_key.to_string()),
            status: Set("pending".to_string()),
            content: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(row.insert(self.db.as_ref()).await?)
    }

    pub async fn set_status(&self, document_id: Uuid, status: &str) -> Result<()> {
        let document = MarketWatchDocument::find_by_id(document_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| anyhow!("market watch document {} not found", document_id))?;

        let mut active: market_watch_document::ActiveModel = document.into();
        active.status = Set(status.to_string());
        active.updated_at = Set(Utc::now().into());
        active.update(self.db.as_ref()).await?;

        Ok(())
    }
}
