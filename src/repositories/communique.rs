//! Communique repository.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::models::communique;

/// Validated request fields for a new communique row.
pub struct NewCommunique<'a> {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub client_marque: &'a str,
    pub sujet_principal: &'a str,
    pub date_diffusion: &'a str,
    pub contact_nom: &'a str,
    pub contact_email: &'a str,
    pub contact_telephone: &'a str,
    pub angle: Option<&'a str>,
    pub cibles_media: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct CommuniqueRepository {
    pub db: Arc<DatabaseConnection>,
}

impl CommuniqueRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a pending communique; the automation engine fills in content
    /// later.
    pub async fn create(&self, new: NewCommunique<'_>) -> Result<communique::Model> {
        let now = Utc::now();
        let row = communique::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(new.organization_id),
            user_id: Set(new.user_id),
            client_marque: Set(new.client_marque.to_string()),
            sujet_principal: Set(new.sujet_principal.to_string()),
            date_diffusion: Set(new.date_diffusion.to_string()),
            contact_nom: Set(new.contact_nom.to_string()),
            contact_email: Set(new.contact_email.to_string()),
            contact_telephone: Set(new.contact_telephone.to_string()),
            angle: Set(new.angle.map(str::to_string)),
            cibles_media: Set(new.cibles_media.map(str::to_string)),
            status: Set("pending".to_string()),
            content: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(row.insert(self.db.as_ref()).await?)
    }
}
