//! Meta connection repository.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::crypto::{TokenCipher, token_aad};
use crate::models::meta_connection::{self, Entity as MetaConnection};

/// Everything the callback learned about a Meta account, ready to persist.
pub struct MetaAccountUpsert<'a> {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub email: &'a str,
    pub user_name: Option<&'a str>,
    pub access_token: &'a str,
    pub expires_at: DateTime<Utc>,
    pub ad_account_ids: Vec<String>,
    pub ad_account_details: JsonValue,
    pub business_id: Option<String>,
}

#[derive(Clone)]
pub struct MetaConnectionRepository {
    pub db: Arc<DatabaseConnection>,
    cipher: TokenCipher,
}

impl MetaConnectionRepository {
    pub fn new(db: Arc<DatabaseConnection>, cipher: TokenCipher) -> Self {
        Self { db, cipher }
    }

    /// Insert or overwrite the connection for `(organization_id, email)`.
    pub async fn upsert(&self, upsert: MetaAccountUpsert<'_>) -> Result<meta_connection::Model> {
        let aad = token_aad(upsert.organization_id, "meta", upsert.email);
        let access_ciphertext = self
            .cipher
            .encrypt(&aad, upsert.access_token)
            .map_err(|e| anyhow!("access token encryption failed: {}", e))?;

        let now = Utc::now();
        let connection = meta_connection::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(upsert.organization_id),
            user_id: Set(upsert.user_id),
            email: Set(upsert.email.to_string()),
            user_name: Set(upsert.user_name.map(str::to_string)),
            access_token_ciphertext: Set(access_ciphertext),
            refresh_token_ciphertext: Set(None),
            expires_at: Set(upsert.expires_at.into()),
            ad_account_ids: Set(Some(JsonValue::from(upsert.ad_account_ids))),
            ad_account_details: Set(Some(upsert.ad_account_details)),
            business_id: Set(upsert.business_id),
            is_active: Set(true),
            connected_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = MetaConnection::insert(connection)
            .on_conflict(
                OnConflict::columns([
                    meta_connection::Column::OrganizationId,
                    meta_connection::Column::Email,
                ])
                .update_columns([
                    meta_connection::Column::UserId,
                    meta_connection::Column::UserName,
                    meta_connection::Column::AccessTokenCiphertext,
                    meta_connection::Column::ExpiresAt,
                    meta_connection::Column::AdAccountIds,
                    meta_connection::Column::AdAccountDetails,
                    meta_connection::Column::BusinessId,
                    meta_connection::Column::IsActive,
                    meta_connection::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await?;

        Ok(model)
    }

    /// All active Meta connections, for the internal listing endpoint.
    pub async fn list_active(&self) -> Result<Vec<meta_connection::Model>> {
        Ok(MetaConnection::find()
            .filter(meta_connection::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await?)
    }

    pub fn decrypt_access_token(&self, connection: &meta_connection::Model) -> Result<String> {
        let aad = token_aad(connection.organization_id, "meta", &connection.email);

        self.cipher
            .decrypt(&aad, &connection.access_token_ciphertext)
            .map_err(|e| anyhow!("access token decryption failed: {}", e))
    }
}
