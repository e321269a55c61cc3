//! Gmail connection repository.
//!
//! Token plaintext only exists on the stack inside these methods; everything
//! that reaches the database goes through the `TokenCipher` first.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::crypto::{TokenCipher, token_aad};
use crate::models::gmail_connection::{self, Entity as GmailConnection};

#[derive(Clone)]
pub struct GmailConnectionRepository {
    pub db: Arc<DatabaseConnection>,
    cipher: TokenCipher,
}

impl GmailConnectionRepository {
    pub fn new(db: Arc<DatabaseConnection>, cipher: TokenCipher) -> Self {
        Self { db, cipher }
    }

    /// Insert or overwrite the connection for `(organization_id, email)`.
    ///
    /// A reconnect always wins: tokens, expiry and the connecting user are
    /// replaced and the row is reactivated.
    pub async fn upsert(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        email: &str,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<gmail_connection::Model> {
        let aad = token_aad(organization_id, "gmail", email);
        let access_ciphertext = self
            .cipher
            .encrypt(&aad, access_token)
            .map_err(|e| anyhow!("access token encryption failed: {}", e))?;
        let refresh_ciphertext = self
            .cipher
            .encrypt(&aad, refresh_token)
            .map_err(|e| anyhow!("refresh token encryption failed: {}", e))?;

        let now = Utc::now();
        let connection = gmail_connection::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            user_id: Set(user_id),
            email: Set(email.to_string()),
            access_token_ciphertext: Set(access_ciphertext),
            refresh_token_ciphertext: Set(refresh_ciphertext),
            expires_at: Set(expires_at.into()),
            is_active: Set(true),
            connected_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = GmailConnection::insert(connection)
            .on_conflict(
                OnConflict::columns([
                    gmail_connection::Column::OrganizationId,
                    gmail_connection::Column::Email,
                ])
                .update_columns([
                    gmail_connection::Column::UserId,
                    gmail_connection::Column::AccessTokenCiphertext,
                    gmail_connection::Column::RefreshTokenCiphertext,
                    gmail_connection::Column::ExpiresAt,
                    gmail_connection::Column::IsActive,
                    gmail_connection::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await?;

        Ok(model)
    }

    /// The single active connection for a user, optionally scoped to an
    /// organization.
    pub async fn find_active_for_user(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> Result<Option<gmail_connection::Model>> {
        let mut query = GmailConnection::find()
            .filter(gmail_connection::Column::UserId.eq(user_id))
            .filter(gmail_connection::Column::IsActive.eq(true));

        if let Some(org_id) = organization_id {
            query = query.filter(gmail_connection::Column::OrganizationId.eq(org_id));
        }

        Ok(query.one(self.db.as_ref()).await?)
    }

    /// Decrypt `(access_token, refresh_token)` for a stored connection.
    pub fn decrypt_tokens(&self, connection: &gmail_connection::Model) -> Result<(String, String)> {
        let aad = token_aad(connection.organization_id, "gmail", &connection.email);

        let access = self
            .cipher
            .decrypt(&aad, &connection.access_token_ciphertext)
            .map_err(|e| anyhow!("access token decryption failed: {}", e))?;
        let refresh = self
            .cipher
            .decrypt(&aad, &connection.refresh_token_ciphertext)
            .map_err(|e| anyhow!("refresh token decryption failed: {}", e))?;

        Ok((access, refresh))
    }

    /// Store a refreshed access token and its new expiry.
    pub async fn update_access_token(
        &self,
        connection: &gmail_connection::Model,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<gmail_connection::Model> {
        let aad = token_aad(connection.organization_id, "gmail", &connection.email);
        let access_ciphertext = self
            .cipher
            .encrypt(&aad, access_token)
            .map_err(|e| anyhow!("access token encryption failed: {}", e))?;

        let mut active: gmail_connection::ActiveModel = connection.clone().into();
        active.access_token_ciphertext = Set(access_ciphertext);
        active.expires_at = Set(expires_at.into());
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Soft revoke: keep the row but stop every token path through it.
    pub async fn mark_revoked(&self, connection_id: Uuid) -> Result<()> {
        let connection = GmailConnection::find_by_id(connection_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| anyhow!("gmail connection {} not found", connection_id))?;

        let mut active: gmail_connection::ActiveModel = connection.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());
        active.update(self.db.as_ref()).await?;

        Ok(())
    }
}
