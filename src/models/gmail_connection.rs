//! Gmail connection entity.
//!
//! One row per (organization, mailbox). Tokens are stored as AES-256-GCM
//! ciphertexts (see `crypto`); `is_active = false` marks a soft-revoked
//! connection whose refresh token the provider no longer honors.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gmail_connections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub organization_id: Uuid,

    /// User who completed the OAuth flow.
    pub user_id: Uuid,

    /// Mailbox address reported by Google's user-info endpoint.
    pub email: String,

    pub access_token_ciphertext: Vec<u8>,

    pub refresh_token_ciphertext: Vec<u8>,

    /// Access token expiry as reported by the token endpoint.
    pub expires_at: DateTimeWithTimeZone,

    pub is_active: bool,

    pub connected_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
