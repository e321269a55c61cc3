//! Meta (Facebook) connection entity.
//!
//! Alongside tokens this row carries the ad-account inventory discovered at
//! connect time. `ad_account_ids` is a JSON array of `act_<id>` strings;
//! `ad_account_details` keeps the richer per-account objects.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "meta_connections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub organization_id: Uuid,

    pub user_id: Uuid,

    /// Email from the Graph profile, or `<provider-id>@facebook.local` when
    /// the provider omits one.
    pub email: String,

    /// Display name from the Graph profile.
    pub user_name: Option<String>,

    pub access_token_ciphertext: Vec<u8>,

    pub refresh_token_ciphertext: Option<Vec<u8>>,

    pub expires_at: DateTimeWithTimeZone,

    #[sea_orm(column_type = "JsonBinary")]
    pub ad_account_ids: Option<JsonValue>,

    #[sea_orm(column_type = "JsonBinary")]
    pub ad_account_details: Option<JsonValue>,

    /// First business the accounts were enumerated from, when any.
    pub business_id: Option<String>,

    pub is_active: bool,

    pub connected_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
