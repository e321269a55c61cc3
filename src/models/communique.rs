//! Communique (press release request) entity.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "communiques")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub organization_id: Uuid,

    pub user_id: Uuid,

    pub client_marque: String,

    pub sujet_principal: String,

    pub date_diffusion: String,

    pub contact_nom: String,

    pub contact_email: String,

    pub contact_telephone: String,

    pub angle: Option<String>,

    pub cibles_media: Option<String>,

    /// pending until the automation engine writes content back.
    pub status: String,

    pub content: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
