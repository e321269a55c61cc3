//! Media asset entity.
//!
//! Mirrors a third-party media URL into the internal object store. Rows are
//! keyed on (organization, source URL) so repeated ingestion of the same
//! asset converges on one record.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "media_assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub organization_id: Uuid,

    pub source_url: String,

    /// Kind of asset (image, video, ...), as reported by the caller.
    pub source_type: String,

    /// Table the referencing record lives in.
    pub source_table: String,

    pub record_id: String,

    pub storage_path: Option<String>,

    pub content_type: Option<String>,

    pub byte_size: Option<i64>,

    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
