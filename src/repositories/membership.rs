//! Organization membership lookups.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::models::org_membership::{self, Entity as OrgMembership};

#[derive(Debug, Clone)]
pub struct MembershipRepository {
    pub db: Arc<DatabaseConnection>,
}

impl MembershipRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The caller's role within `organization_id`, or `None` when they hold
    /// no membership row. This is the only authorization question the API
    /// ever asks.
    pub async fn find_role(&self, user_id: Uuid, organization_id: Uuid) -> Result<Option<String>> {
        let found = OrgMembership::find()
            .filter(org_membership::Column::UserId.eq(user_id))
            .filter(org_membership::Column::OrganizationId.eq(organization_id))
            .one(self.db.as_ref())
            .await?;

        Ok(found.map(|membership| membership.role))
    }

    pub async fn add_member(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: &str,
    ) -> Result<org_membership::Model> {
        let membership = org_membership::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            organization_id: Set(organization_id),
            role: Set(role.to_string()),
            created_at: Set(Utc::now().into()),
        };

        Ok(membership.insert(self.db.as_ref()).await?)
    }
}
