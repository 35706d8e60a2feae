//! Role - a named collection of permissions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    /// Role code (e.g., `"district_manager"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub slug: String,
    /// Display name
    pub name: String,
    /// Optional level hint (entity type slug the role usually targets)
    pub level: Option<String>,
}

/// Defines relationships between Role and other tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Permission assignments of this role
    #[sea_orm(has_many = "super::role_permission::Entity")]
    RolePermissions,
    /// Accesses granting this role
    #[sea_orm(has_many = "super::access::Entity")]
    Accesses,
}

impl Related<super::role_permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RolePermissions.def()
    }
}

impl Related<super::access::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accesses.def()
    }
}

impl Related<super::permission::Entity> for Entity {
    fn to() -> RelationDef {
        super::role_permission::Relation::Permission.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::role_permission::Relation::Role.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
