//! Role/permission join table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role permission database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role_permissions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Role holding the permission
    pub role_slug: String,
    /// Permission held
    pub permission_slug: String,
}

/// Each row links one role to one permission
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Role side
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleSlug",
        to = "super::role::Column::Slug"
    )]
    Role,
    /// Permission side
    #[sea_orm(
        belongs_to = "super::permission::Entity",
        from = "Column::PermissionSlug",
        to = "super::permission::Column::Slug"
    )]
    Permission,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Permission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
