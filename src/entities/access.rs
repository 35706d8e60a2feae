//! Access - a role bound to a target entity.
//!
//! An access grants nothing by itself; it is assigned to providers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accesses")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Role granted
    pub role_slug: String,
    /// Entity the role applies to (and its descendants)
    pub entity_id: i64,
}

/// Defines relationships between Access and other tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Granted role
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleSlug",
        to = "super::role::Column::Slug"
    )]
    Role,
    /// Target entity
    #[sea_orm(
        belongs_to = "super::entity::Entity",
        from = "Column::EntityId",
        to = "super::entity::Column::Id"
    )]
    Target,
    /// Providers holding this access
    #[sea_orm(has_many = "super::provider::Entity")]
    Providers,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Target.def()
    }
}

impl Related<super::provider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Providers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
