//! Entity type - the level of an organizational unit (facility, district, region...).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Entity type database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_types")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Health Center")
    pub name: String,
    /// Short unique code (e.g., "cscom", "district", "region")
    #[sea_orm(unique)]
    pub slug: String,
}

/// One entity type classifies many entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Entities of this type
    #[sea_orm(has_many = "super::entity::Entity")]
    Entities,
}

impl Related<super::entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
