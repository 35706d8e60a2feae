//! Entity - a node of the organizational hierarchy.
//!
//! Entities form a tree through `parent_id`: a country holds regions,
//! regions hold districts, districts hold health facilities. The tree is
//! walked breadth-first by [`crate::core::entity`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Entity database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entities")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Short unique code, used in receipts and cache keys
    #[sea_orm(unique)]
    pub slug: String,
    /// Type (level) of this entity
    pub entity_type_id: i64,
    /// Contact phone number, NULL when not filled
    #[sea_orm(unique)]
    pub phone_number: Option<String>,
    /// Parent entity, NULL for roots
    pub parent_id: Option<i64>,
}

/// Defines relationships between Entity and other tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entity has one type
    #[sea_orm(
        belongs_to = "super::entity_type::Entity",
        from = "Column::EntityTypeId",
        to = "super::entity_type::Column::Id"
    )]
    EntityType,
    /// Parent node in the hierarchy
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
}

impl Related<super::entity_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EntityType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
