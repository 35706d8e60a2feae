//! Provider - a user account submitting or validating reports.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Provider database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name
    #[sea_orm(unique)]
    pub username: String,
    /// First name, may be empty
    pub first_name: String,
    /// Last name, may be empty
    pub last_name: String,
    /// E-mail address
    pub email: Option<String>,
    /// Main phone number
    #[sea_orm(unique)]
    pub phone_number: Option<String>,
    /// Secondary phone number
    pub phone_number_extra: Option<String>,
    /// Access (role on entity) held by this provider
    pub access_id: i64,
    /// Inactive providers keep their history but hold no permission
    pub is_active: bool,
    /// When the account was created
    pub created_on: DateTime,
}

/// Defines relationships between Provider and other tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Held access
    #[sea_orm(
        belongs_to = "super::access::Entity",
        from = "Column::AccessId",
        to = "super::access::Column::Id"
    )]
    Access,
}

impl Related<super::access::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Access.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
