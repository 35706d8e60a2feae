//! Report - data submitted for an entity and a period.
//!
//! Status and type are stored as their string codes; see
//! [`crate::core::report::ReportStatus`] and [`crate::core::report::ReportType`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Class of the report
    pub report_class_slug: String,
    /// `"TYPE_SOURCE"` or `"TYPE_AGGREGATED"`
    pub report_type: String,
    /// Validation status code (e.g., `"STATUS_CLOSED"`)
    pub status: String,
    /// Human-readable receipt, filled right after the first save
    #[sea_orm(unique)]
    pub receipt: Option<String>,
    /// Period reported on
    pub period_id: i64,
    /// Entity reported on
    pub entity_id: i64,
    /// Provider who created the report, never altered
    pub created_by: i64,
    /// Creation date, never altered
    pub created_on: DateTime,
    /// Last provider who edited the report
    pub modified_by: Option<i64>,
    /// Last edition date
    pub modified_on: DateTime,
}

/// Defines relationships between Report and other tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Report class
    #[sea_orm(
        belongs_to = "super::report_class::Entity",
        from = "Column::ReportClassSlug",
        to = "super::report_class::Column::Slug"
    )]
    ReportClass,
    /// Period reported on
    #[sea_orm(
        belongs_to = "super::period::Entity",
        from = "Column::PeriodId",
        to = "super::period::Column::Id"
    )]
    Period,
    /// Entity reported on
    #[sea_orm(
        belongs_to = "super::entity::Entity",
        from = "Column::EntityId",
        to = "super::entity::Column::Id"
    )]
    OrgEntity,
    /// Author
    #[sea_orm(
        belongs_to = "super::provider::Entity",
        from = "Column::CreatedBy",
        to = "super::provider::Column::Id"
    )]
    CreatedBy,
    /// Last editor
    #[sea_orm(
        belongs_to = "super::provider::Entity",
        from = "Column::ModifiedBy",
        to = "super::provider::Column::Id"
    )]
    ModifiedBy,
}

impl Related<super::report_class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportClass.def()
    }
}

impl Related<super::period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Period.def()
    }
}

impl Related<super::entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrgEntity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
