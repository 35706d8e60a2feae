//! Expected reporting - a report an entity owes for a given period.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expected reporting database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expected_reportings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Report class owed
    pub report_class_slug: String,
    /// Entity owing the report
    pub entity_id: i64,
    /// Period the report is owed for
    pub period_id: i64,
    /// Reporting level: 1 = source, 2 = aggregated
    pub level: i32,
}

/// Defines relationships between `ExpectedReporting` and other tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Report class
    #[sea_orm(
        belongs_to = "super::report_class::Entity",
        from = "Column::ReportClassSlug",
        to = "super::report_class::Column::Slug"
    )]
    ReportClass,
    /// Reporting entity
    #[sea_orm(
        belongs_to = "super::entity::Entity",
        from = "Column::EntityId",
        to = "super::entity::Column::Id"
    )]
    OrgEntity,
    /// Period
    #[sea_orm(
        belongs_to = "super::period::Entity",
        from = "Column::PeriodId",
        to = "super::period::Column::Id"
    )]
    Period,
}

impl Related<super::report_class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportClass.def()
    }
}

impl Related<super::entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrgEntity.def()
    }
}

impl Related<super::period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Period.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
