//! Scheduled reporting - an entity's obligation to file a report class.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Scheduled reporting database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scheduled_reportings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Report class to file
    pub report_class_slug: String,
    /// Entity that must file it
    pub entity_id: i64,
    /// Reporting level: 1 = source, 2 = aggregated
    pub level: i32,
    /// First period the schedule applies to, open-ended when NULL
    pub start_period_id: Option<i64>,
    /// Last period the schedule applies to, open-ended when NULL
    pub end_period_id: Option<i64>,
}

/// Defines relationships between `ScheduledReporting` and other tables
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
    /// Start bound
    #[sea_orm(
        belongs_to = "super::period::Entity",
        from = "Column::StartPeriodId",
        to = "super::period::Column::Id"
    )]
    StartPeriod,
    /// End bound
    #[sea_orm(
        belongs_to = "super::period::Entity",
        from = "Column::EndPeriodId",
        to = "super::period::Column::Id"
    )]
    EndPeriod,
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

impl ActiveModelBehavior for ActiveModel {}
