//! Report class - a kind of report and the cadence it is filed at.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report class database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report_classes")]
pub struct Model {
    /// Class code
    #[sea_orm(primary_key, auto_increment = false)]
    pub slug: String,
    /// Display name
    pub name: String,
    /// Implementation identifier of the report form
    #[sea_orm(unique)]
    pub cls: String,
    /// Period type reports of this class are filed for
    pub period_type: String,
    /// `"r"` for regular (entity + period) reports, `"i"` for individual ones
    pub report_type: String,
}

/// Defines relationships between `ReportClass` and other tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Reports of this class
    #[sea_orm(has_many = "super::report::Entity")]
    Reports,
    /// Schedules of this class
    #[sea_orm(has_many = "super::scheduled_reporting::Entity")]
    ScheduledReportings,
    /// Expected reportings of this class
    #[sea_orm(has_many = "super::expected_reporting::Entity")]
    ExpectedReportings,
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl Related<super::scheduled_reporting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduledReportings.def()
    }
}

impl Related<super::expected_reporting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpectedReportings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
