//! Period - a persisted calendar bucket.
//!
//! Rows are memoized by [`crate::core::period`]: the same
//! `(start_on, end_on, period_type)` triple is stored once.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Period database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "periods")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// First instant of the period
    pub start_on: DateTime,
    /// Last instant of the period (inclusive)
    pub end_on: DateTime,
    /// Bucket kind: `"day"`, `"week"`, `"month"`, `"quarter"`, `"semester"`, `"year"` or `"custom"`
    pub period_type: String,
}

/// Periods are referenced by reports and reporting schedules
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Reports filed for this period
    #[sea_orm(has_many = "super::report::Entity")]
    Reports,
    /// Expected reportings for this period
    #[sea_orm(has_many = "super::expected_reporting::Entity")]
    ExpectedReportings,
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl Related<super::expected_reporting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpectedReportings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
