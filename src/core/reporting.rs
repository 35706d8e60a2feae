//! Reporting schedule - report classes, scheduled and expected reportings.
//!
//! A scheduled reporting says that an entity must report a class of report,
//! optionally between two periods. Expected reportings materialize that
//! schedule for a concrete period so that completeness can be measured.

use crate::{
    core::{
        calendar::{Period, PeriodType},
        period::{find_or_create_by_date, get_period},
    },
    entities::{
        ExpectedReporting, OrgEntity, ReportClass, ScheduledReporting, entity, expected_reporting,
        period, report_class, scheduled_reporting,
    },
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::fmt;
use tracing::{debug, info};

/// Report type code of regular (per-entity) report classes.
pub const REGULAR: &str = "r";
/// Report type code of individual (per-person) report classes.
pub const INDIVIDUAL: &str = "i";

/// Fields of a new report class.
#[derive(Debug, Clone)]
pub struct NewReportClass {
    /// Unique slug
    pub slug: String,
    /// Display name
    pub name: String,
    /// Unique identifier of the report implementation
    pub cls: String,
    /// Cadence of the reports
    pub period_type: PeriodType,
    /// [`REGULAR`] or [`INDIVIDUAL`]
    pub report_type: String,
}

/// Creates a report class.
pub async fn create_report_class<C>(db: &C, new: NewReportClass) -> Result<report_class::Model>
where
    C: ConnectionTrait,
{
    if new.slug.trim().is_empty() || new.cls.trim().is_empty() {
        return Err(Error::Validation {
            message: "Report class slug and cls cannot be empty".to_string(),
        });
    }
    if new.report_type != REGULAR && new.report_type != INDIVIDUAL {
        return Err(Error::Validation {
            message: format!("Unknown report type `{}`", new.report_type),
        });
    }

    let created = report_class::ActiveModel {
        slug: Set(new.slug),
        name: Set(new.name),
        cls: Set(new.cls),
        period_type: Set(new.period_type.as_str().to_string()),
        report_type: Set(new.report_type),
    }
    .insert(db)
    .await?;
    info!("Created report class {}", created.slug);
    Ok(created)
}

/// Finds a report class by slug.
pub async fn get_report_class<C>(db: &C, slug: &str) -> Result<Option<report_class::Model>>
where
    C: ConnectionTrait,
{
    ReportClass::find_by_id(slug.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a report class by slug, failing with [`Error::ReportClassNotFound`].
pub async fn require_report_class<C>(db: &C, slug: &str) -> Result<report_class::Model>
where
    C: ConnectionTrait,
{
    get_report_class(db, slug)
        .await?
        .ok_or_else(|| Error::ReportClassNotFound {
            slug: slug.to_string(),
        })
}

/// Cadence of a report class.
pub fn class_period_type(report_class: &report_class::Model) -> Result<PeriodType> {
    report_class.period_type.parse()
}

/// Whether reports of this class are per person rather than per entity.
#[must_use]
pub fn is_individual(report_class: &report_class::Model) -> bool {
    report_class.report_type == INDIVIDUAL
}

/// Who is expected to produce a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingLevel {
    /// Data collected at the entity itself
    Source = 1,
    /// Data aggregated from child entities
    Aggregated = 2,
}

impl ReportingLevel {
    /// Stored integer value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Level from its stored value.
    #[must_use]
    pub const fn from_i32(level: i32) -> Option<Self> {
        match level {
            1 => Some(Self::Source),
            2 => Some(Self::Aggregated),
            _ => None,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn verbose_name(self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Aggregated => "Aggregated",
        }
    }
}

impl fmt::Display for ReportingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verbose_name())
    }
}

/// Name of a stored level, `n/a` when unknown.
#[must_use]
pub fn verbose_level(level: i32) -> &'static str {
    ReportingLevel::from_i32(level).map_or("n/a", ReportingLevel::verbose_name)
}

/// Schedules `report_class_slug` for `entity`, replacing any previous schedule
/// of that class for the entity.
pub async fn schedule_reporting<C>(
    db: &C,
    report_class_slug: &str,
    entity: &entity::Model,
    level: ReportingLevel,
    start: Option<&period::Model>,
    end: Option<&period::Model>,
) -> Result<scheduled_reporting::Model>
where
    C: ConnectionTrait,
{
    require_report_class(db, report_class_slug).await?;
    if let (Some(start), Some(end)) = (start, end) {
        if end.end_on < start.start_on {
            return Err(Error::InvalidPeriod {
                message: "schedule ends before it starts".to_string(),
            });
        }
    }

    let existing = ScheduledReporting::find()
        .filter(scheduled_reporting::Column::ReportClassSlug.eq(report_class_slug))
        .filter(scheduled_reporting::Column::EntityId.eq(entity.id))
        .one(db)
        .await?;

    let saved = match existing {
        Some(existing) => {
            let mut row: scheduled_reporting::ActiveModel = existing.into();
            row.level = Set(level.as_i32());
            row.start_period_id = Set(start.map(|p| p.id));
            row.end_period_id = Set(end.map(|p| p.id));
            row.update(db).await?
        }
        None => {
            scheduled_reporting::ActiveModel {
                report_class_slug: Set(report_class_slug.to_string()),
                entity_id: Set(entity.id),
                level: Set(level.as_i32()),
                start_period_id: Set(start.map(|p| p.id)),
                end_period_id: Set(end.map(|p| p.id)),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };
    debug!("Scheduled {} for {} ({})", report_class_slug, entity.slug, level);
    Ok(saved)
}

/// Schedules of a report class, by entity.
pub async fn schedules_for<C>(
    db: &C,
    report_class_slug: &str,
) -> Result<Vec<scheduled_reporting::Model>>
where
    C: ConnectionTrait,
{
    ScheduledReporting::find()
        .filter(scheduled_reporting::Column::ReportClassSlug.eq(report_class_slug))
        .order_by_asc(scheduled_reporting::Column::EntityId)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn casted<C>(
    db: &C,
    schedule: &scheduled_reporting::Model,
    period_id: Option<i64>,
    pick: fn(&period::Model) -> NaiveDateTime,
) -> Result<Option<Period>>
where
    C: ConnectionTrait,
{
    let Some(period_id) = period_id else {
        return Ok(None);
    };
    let stored = get_period(db, period_id).await?;
    let report_class = require_report_class(db, &schedule.report_class_slug).await?;
    Period::containing(class_period_type(&report_class)?, pick(&stored)).map(Some)
}

/// Schedule start recast into the class's cadence.
///
/// A monthly class scheduled from a week starting on the 30th starts with
/// that month.
pub async fn casted_start<C>(
    db: &C,
    schedule: &scheduled_reporting::Model,
) -> Result<Option<Period>>
where
    C: ConnectionTrait,
{
    casted(db, schedule, schedule.start_period_id, |p| p.start_on).await
}

/// Schedule end recast into the class's cadence.
pub async fn casted_end<C>(db: &C, schedule: &scheduled_reporting::Model) -> Result<Option<Period>>
where
    C: ConnectionTrait,
{
    casted(db, schedule, schedule.end_period_id, |p| p.end_on).await
}

/// Whether `period` lies within the (casted) bounds of a schedule.
pub async fn schedule_covers<C>(
    db: &C,
    schedule: &scheduled_reporting::Model,
    period: &Period,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    if let Some(start) = casted_start(db, schedule).await? {
        if period.start_on < start.start_on {
            return Ok(false);
        }
    }
    if let Some(end) = casted_end(db, schedule).await? {
        if period.end_on > end.end_on {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Outcome of [`generate_expected_reportings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpectedSummary {
    /// Schedules examined
    pub scheduled: usize,
    /// Rows inserted
    pub created: usize,
    /// Rows that already existed
    pub existing: usize,
    /// Schedules whose bounds exclude the period
    pub skipped: usize,
}

/// Creates the expected reportings of every schedule for the period of its
/// class containing `at`.
///
/// Runs in one transaction and may be run repeatedly: existing rows are kept.
pub async fn generate_expected_reportings(
    db: &DatabaseConnection,
    at: NaiveDateTime,
) -> Result<ExpectedSummary> {
    let txn = db.begin().await?;
    let mut summary = ExpectedSummary::default();

    let schedules = ScheduledReporting::find()
        .order_by_asc(scheduled_reporting::Column::Id)
        .all(&txn)
        .await?;

    for schedule in schedules {
        summary.scheduled += 1;

        let report_class = require_report_class(&txn, &schedule.report_class_slug).await?;
        let period_type = class_period_type(&report_class)?;
        let stored = find_or_create_by_date(&txn, period_type, at).await?;
        let bucket = Period {
            start_on: stored.start_on,
            end_on: stored.end_on,
            period_type,
        };

        if !schedule_covers(&txn, &schedule, &bucket).await? {
            summary.skipped += 1;
            continue;
        }

        let existing = ExpectedReporting::find()
            .filter(
                expected_reporting::Column::ReportClassSlug
                    .eq(schedule.report_class_slug.as_str()),
            )
            .filter(expected_reporting::Column::EntityId.eq(schedule.entity_id))
            .filter(expected_reporting::Column::PeriodId.eq(stored.id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            summary.existing += 1;
            continue;
        }

        expected_reporting::ActiveModel {
            report_class_slug: Set(schedule.report_class_slug.clone()),
            entity_id: Set(schedule.entity_id),
            period_id: Set(stored.id),
            level: Set(schedule.level),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        summary.created += 1;
    }

    txn.commit().await?;
    info!(
        "Expected reportings for {}: {} created, {} existing, {} skipped",
        at.date(),
        summary.created,
        summary.existing,
        summary.skipped
    );
    Ok(summary)
}

/// Expected reportings of a class for a period, for the given entities
/// (all entities when `entity_ids` is `None`).
pub async fn expected_for<C>(
    db: &C,
    report_class_slug: &str,
    period_id: i64,
    entity_ids: Option<&[i64]>,
) -> Result<Vec<expected_reporting::Model>>
where
    C: ConnectionTrait,
{
    let mut query = ExpectedReporting::find()
        .filter(expected_reporting::Column::ReportClassSlug.eq(report_class_slug))
        .filter(expected_reporting::Column::PeriodId.eq(period_id));
    if let Some(ids) = entity_ids {
        query = query.filter(expected_reporting::Column::EntityId.is_in(ids.iter().copied()));
    }
    query
        .order_by_asc(expected_reporting::Column::EntityId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Removes every expected reporting of an entity. Returns the number of rows deleted.
pub async fn delete_expected_for<C>(db: &C, entity_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    OrgEntity::find_by_id(entity_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::EntityNotFound {
            slug: entity_id.to_string(),
        })?;

    let deleted = ExpectedReporting::delete_many()
        .filter(expected_reporting::Column::EntityId.eq(entity_id))
        .exec(db)
        .await?;
    Ok(deleted.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::period::{find_or_create_from, save_period};
    use crate::test_utils::{create_test_report_class, setup_test_db, setup_with_hierarchy};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_report_class_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_report_class(&db, "malaria", PeriodType::Month).await?;
        assert_eq!(class_period_type(&created)?, PeriodType::Month);
        assert!(!is_individual(&created));

        let bad_type = create_report_class(
            &db,
            NewReportClass {
                slug: "nut".to_string(),
                name: "Nutrition".to_string(),
                cls: "nut.NutReport".to_string(),
                period_type: PeriodType::Week,
                report_type: "x".to_string(),
            },
        )
        .await;
        assert!(matches!(bad_type, Err(Error::Validation { .. })));
        assert!(matches!(
            require_report_class(&db, "nut").await,
            Err(Error::ReportClassNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_reporting_levels() {
        assert_eq!(ReportingLevel::from_i32(2), Some(ReportingLevel::Aggregated));
        assert_eq!(ReportingLevel::Source.as_i32(), 1);
        assert_eq!(verbose_level(1), "Source");
        assert_eq!(verbose_level(7), "n/a");
    }

    #[tokio::test]
    async fn test_schedule_is_replaced_and_casted() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_test_report_class(&db, "malaria", PeriodType::Month).await?;

        let week = save_period(&db, &Period::from_weeknum(2011, 26, false)?).await?;
        let first = schedule_reporting(
            &db,
            "malaria",
            &tree.facility,
            ReportingLevel::Source,
            None,
            None,
        )
        .await?;
        let second = schedule_reporting(
            &db,
            "malaria",
            &tree.facility,
            ReportingLevel::Aggregated,
            Some(&week),
            None,
        )
        .await?;
        assert_eq!(first.id, second.id);
        assert_eq!(second.level, 2);
        assert_eq!(schedules_for(&db, "malaria").await?.len(), 1);

        // Week 26 of 2011 starts on June 27th
        assert_eq!(casted_start(&db, &second).await?, Some(Period::from_month(2011, 6)?));
        assert_eq!(casted_end(&db, &second).await?, None);

        assert!(schedule_covers(&db, &second, &Period::from_month(2011, 6)?).await?);
        assert!(!schedule_covers(&db, &second, &Period::from_month(2011, 5)?).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_expected_reportings() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_test_report_class(&db, "malaria", PeriodType::Month).await?;
        create_test_report_class(&db, "yearly", PeriodType::Year).await?;

        let june = find_or_create_from(&db, PeriodType::Month, 2011, Some(6), None).await?;
        let schedules = [
            ("malaria", &tree.facility, ReportingLevel::Source, None),
            ("malaria", &tree.district, ReportingLevel::Aggregated, None),
            ("malaria", &tree.region, ReportingLevel::Aggregated, Some(&june)),
            ("yearly", &tree.country, ReportingLevel::Aggregated, None),
        ];
        for (class, entity, level, end) in schedules {
            schedule_reporting(&db, class, entity, level, None, end).await?;
        }

        let summary = generate_expected_reportings(&db, at(2011, 7, 14)).await?;
        assert_eq!(
            summary,
            ExpectedSummary {
                scheduled: 4,
                created: 3,
                existing: 0,
                skipped: 1,
            }
        );

        let again = generate_expected_reportings(&db, at(2011, 7, 2)).await?;
        assert_eq!(again.created, 0);
        assert_eq!(again.existing, 3);

        let july = find_or_create_from(&db, PeriodType::Month, 2011, Some(7), None).await?;
        let expected = expected_for(&db, "malaria", july.id, None).await?;
        assert_eq!(expected.len(), 2);
        let only_facility = expected_for(
            &db,
            "malaria",
            july.id,
            Some(std::slice::from_ref(&tree.facility.id)),
        )
        .await?;
        assert_eq!(only_facility.len(), 1);
        assert_eq!(only_facility[0].level, ReportingLevel::Source.as_i32());

        assert_eq!(delete_expected_for(&db, tree.facility.id).await?, 1);
        assert_eq!(expected_for(&db, "malaria", july.id, None).await?.len(), 1);
        Ok(())
    }
}
