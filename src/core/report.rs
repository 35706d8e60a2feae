//! Reports - status-tracked data submitted for an entity and a period.
//!
//! Every saved report gets a receipt, a short human-readable code that can be
//! read back over the phone: `{id}/{entity}-{day of year}-{day of week}`.

use crate::{
    core::{
        access::require_permission,
        entity::{ancestors, get_entity_by_id, get_entity_type_by_slug},
        period::get_period,
        provider::get_provider,
        reporting::require_report_class,
    },
    entities::{Report, provider, report},
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::{fmt, str::FromStr};
use tracing::info;

/// Day-of-week letters, Sunday first (Dimanche, Lundi, Mardi, mErcredi, …).
const DOW: [char; 7] = ['D', 'L', 'M', 'E', 'J', 'V', 'S'];

/// Permission required to validate a report.
pub const CAN_VALIDATE_REPORT: &str = "can_validate_report";

/// Default region code of regional receipts.
const DEFAULT_REGION_CODE: &str = "ML";

/// Validation status of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportStatus {
    /// Not saved yet
    Unsaved,
    /// Saved, not reviewed
    Created,
    /// Missing data
    Incomplete,
    /// Inconsistent data
    Erroneous,
    /// All data present
    Complete,
    /// Accepted by a validator
    Validated,
    /// Locked
    Closed,
    /// Edited by its author after submission
    ModifiedAuthor,
    /// Edited by a validator
    ModifiedValidator,
    /// Validated automatically after the validation window
    AutoValidated,
}

impl ReportStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Unsaved,
        Self::Created,
        Self::Incomplete,
        Self::Erroneous,
        Self::Complete,
        Self::Validated,
        Self::Closed,
        Self::ModifiedAuthor,
        Self::ModifiedValidator,
        Self::AutoValidated,
    ];

    /// Stored code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unsaved => "STATUS_UNSAVED",
            Self::Created => "STATUS_CREATED",
            Self::Incomplete => "STATUS_INCOMPLETE",
            Self::Erroneous => "STATUS_ERRONEOUS",
            Self::Complete => "STATUS_COMPLETE",
            Self::Validated => "STATUS_VALIDATED",
            Self::Closed => "STATUS_CLOSED",
            Self::ModifiedAuthor => "STATUS_MODIFIED_AUTHOR",
            Self::ModifiedValidator => "STATUS_MODIFIED_VALIDATOR",
            Self::AutoValidated => "STATUS_AUTO_VALIDATED",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unsaved => "Unsaved",
            Self::Created => "Created",
            Self::Incomplete => "Incomplete",
            Self::Erroneous => "Erroneous",
            Self::Complete => "Complete",
            Self::Validated => "Validated",
            Self::Closed => "Closed",
            Self::ModifiedAuthor => "Modified by author",
            Self::ModifiedValidator => "Modified by validator",
            Self::AutoValidated => "Auto-validated",
        }
    }

    /// Statuses awaiting validation.
    #[must_use]
    pub const fn unvalidated() -> &'static [Self] {
        &[
            Self::Unsaved,
            Self::Created,
            Self::Incomplete,
            Self::Erroneous,
            Self::Complete,
            Self::ModifiedAuthor,
            Self::ModifiedValidator,
        ]
    }

    /// Statuses past validation.
    #[must_use]
    pub const fn validated() -> &'static [Self] {
        &[Self::Validated, Self::Closed, Self::AutoValidated]
    }

    /// Statuses of reports holding all their data.
    #[must_use]
    pub const fn complete() -> &'static [Self] {
        &[
            Self::Complete,
            Self::Validated,
            Self::Closed,
            Self::ModifiedAuthor,
            Self::ModifiedValidator,
            Self::AutoValidated,
        ]
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportStatus {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == code)
            .ok_or_else(|| Error::Validation {
                message: format!("Unknown report status `{code}`"),
            })
    }
}

/// Group of statuses used to filter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusGroup {
    /// See [`ReportStatus::unvalidated`]
    Unvalidated,
    /// See [`ReportStatus::validated`]
    Validated,
    /// See [`ReportStatus::complete`]
    Complete,
}

impl StatusGroup {
    /// Statuses in the group.
    #[must_use]
    pub const fn statuses(self) -> &'static [ReportStatus] {
        match self {
            Self::Unvalidated => ReportStatus::unvalidated(),
            Self::Validated => ReportStatus::validated(),
            Self::Complete => ReportStatus::complete(),
        }
    }
}

/// Whether a report was collected at the entity or aggregated from below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
    /// Collected at the entity
    Source,
    /// Sum of child entities' reports
    Aggregated,
}

impl ReportType {
    /// Stored code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "TYPE_SOURCE",
            Self::Aggregated => "TYPE_AGGREGATED",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Aggregated => "Aggregated",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportType {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        match code {
            "TYPE_SOURCE" => Ok(Self::Source),
            "TYPE_AGGREGATED" => Ok(Self::Aggregated),
            other => Err(Error::Validation {
                message: format!("Unknown report type `{other}`"),
            }),
        }
    }
}

/// Fields of a new report.
#[derive(Debug, Clone)]
pub struct NewReport {
    /// Report class
    pub report_class_slug: String,
    /// Source or aggregated
    pub report_type: ReportType,
    /// Period reported on; must match the class's cadence
    pub period_id: i64,
    /// Entity reported on
    pub entity_id: i64,
    /// Author
    pub created_by: i64,
    /// Initial status; [`ReportStatus::Unsaved`] becomes [`ReportStatus::Closed`]
    pub status: ReportStatus,
    /// Submission date, now when `None`
    pub created_on: Option<NaiveDateTime>,
}

/// Receipt of a report: `{id}/{entity slug}-{day of year}-{day of week}`.
#[must_use]
pub fn generate_receipt(report_id: i64, entity_slug: &str, created_on: NaiveDateTime) -> String {
    format!(
        "{report_id}/{entity_slug}-{}-{}",
        created_on.format("%j"),
        DOW[created_on.weekday().num_days_from_sunday() as usize]
    )
}

/// Saves a new report and writes its receipt.
///
/// The class, period, entity and author must exist and the period must be of
/// the class's cadence. Both writes happen in one transaction.
pub async fn create_report(db: &DatabaseConnection, new: NewReport) -> Result<report::Model> {
    let txn = db.begin().await?;

    let report_class = require_report_class(&txn, &new.report_class_slug).await?;
    let period = get_period(&txn, new.period_id).await?;
    if period.period_type != report_class.period_type {
        return Err(Error::InvalidPeriod {
            message: format!(
                "{} reports need a {} period, got {}",
                report_class.slug, report_class.period_type, period.period_type
            ),
        });
    }
    let entity = get_entity_by_id(&txn, new.entity_id).await?;
    let author = get_provider(&txn, new.created_by).await?;

    let status = match new.status {
        ReportStatus::Unsaved => ReportStatus::Closed,
        other => other,
    };
    let created_on = new.created_on.unwrap_or_else(|| Utc::now().naive_utc());

    let inserted = report::ActiveModel {
        report_class_slug: Set(report_class.slug),
        report_type: Set(new.report_type.as_str().to_string()),
        status: Set(status.as_str().to_string()),
        receipt: Set(None),
        period_id: Set(period.id),
        entity_id: Set(entity.id),
        created_by: Set(author.id),
        created_on: Set(created_on),
        modified_by: Set(Some(author.id)),
        modified_on: Set(created_on),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let receipt = generate_receipt(inserted.id, &entity.slug, created_on);
    let mut with_receipt: report::ActiveModel = inserted.into();
    with_receipt.receipt = Set(Some(receipt));
    let saved = with_receipt.update(&txn).await?;

    txn.commit().await?;
    info!(
        "Report {} created by {} ({})",
        saved.receipt.as_deref().unwrap_or_default(),
        author.username,
        status
    );
    Ok(saved)
}

/// Receipt prefixed with the reporting region:
/// `{RR}{id}/{entity slug}-{day of year}-{day of week}{fix}`.
///
/// `RR` is the first two letters of the nearest `region` ancestor, `ML` when
/// there is none.
pub async fn generate_regional_receipt<C>(
    db: &C,
    report: &report::Model,
    fix: &str,
) -> Result<String>
where
    C: ConnectionTrait,
{
    let entity = get_entity_by_id(db, report.entity_id).await?;

    let mut region = DEFAULT_REGION_CODE.to_string();
    if let Some(region_type) = get_entity_type_by_slug(db, "region").await? {
        if let Some(ancestor) = ancestors(db, &entity)
            .await?
            .into_iter()
            .find(|ancestor| ancestor.entity_type_id == region_type.id)
        {
            region = ancestor.slug.to_uppercase().chars().take(2).collect();
        }
    }

    Ok(format!(
        "{region}{}{fix}",
        generate_receipt(report.id, &entity.slug, report.created_on)
    ))
}

/// Retrieves a report by id.
pub async fn get_report<C>(db: &C, report_id: i64) -> Result<report::Model>
where
    C: ConnectionTrait,
{
    Report::find_by_id(report_id)
        .one(db)
        .await?
        .ok_or(Error::ReportNotFound { id: report_id })
}

/// Finds a report by receipt.
pub async fn get_report_by_receipt<C>(db: &C, receipt: &str) -> Result<Option<report::Model>>
where
    C: ConnectionTrait,
{
    Report::find()
        .filter(report::Column::Receipt.eq(receipt))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Status of a stored report.
pub fn report_status(report: &report::Model) -> Result<ReportStatus> {
    report.status.parse()
}

/// Changes the status of a report, recording who changed it.
pub async fn set_status<C>(
    db: &C,
    report_id: i64,
    status: ReportStatus,
    by: &provider::Model,
) -> Result<report::Model>
where
    C: ConnectionTrait,
{
    let report = get_report(db, report_id).await?;
    let mut active: report::ActiveModel = report.into();
    active.status = Set(status.as_str().to_string());
    active.modified_by = Set(Some(by.id));
    active.modified_on = Set(Utc::now().naive_utc());
    let updated = active.update(db).await?;
    info!("Report {} is now {} (by {})", updated.id, status, by.username);
    Ok(updated)
}

/// Marks a report validated. The validator needs `can_validate_report` on
/// the report's entity.
pub async fn validate_report<C>(
    db: &C,
    report_id: i64,
    validator: &provider::Model,
) -> Result<report::Model>
where
    C: ConnectionTrait,
{
    let report = get_report(db, report_id).await?;
    let entity = get_entity_by_id(db, report.entity_id).await?;
    require_permission(db, validator, CAN_VALIDATE_REPORT, Some(&entity)).await?;
    set_status(db, report.id, ReportStatus::Validated, validator).await
}

/// Criteria of [`reports_for`]; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Report class
    pub report_class_slug: Option<String>,
    /// Period
    pub period_id: Option<i64>,
    /// Entities
    pub entity_ids: Option<Vec<i64>>,
    /// Status group
    pub group: Option<StatusGroup>,
}

/// Reports matching `filter`, oldest first.
pub async fn reports_for<C>(db: &C, filter: &ReportFilter) -> Result<Vec<report::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Report::find();
    if let Some(slug) = &filter.report_class_slug {
        query = query.filter(report::Column::ReportClassSlug.eq(slug.as_str()));
    }
    if let Some(period_id) = filter.period_id {
        query = query.filter(report::Column::PeriodId.eq(period_id));
    }
    if let Some(ids) = &filter.entity_ids {
        query = query.filter(report::Column::EntityId.is_in(ids.iter().copied()));
    }
    if let Some(group) = filter.group {
        query = query.filter(
            report::Column::Status.is_in(group.statuses().iter().map(|status| status.as_str())),
        );
    }

    query
        .order_by_asc(report::Column::CreatedOn)
        .order_by_asc(report::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        access::{create_permission, create_role, find_or_create_access, grant_permission},
        calendar::PeriodType,
        period::find_or_create_from,
    };
    use crate::test_utils::{create_test_provider, create_test_report_class, setup_with_hierarchy};
    use chrono::NaiveDate;

    fn on(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .unwrap_or_default()
    }

    #[test]
    fn test_status_codes_and_groups() {
        for status in ReportStatus::ALL {
            assert_eq!(status.as_str().parse::<ReportStatus>().ok(), Some(status));
        }
        assert!("STATUS_LOST".parse::<ReportStatus>().is_err());
        assert_eq!(ReportStatus::ModifiedAuthor.to_string(), "Modified by author");

        // Complete reports are either awaiting or past validation
        for status in ReportStatus::complete() {
            assert!(
                ReportStatus::unvalidated().contains(status)
                    || ReportStatus::validated().contains(status)
            );
        }
        assert!(!ReportStatus::complete().contains(&ReportStatus::Created));

        assert_eq!("TYPE_AGGREGATED".parse::<ReportType>().ok(), Some(ReportType::Aggregated));
        assert_eq!(ReportType::Source.label(), "Source");
    }

    #[test]
    fn test_generate_receipt() {
        // March 15th 2011 is a Tuesday, day 74
        assert_eq!(generate_receipt(42, "kita", on(2011, 3, 15)), "42/kita-074-M");
        // January 2nd 2011 is a Sunday
        assert_eq!(generate_receipt(7, "kati", on(2011, 1, 2)), "7/kati-002-D");
    }

    #[tokio::test]
    async fn test_create_report_writes_receipt() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_test_report_class(&db, "malaria", PeriodType::Month).await?;
        create_role(&db, "agent", "Agent", None).await?;
        let access = find_or_create_access(&db, "agent", &tree.facility).await?;
        let author = create_test_provider(&db, "Awa", "Keita", access.id).await?;
        let march = find_or_create_from(&db, PeriodType::Month, 2011, Some(3), None).await?;

        let report = create_report(
            &db,
            NewReport {
                report_class_slug: "malaria".to_string(),
                report_type: ReportType::Source,
                period_id: march.id,
                entity_id: tree.facility.id,
                created_by: author.id,
                status: ReportStatus::Unsaved,
                created_on: Some(on(2011, 4, 2)),
            },
        )
        .await?;

        assert_eq!(report_status(&report)?, ReportStatus::Closed);
        assert_eq!(report.modified_by, Some(author.id));
        let expected = format!("{}/kita-central-092-S", report.id);
        assert_eq!(report.receipt.as_deref(), Some(expected.as_str()));
        assert_eq!(
            get_report_by_receipt(&db, &expected).await?.map(|r| r.id),
            Some(report.id)
        );

        assert_eq!(
            generate_regional_receipt(&db, &report, "x").await?,
            format!("KA{expected}x")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_report_checks_period_type() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_test_report_class(&db, "malaria", PeriodType::Month).await?;
        create_role(&db, "agent", "Agent", None).await?;
        let access = find_or_create_access(&db, "agent", &tree.facility).await?;
        let author = create_test_provider(&db, "Awa", "Keita", access.id).await?;
        let year = find_or_create_from(&db, PeriodType::Year, 2011, None, None).await?;

        let result = create_report(
            &db,
            NewReport {
                report_class_slug: "malaria".to_string(),
                report_type: ReportType::Source,
                period_id: year.id,
                entity_id: tree.facility.id,
                created_by: author.id,
                status: ReportStatus::Created,
                created_on: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidPeriod { .. })));
        assert!(reports_for(&db, &ReportFilter::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_regional_receipt_defaults_to_country_code() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_test_report_class(&db, "annual", PeriodType::Year).await?;
        create_role(&db, "agent", "Agent", None).await?;
        let access = find_or_create_access(&db, "agent", &tree.country).await?;
        let author = create_test_provider(&db, "Awa", "Keita", access.id).await?;
        let year = find_or_create_from(&db, PeriodType::Year, 2011, None, None).await?;

        let report = create_report(
            &db,
            NewReport {
                report_class_slug: "annual".to_string(),
                report_type: ReportType::Aggregated,
                period_id: year.id,
                entity_id: tree.region.id,
                created_by: author.id,
                status: ReportStatus::Created,
                created_on: Some(on(2011, 3, 15)),
            },
        )
        .await?;

        // Only ancestors count: a region's own slug is not used
        assert_eq!(
            generate_regional_receipt(&db, &report, "").await?,
            format!("ML{}/kayes-074-M", report.id)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_workflow() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_test_report_class(&db, "malaria", PeriodType::Month).await?;
        create_permission(&db, CAN_VALIDATE_REPORT).await?;
        create_role(&db, "agent", "Agent", None).await?;
        create_role(&db, "manager", "Manager", None).await?;
        grant_permission(&db, "manager", CAN_VALIDATE_REPORT).await?;

        let agent_access = find_or_create_access(&db, "agent", &tree.facility).await?;
        let author = create_test_provider(&db, "Awa", "Keita", agent_access.id).await?;
        let manager_access = find_or_create_access(&db, "manager", &tree.district).await?;
        let manager = create_test_provider(&db, "Moussa", "Diarra", manager_access.id).await?;
        let other_access = find_or_create_access(&db, "manager", &tree.other_district).await?;
        let outsider = create_test_provider(&db, "Fanta", "Coulibaly", other_access.id).await?;

        let march = find_or_create_from(&db, PeriodType::Month, 2011, Some(3), None).await?;
        let report = create_report(
            &db,
            NewReport {
                report_class_slug: "malaria".to_string(),
                report_type: ReportType::Source,
                period_id: march.id,
                entity_id: tree.facility.id,
                created_by: author.id,
                status: ReportStatus::Created,
                created_on: None,
            },
        )
        .await?;

        let unvalidated = ReportFilter {
            group: Some(StatusGroup::Unvalidated),
            ..ReportFilter::default()
        };
        assert_eq!(reports_for(&db, &unvalidated).await?.len(), 1);

        assert!(matches!(
            validate_report(&db, report.id, &author).await,
            Err(Error::PermissionDenied { .. })
        ));
        assert!(matches!(
            validate_report(&db, report.id, &outsider).await,
            Err(Error::PermissionDenied { .. })
        ));

        let validated = validate_report(&db, report.id, &manager).await?;
        assert_eq!(report_status(&validated)?, ReportStatus::Validated);
        assert_eq!(validated.modified_by, Some(manager.id));
        assert_eq!(validated.created_by, author.id);

        assert!(reports_for(&db, &unvalidated).await?.is_empty());
        let complete = ReportFilter {
            report_class_slug: Some("malaria".to_string()),
            period_id: Some(march.id),
            entity_ids: Some(vec![tree.facility.id]),
            group: Some(StatusGroup::Complete),
        };
        assert_eq!(reports_for(&db, &complete).await?.len(), 1);
        Ok(())
    }
}
