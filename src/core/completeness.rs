//! Reporting completeness indicators.
//!
//! For an entity and everything below it, counts how many reports of a class
//! were expected, received, complete and validated in each period. Received
//! reports are measured against expected ones; late reports (submitted after
//! the period ended) are measured against received ones.

use crate::{
    core::{
        calendar::Period,
        entity::subtree_ids,
        indicator::{IndicatorTable, LineSpec},
        period::find_period,
        report::{ReportFilter, ReportStatus, reports_for},
        reporting::{expected_for, require_report_class},
    },
    entities::entity,
    errors::{Error, Result},
};
use sea_orm::ConnectionTrait;
use std::collections::HashMap;
use tracing::debug;

/// Reports expected by the reporting schedule
pub const EXPECTED: &str = "expected";
/// Reports received, whatever their status
pub const RECEIVED: &str = "received";
/// Reports holding all their data
pub const COMPLETE: &str = "complete";
/// Reports past validation
pub const VALIDATED: &str = "validated";
/// Reports submitted after their period ended
pub const LATE: &str = "late";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    expected: u32,
    received: u32,
    complete: u32,
    validated: u32,
    late: u32,
}

/// Completeness of a report class over an entity subtree, preloaded per period.
#[derive(Debug, Clone)]
pub struct CompletenessTable {
    id: String,
    title: String,
    counts: HashMap<Period, Counts>,
}

impl CompletenessTable {
    /// Loads the counts of `report_class_slug` for `entity` and its
    /// descendants. Periods that were never stored have no data.
    pub async fn load<C>(
        db: &C,
        entity: &entity::Model,
        report_class_slug: &str,
        periods: &[Period],
    ) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let report_class = require_report_class(db, report_class_slug).await?;
        let entity_ids = subtree_ids(db, entity).await?;
        let mut counts = HashMap::with_capacity(periods.len());

        for period in periods {
            let Some(stored) = find_period(db, period).await? else {
                debug!("No stored period for {}, skipping", period.strid());
                continue;
            };

            let expected = expected_for(
                db,
                &report_class.slug,
                stored.id,
                Some(entity_ids.as_slice()),
            )
            .await?;
            let reports = reports_for(
                db,
                &ReportFilter {
                    report_class_slug: Some(report_class.slug.clone()),
                    period_id: Some(stored.id),
                    entity_ids: Some(entity_ids.clone()),
                    group: None,
                },
            )
            .await?;

            let mut period_counts = Counts {
                expected: u32::try_from(expected.len())?,
                received: u32::try_from(reports.len())?,
                ..Counts::default()
            };
            for report in &reports {
                let status: ReportStatus = report.status.parse()?;
                if ReportStatus::complete().contains(&status) {
                    period_counts.complete += 1;
                }
                if ReportStatus::validated().contains(&status) {
                    period_counts.validated += 1;
                }
                if report.created_on > stored.end_on {
                    period_counts.late += 1;
                }
            }
            counts.insert(*period, period_counts);
        }

        Ok(Self {
            id: format!("completeness_{}", report_class.slug),
            title: format!("{} completeness", report_class.name),
            counts,
        })
    }
}

impl IndicatorTable for CompletenessTable {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn lines(&self) -> Vec<LineSpec> {
        vec![
            LineSpec::new(EXPECTED, "Expected reports").index(0).reference(),
            LineSpec::new(RECEIVED, "Received reports").index(1),
            LineSpec::new(COMPLETE, "Complete reports").index(2).sub(),
            LineSpec::new(VALIDATED, "Validated reports").index(3).sub(),
            LineSpec::new(LATE, "Late reports")
                .index(4)
                .hidden()
                .relative_to(RECEIVED),
        ]
    }

    fn value(&self, line: &str, period: &Period) -> Result<Option<f64>> {
        let counts = self.counts.get(period).ok_or_else(|| Error::NoSourceData {
            line: line.to_string(),
            period: period.strid(),
        })?;
        let count = match line {
            EXPECTED => counts.expected,
            RECEIVED => counts.received,
            COMPLETE => counts.complete,
            VALIDATED => counts.validated,
            LATE => counts.late,
            other => {
                return Err(Error::UnknownLine {
                    line: other.to_string(),
                });
            }
        };
        Ok(Some(f64::from(count)))
    }

    fn period_is_valid(&self, period: &Period) -> bool {
        self.counts.contains_key(period)
    }
}
