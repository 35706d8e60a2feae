//! Period persistence - finds or creates memoized period rows.
//!
//! A period is identified by its `(start_on, end_on, period_type)` triple and
//! stored once. Lookups by date first reuse any stored period of the right
//! type that contains the date, then fall back to the canonical bucket
//! computed by [`calendar`](crate::core::calendar).

use crate::{
    core::calendar::{Period, PeriodType},
    entities::{PeriodRow, period},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::debug;

/// Converts a stored row into a calendar [`Period`].
pub fn to_period(model: &period::Model) -> Result<Period> {
    Ok(Period {
        start_on: model.start_on,
        end_on: model.end_on,
        period_type: model.period_type.parse()?,
    })
}

/// Finds the stored row matching `period` exactly.
pub async fn find_period<C>(db: &C, period: &Period) -> Result<Option<period::Model>>
where
    C: ConnectionTrait,
{
    PeriodRow::find()
        .filter(period::Column::StartOn.eq(period.start_on))
        .filter(period::Column::EndOn.eq(period.end_on))
        .filter(period::Column::PeriodType.eq(period.period_type.as_str()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a stored period by id.
pub async fn get_period<C>(db: &C, period_id: i64) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    PeriodRow::find_by_id(period_id)
        .one(db)
        .await?
        .ok_or(Error::PeriodNotFound { id: period_id })
}

/// Returns the stored period with these exact bounds and type, inserting it if needed.
pub async fn find_or_create_with<C>(
    db: &C,
    period_type: PeriodType,
    start_on: NaiveDateTime,
    end_on: NaiveDateTime,
) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    if end_on < start_on {
        return Err(Error::InvalidPeriod {
            message: format!("period ends ({end_on}) before it starts ({start_on})"),
        });
    }

    let wanted = Period {
        start_on,
        end_on,
        period_type,
    };
    if let Some(existing) = find_period(db, &wanted).await? {
        return Ok(existing);
    }

    let row = period::ActiveModel {
        start_on: Set(start_on),
        end_on: Set(end_on),
        period_type: Set(period_type.as_str().to_string()),
        ..Default::default()
    };

    match row.insert(db).await {
        Ok(model) => {
            debug!("Stored {} period {}", period_type, wanted.name());
            Ok(model)
        }
        // Lost an insert race on the unique index: the row now exists
        Err(err) => find_period(db, &wanted).await?.ok_or(Error::Database(err)),
    }
}

/// Stores a calendar period, returning the memoized row.
pub async fn save_period<C>(db: &C, period: &Period) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    find_or_create_with(db, period.period_type, period.start_on, period.end_on).await
}

async fn find_containing<C>(
    db: &C,
    period_type: PeriodType,
    at: NaiveDateTime,
) -> Result<Option<period::Model>>
where
    C: ConnectionTrait,
{
    PeriodRow::find()
        .filter(period::Column::PeriodType.eq(period_type.as_str()))
        .filter(period::Column::StartOn.lte(at))
        .filter(period::Column::EndOn.gte(at))
        .order_by_asc(period::Column::StartOn)
        .one(db)
        .await
        .map_err(Into::into)
}

/// The period of `period_type` containing `at`, inserting the canonical bucket if none is stored.
pub async fn find_or_create_by_date<C>(
    db: &C,
    period_type: PeriodType,
    at: NaiveDateTime,
) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_containing(db, period_type, at).await? {
        return Ok(existing);
    }
    save_period(db, &Period::containing(period_type, at)?).await
}

/// The period of `period_type` containing `at`, without inserting anything.
///
/// Returns the stored period when one exists, the computed bucket otherwise.
pub async fn bucket_by_date<C>(db: &C, period_type: PeriodType, at: NaiveDateTime) -> Result<Period>
where
    C: ConnectionTrait,
{
    match find_containing(db, period_type, at).await? {
        Some(existing) => to_period(&existing),
        None => Period::containing(period_type, at),
    }
}

/// Finds or creates a period from calendar components.
///
/// Without a month, the whole year is returned (as a year period). Missing
/// days default to the 1st.
pub async fn find_or_create_from<C>(
    db: &C,
    period_type: PeriodType,
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    let Some(month) = month else {
        return save_period(db, &Period::from_year(year)?).await;
    };

    let day = day.unwrap_or(1);
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| Error::InvalidPeriod {
        message: format!("{year}-{month:02}-{day:02} is not a valid date"),
    })?;
    let at = Period::from_date(PeriodType::Day, date)?.middle();
    find_or_create_by_date(db, period_type, at).await
}

/// Finds or creates week `week` of `year` (see [`Period::from_weeknum`]).
pub async fn find_or_create_by_weeknum<C>(
    db: &C,
    year: i32,
    week: u32,
    is_iso: bool,
) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    save_period(db, &Period::from_weeknum(year, week, is_iso)?).await
}

/// Finds or creates quarter `quarter` (1-4) of `year`.
pub async fn find_or_create_by_quarter<C>(db: &C, year: i32, quarter: u32) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    save_period(db, &Period::from_quarter(year, quarter)?).await
}

/// The stored period following `model`.
pub async fn next_period<C>(db: &C, model: &period::Model) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    save_period(db, &to_period(model)?.next()?).await
}

/// The stored period preceding `model`.
pub async fn previous_period<C>(db: &C, model: &period::Model) -> Result<period::Model>
where
    C: ConnectionTrait,
{
    save_period(db, &to_period(model)?.previous()?).await
}

/// Stores and returns the buckets of `period_type` making up `model`.
pub async fn sub_periods(
    db: &DatabaseConnection,
    model: &period::Model,
    period_type: PeriodType,
) -> Result<Vec<period::Model>> {
    let buckets = to_period(model)?.sub_periods(period_type)?;

    let txn = db.begin().await?;
    let mut stored = Vec::with_capacity(buckets.len());
    for bucket in &buckets {
        stored.push(save_period(&txn, bucket).await?);
    }
    txn.commit().await?;

    Ok(stored)
}

/// All stored periods of `period_type`, oldest first.
pub async fn list_periods<C>(db: &C, period_type: PeriodType) -> Result<Vec<period::Model>>
where
    C: ConnectionTrait,
{
    PeriodRow::find()
        .filter(period::Column::PeriodType.eq(period_type.as_str()))
        .order_by_asc(period::Column::StartOn)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use sea_orm::PaginatorTrait;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_find_or_create_is_memoized() -> Result<()> {
        let db = setup_test_db().await?;

        let first = find_or_create_by_date(&db, PeriodType::Month, at(2011, 3, 15, 10)).await?;
        let second = find_or_create_by_date(&db, PeriodType::Month, at(2011, 3, 2, 8)).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(PeriodRow::find().count(&db).await?, 1);

        let calendar = to_period(&first)?;
        assert_eq!(calendar, Period::from_month(2011, 3)?);
        Ok(())
    }

    #[tokio::test]
    async fn test_same_bounds_different_type_are_distinct() -> Result<()> {
        let db = setup_test_db().await?;
        let quarter = Period::from_quarter(2011, 1)?;

        let as_quarter = save_period(&db, &quarter).await?;
        let as_custom =
            find_or_create_with(&db, PeriodType::Custom, quarter.start_on, quarter.end_on).await?;
        assert_ne!(as_quarter.id, as_custom.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_reversed_bounds_are_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = find_or_create_with(
            &db,
            PeriodType::Custom,
            at(2011, 3, 2, 0),
            at(2011, 3, 1, 0),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidPeriod { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_bucket_by_date_does_not_insert() -> Result<()> {
        let db = setup_test_db().await?;
        let week = bucket_by_date(&db, PeriodType::Week, at(2011, 3, 16, 12)).await?;
        assert_eq!(week.start_on, at(2011, 3, 14, 0));
        assert_eq!(PeriodRow::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stored_period_is_reused_by_date_lookup() -> Result<()> {
        let db = setup_test_db().await?;
        let custom = find_or_create_with(
            &db,
            PeriodType::Custom,
            at(2011, 3, 1, 0),
            at(2011, 3, 10, 0),
        )
        .await?;

        let found = find_or_create_by_date(&db, PeriodType::Custom, at(2011, 3, 5, 0)).await?;
        assert_eq!(found.id, custom.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_or_create_from_components() -> Result<()> {
        let db = setup_test_db().await?;

        let year = find_or_create_from(&db, PeriodType::Month, 2011, None, None).await?;
        assert_eq!(to_period(&year)?, Period::from_year(2011)?);

        let month = find_or_create_from(&db, PeriodType::Month, 2011, Some(7), None).await?;
        assert_eq!(to_period(&month)?, Period::from_month(2011, 7)?);

        let day = find_or_create_from(&db, PeriodType::Day, 2011, Some(7), Some(14)).await?;
        assert_eq!(day.start_on, at(2011, 7, 14, 0));

        let invalid = find_or_create_from(&db, PeriodType::Day, 2011, Some(2), Some(30)).await;
        assert!(invalid.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_weeknum_and_quarter_lookups() -> Result<()> {
        let db = setup_test_db().await?;

        let week = find_or_create_by_weeknum(&db, 2015, 1, false).await?;
        assert_eq!(week.start_on, at(2015, 1, 5, 0));

        let quarter = find_or_create_by_quarter(&db, 2011, 3).await?;
        assert_eq!(quarter.start_on, at(2011, 7, 1, 0));
        assert_eq!(quarter.period_type, "quarter");
        Ok(())
    }

    #[tokio::test]
    async fn test_next_previous_and_sub_periods() -> Result<()> {
        let db = setup_test_db().await?;
        let december = find_or_create_from(&db, PeriodType::Month, 2011, Some(12), None).await?;

        let january = next_period(&db, &december).await?;
        assert_eq!(january.start_on, at(2012, 1, 1, 0));
        assert_eq!(previous_period(&db, &january).await?.id, december.id);

        let year = find_or_create_from(&db, PeriodType::Year, 2011, None, None).await?;
        let quarters = sub_periods(&db, &year, PeriodType::Quarter).await?;
        assert_eq!(quarters.len(), 4);
        assert_eq!(list_periods(&db, PeriodType::Quarter).await?.len(), 4);

        // December was already stored and is reused
        let months = sub_periods(&db, &year, PeriodType::Month).await?;
        assert_eq!(months[11].id, december.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_period_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(matches!(
            get_period(&db, 42).await,
            Err(Error::PeriodNotFound { id: 42 })
        ));
        Ok(())
    }
}
