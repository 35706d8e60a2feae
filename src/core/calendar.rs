//! Calendar arithmetic for reporting periods.
//!
//! A [`Period`] is a closed interval of time bucketed by a [`PeriodType`].
//! Canonical buckets start at midnight on their first day and end one
//! microsecond before the next bucket starts, so consecutive buckets never
//! overlap and never leave a gap. Everything here is pure: persistence and
//! memoization of periods lives in [`crate::core::period`].

use crate::errors::{Error, Result};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of time bucket a [`Period`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// A calendar day
    Day,
    /// A Monday-to-Sunday week
    Week,
    /// A calendar month
    Month,
    /// Three calendar months starting in January, April, July or October
    Quarter,
    /// January to June, or July to December
    Semester,
    /// A calendar year
    Year,
    /// A one-hour window around an arbitrary instant
    Custom,
}

impl PeriodType {
    /// Every period type, shortest first.
    pub const ALL: [Self; 7] = [
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Quarter,
        Self::Semester,
        Self::Year,
        Self::Custom,
    ];

    /// Storage representation of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Semester => "semester",
            Self::Year => "year",
            Self::Custom => "custom",
        }
    }

    /// Human-readable name of a single bucket.
    #[must_use]
    pub const fn verbose_name(self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::Week => "Week",
            Self::Month => "Month",
            Self::Quarter => "Quarter",
            Self::Semester => "Semester",
            Self::Year => "Year",
            Self::Custom => "Custom",
        }
    }

    /// Reporting cadence label, as shown on report classes.
    #[must_use]
    pub const fn cadence_label(self) -> &'static str {
        match self {
            Self::Day => "Daily",
            Self::Week => "Weekly",
            Self::Month => "Monthly",
            Self::Quarter => "Quarterly",
            Self::Semester => "Biannually",
            Self::Year => "Annually",
            Self::Custom => "Custom",
        }
    }

    /// Nominal length of a bucket, in days.
    #[must_use]
    pub fn delta(self) -> f64 {
        match self {
            Self::Day => 1.0,
            Self::Week => 7.0,
            Self::Month => 31.0,
            Self::Quarter => 93.0,
            Self::Semester => 186.0,
            Self::Year => 365.0,
            Self::Custom => 1.0 / 24.0,
        }
    }

    /// Start and (inclusive) end of the bucket of this type containing `at`.
    pub fn boundaries(self, at: NaiveDateTime) -> Result<(NaiveDateTime, NaiveDateTime)> {
        if self == Self::Custom {
            let start = at - Duration::minutes(30);
            return Ok((start, start + Duration::hours(1) - one_microsecond()));
        }

        let date = at.date();
        let start = match self {
            Self::Day => date,
            Self::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Self::Month => first_of_month(date.year(), date.month())?,
            Self::Quarter => first_of_month(date.year(), (date.month() - 1) / 3 * 3 + 1)?,
            Self::Semester => first_of_month(date.year(), if date.month() <= 6 { 1 } else { 7 })?,
            Self::Year | Self::Custom => first_of_month(date.year(), 1)?,
        };

        let next_start = match self {
            Self::Day => start.checked_add_signed(Duration::days(1)),
            Self::Week => start.checked_add_signed(Duration::days(7)),
            Self::Month => start.checked_add_months(Months::new(1)),
            Self::Quarter => start.checked_add_months(Months::new(3)),
            Self::Semester => start.checked_add_months(Months::new(6)),
            Self::Year | Self::Custom => start.checked_add_months(Months::new(12)),
        }
        .ok_or_else(|| out_of_range(at))?;

        Ok((midnight(start), midnight(next_start) - one_microsecond()))
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidPeriod {
                message: format!("unknown period type `{s}`"),
            })
    }
}

/// A bounded interval of time.
///
/// Ordering sorts chronologically by start, then end, then type. `==`
/// agrees with that ordering and so also compares the type; use
/// [`Period::same_span`] to compare bounds alone. Use [`Period::precedes`]
/// and [`Period::follows`] to ask whether two periods are strictly disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// First instant of the period
    pub start_on: NaiveDateTime,
    /// Last instant of the period (inclusive)
    pub end_on: NaiveDateTime,
    /// Bucket kind
    pub period_type: PeriodType,
}

impl Period {
    /// The bucket of `period_type` containing `at`.
    pub fn containing(period_type: PeriodType, at: NaiveDateTime) -> Result<Self> {
        let (start_on, end_on) = period_type.boundaries(at)?;
        Ok(Self {
            start_on,
            end_on,
            period_type,
        })
    }

    /// The bucket of `period_type` containing `date` (taken at noon).
    pub fn from_date(period_type: PeriodType, date: NaiveDate) -> Result<Self> {
        Self::containing(period_type, noon(date))
    }

    /// The bucket of `period_type` containing the given calendar day.
    pub fn from_ymd(period_type: PeriodType, year: i32, month: u32, day: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            Error::InvalidPeriod {
                message: format!("{year}-{month:02}-{day:02} is not a valid date"),
            }
        })?;
        Self::from_date(period_type, date)
    }

    /// The calendar year `year`.
    pub fn from_year(year: i32) -> Result<Self> {
        Self::from_ymd(PeriodType::Year, year, 1, 1)
    }

    /// The calendar month `month` (1-12) of `year`.
    pub fn from_month(year: i32, month: u32) -> Result<Self> {
        Self::from_ymd(PeriodType::Month, year, month, 1)
    }

    /// Quarter `quarter` (1-4) of `year`.
    pub fn from_quarter(year: i32, quarter: u32) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(Error::InvalidPeriod {
                message: format!("quarter must be between 1 and 4, got {quarter}"),
            });
        }
        Self::from_ymd(PeriodType::Quarter, year, (quarter - 1) * 3 + 1, 1)
    }

    /// Semester `semester` (1-2) of `year`.
    pub fn from_semester(year: i32, semester: u32) -> Result<Self> {
        if !(1..=2).contains(&semester) {
            return Err(Error::InvalidPeriod {
                message: format!("semester must be 1 or 2, got {semester}"),
            });
        }
        Self::from_ymd(PeriodType::Semester, year, (semester - 1) * 6 + 1, 1)
    }

    /// Week number `week` of `year`.
    ///
    /// With `is_iso`, weeks follow ISO 8601 (week 1 holds the first
    /// Thursday, numbering starts at 1). Otherwise numbering matches
    /// `strftime("%W")`: week 1 starts on the first Monday of the year and
    /// week 0 is the week containing January 1st. Years starting on a
    /// Monday have no week 0.
    pub fn from_weeknum(year: i32, week: u32, is_iso: bool) -> Result<Self> {
        let invalid = || Error::InvalidPeriod {
            message: format!("week {week} does not exist in {year}"),
        };

        if is_iso {
            let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(invalid)?;
            return Self::from_date(PeriodType::Week, monday);
        }

        let jan_first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
        if week == 0 {
            if jan_first.weekday() == Weekday::Mon {
                return Err(invalid());
            }
            return Self::from_date(PeriodType::Week, jan_first);
        }

        let offset = (7 - jan_first.weekday().num_days_from_monday()) % 7;
        let monday = jan_first
            .checked_add_signed(Duration::days(i64::from(offset) + 7 * (i64::from(week) - 1)))
            .ok_or_else(invalid)?;
        if monday.year() != year {
            return Err(invalid());
        }
        Self::from_date(PeriodType::Week, monday)
    }

    /// Instant halfway through the period.
    #[must_use]
    pub fn middle(&self) -> NaiveDateTime {
        self.start_on + (self.end_on - self.start_on) / 2
    }

    /// Length of the period, counting the inclusive end.
    #[must_use]
    pub fn span(&self) -> Duration {
        self.end_on - self.start_on + one_microsecond()
    }

    /// The period immediately after this one.
    pub fn next(&self) -> Result<Self> {
        if self.period_type == PeriodType::Custom {
            return Ok(self.shifted(self.span()));
        }
        let after = self
            .end_on
            .checked_add_signed(one_microsecond())
            .ok_or_else(|| out_of_range(self.end_on))?;
        Self::containing(self.period_type, after)
    }

    /// The period immediately before this one.
    pub fn previous(&self) -> Result<Self> {
        if self.period_type == PeriodType::Custom {
            return Ok(self.shifted(-self.span()));
        }
        let before = self
            .start_on
            .checked_sub_signed(one_microsecond())
            .ok_or_else(|| out_of_range(self.start_on))?;
        Self::containing(self.period_type, before)
    }

    fn shifted(&self, by: Duration) -> Self {
        Self {
            start_on: self.start_on + by,
            end_on: self.end_on + by,
            period_type: self.period_type,
        }
    }

    /// Whether `at` lies strictly inside the period.
    #[must_use]
    pub fn includes(&self, at: NaiveDateTime) -> bool {
        self.start_on < at && self.end_on > at
    }

    /// Whether `date` (taken at noon) lies inside the period.
    #[must_use]
    pub fn includes_date(&self, date: NaiveDate) -> bool {
        self.includes(noon(date))
    }

    /// Whether `other` lies entirely within this period.
    #[must_use]
    pub fn contains_period(&self, other: &Self) -> bool {
        self.start_on <= other.start_on && other.end_on <= self.end_on
    }

    /// Whether this period ends before `other` starts.
    #[must_use]
    pub fn precedes(&self, other: &Self) -> bool {
        self.end_on < other.start_on
    }

    /// Whether this period starts after `other` ends.
    #[must_use]
    pub fn follows(&self, other: &Self) -> bool {
        self.start_on > other.end_on
    }

    /// Whether both periods cover exactly the same interval, whatever their
    /// type. This is period equality in the calendar sense.
    #[must_use]
    pub fn same_span(&self, other: &Self) -> bool {
        self.start_on == other.start_on && self.end_on == other.end_on
    }

    /// Buckets of `period_type` making up this period.
    ///
    /// Starts with the bucket containing `start_on` (which may begin before
    /// this period) and keeps every following bucket starting on or before
    /// `end_on`.
    pub fn sub_periods(&self, period_type: PeriodType) -> Result<Vec<Self>> {
        if period_type == self.period_type {
            return Ok(vec![*self]);
        }

        let mut periods = Vec::new();
        let mut current = Self::containing(period_type, self.start_on)?;
        while current.start_on <= self.end_on {
            let next = current.next()?;
            periods.push(current);
            current = next;
        }
        Ok(periods)
    }

    /// Days of this period.
    pub fn days(&self) -> Result<Vec<Self>> {
        self.sub_periods(PeriodType::Day)
    }

    /// Weeks overlapping the start of, or starting within, this period.
    pub fn weeks(&self) -> Result<Vec<Self>> {
        self.sub_periods(PeriodType::Week)
    }

    /// Months of this period.
    pub fn months(&self) -> Result<Vec<Self>> {
        self.sub_periods(PeriodType::Month)
    }

    /// Quarters of this period.
    pub fn quarters(&self) -> Result<Vec<Self>> {
        self.sub_periods(PeriodType::Quarter)
    }

    /// Years of this period.
    pub fn years(&self) -> Result<Vec<Self>> {
        self.sub_periods(PeriodType::Year)
    }

    /// Quarter (1-4) the middle of the period falls in.
    #[must_use]
    pub fn quarter(&self) -> u32 {
        (self.middle().month() - 1) / 3 + 1
    }

    /// Semester (1-2) the middle of the period falls in.
    #[must_use]
    pub fn semester(&self) -> u32 {
        if self.middle().month() <= 6 { 1 } else { 2 }
    }

    /// Short display name.
    #[must_use]
    pub fn name(&self) -> String {
        let middle = self.middle();
        match self.period_type {
            PeriodType::Day => middle.format("%d/%m/%Y").to_string(),
            PeriodType::Week => middle.format("%W/%Y").to_string(),
            PeriodType::Month => middle.format("%m %Y").to_string(),
            PeriodType::Quarter => format!("Q{}.{}", self.quarter(), middle.year()),
            PeriodType::Semester => format!("S{}.{}", self.semester(), middle.year()),
            PeriodType::Year => middle.format("%Y").to_string(),
            PeriodType::Custom => middle.format("%c").to_string(),
        }
    }

    /// Long display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.period_type {
            PeriodType::Month | PeriodType::Quarter | PeriodType::Semester => {
                self.middle().format("%B %Y").to_string()
            }
            _ => self.name(),
        }
    }

    /// Compact identifier, unique among periods of the same type.
    #[must_use]
    pub fn strid(&self) -> String {
        let middle = self.middle();
        match self.period_type {
            PeriodType::Day => middle.format("%d-%m-%Y").to_string(),
            PeriodType::Week => middle.format("%W-%Y").to_string(),
            PeriodType::Month => middle.format("%m-%Y").to_string(),
            PeriodType::Quarter => format!("{:02}-{}", self.quarter(), middle.year()),
            PeriodType::Semester => format!("{:02}-{}", self.semester(), middle.year()),
            PeriodType::Year => middle.format("%Y").to_string(),
            PeriodType::Custom => middle.and_utc().timestamp().to_string(),
        }
    }

    /// Locale-independent identifier.
    #[must_use]
    pub fn pid(&self) -> String {
        let middle = self.middle();
        match self.period_type {
            PeriodType::Month => middle.format("%m%Y").to_string(),
            PeriodType::Quarter => format!("Q{}.{}", self.quarter(), middle.year()),
            PeriodType::Semester => format!("S{}.{}", self.semester(), middle.year()),
            _ => middle.and_utc().timestamp().to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Year and month following `year`/`month`.
#[must_use]
pub const fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month < 12 { (year, month + 1) } else { (year + 1, 1) }
}

fn one_microsecond() -> Duration {
    Duration::microseconds(1)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn noon(date: NaiveDate) -> NaiveDateTime {
    midnight(date) + Duration::hours(12)
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| Error::InvalidPeriod {
        message: format!("{year}-{month:02} is out of range"),
    })
}

fn out_of_range(at: NaiveDateTime) -> Error {
    Error::InvalidPeriod {
        message: format!("no period can be computed around {at}"),
    }
}
