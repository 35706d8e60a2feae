//! Indicator tables - declarative per-period indicators with reference ratios.
//!
//! An indicator table declares its rows ("lines") through [`IndicatorTable::lines`]
//! and computes a raw value for a line and a period through
//! [`IndicatorTable::value`]. [`IndicatorReport`] binds a table to an entity and
//! a list of periods (the columns) and derives everything else: visibility,
//! ordering, percentages against a reference line, totals and caching.
//!
//! Each line's percentage is its value divided by the value of its reference
//! line for the same period. A line references either the line named with
//! [`LineSpec::relative_to`] or, by default, the first line flagged with
//! [`LineSpec::reference`].

use crate::{
    core::{
        cache::{CachePolicy, ResultCache},
        calendar::Period,
    },
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Declaration of one indicator row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpec {
    /// Identifier passed to [`IndicatorTable::value`]
    pub slug: String,
    /// Row label
    pub label: String,
    /// Sort position
    pub index: u32,
    /// Whether other lines are measured against this one
    pub is_reference: bool,
    /// Never displayed, but still usable as a reference
    pub is_hidden: bool,
    /// Label-only row without values
    pub is_blank: bool,
    /// Sub-row of the previous line
    pub is_sub: bool,
    /// Explicit reference line, overriding the table's default reference
    pub reference: Option<String>,
}

impl LineSpec {
    /// A plain line at index 0.
    pub fn new(slug: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            label: label.into(),
            index: 0,
            is_reference: false,
            is_hidden: false,
            is_blank: false,
            is_sub: false,
            reference: None,
        }
    }

    /// Sets the sort position.
    #[must_use]
    pub fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Flags the line as a reference.
    #[must_use]
    pub fn reference(mut self) -> Self {
        self.is_reference = true;
        self
    }

    /// Hides the line from the output.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    /// Makes the line a label-only separator.
    #[must_use]
    pub fn blank(mut self) -> Self {
        self.is_blank = true;
        self
    }

    /// Marks the line as a sub-row.
    #[must_use]
    pub fn sub(mut self) -> Self {
        self.is_sub = true;
        self
    }

    /// Measures the line against `slug` instead of the default reference.
    #[must_use]
    pub fn relative_to(mut self, slug: impl Into<String>) -> Self {
        self.reference = Some(slug.into());
        self
    }
}

/// How a table is meant to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Tabular display
    Table,
    /// Chart display
    Graph,
}

/// Chart flavour for graph tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// Vertical bars
    Column,
    /// Horizontal bars
    Bar,
    /// Lines
    Line,
    /// Pie chart
    Pie,
}

/// Effective rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct TableOptions {
    /// Display raw values
    pub with_data: bool,
    /// Add a total column
    pub with_total: bool,
    /// Keep reference lines in the output
    pub with_reference: bool,
    /// Display percentages only
    pub only_percent: bool,
    /// Compute a percentage next to every value
    pub with_percentage: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            with_data: true,
            with_total: false,
            with_reference: true,
            only_percent: false,
            with_percentage: false,
        }
    }
}

impl TableOptions {
    /// Options with every set field of `overrides` applied.
    #[must_use]
    pub fn merged(self, overrides: &OptionOverrides) -> Self {
        Self {
            with_data: overrides.with_data.unwrap_or(self.with_data),
            with_total: overrides.with_total.unwrap_or(self.with_total),
            with_reference: overrides.with_reference.unwrap_or(self.with_reference),
            only_percent: overrides.only_percent.unwrap_or(self.only_percent),
            with_percentage: overrides.with_percentage.unwrap_or(self.with_percentage),
        }
    }
}

/// Partial options; unset fields keep the previous layer's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionOverrides {
    /// See [`TableOptions::with_data`]
    pub with_data: Option<bool>,
    /// See [`TableOptions::with_total`]
    pub with_total: Option<bool>,
    /// See [`TableOptions::with_reference`]
    pub with_reference: Option<bool>,
    /// See [`TableOptions::only_percent`]
    pub only_percent: Option<bool>,
    /// See [`TableOptions::with_percentage`]
    pub with_percentage: Option<bool>,
}

/// A table of indicators computed per period.
pub trait IndicatorTable {
    /// Stable identifier, used in cache keys.
    fn id(&self) -> &str;

    /// Short name.
    fn name(&self) -> &str {
        ""
    }

    /// Caption displayed under the table.
    fn caption(&self) -> &str {
        ""
    }

    /// Title displayed above the table.
    fn title(&self) -> &str {
        ""
    }

    /// Rendering kind.
    fn kind(&self) -> TableKind {
        TableKind::Table
    }

    /// Chart flavour when rendered as a graph.
    fn graph_type(&self) -> GraphType {
        GraphType::Column
    }

    /// Table-level defaults, layered over [`TableOptions::default`].
    fn default_options(&self) -> OptionOverrides {
        OptionOverrides::default()
    }

    /// Every line the table declares, hidden ones included.
    fn lines(&self) -> Vec<LineSpec>;

    /// Raw value of `line` for `period`.
    ///
    /// Return `Err(Error::NoSourceData { .. })` (or `Ok(None)`) when the
    /// period has no data for this line.
    fn value(&self, line: &str, period: &Period) -> Result<Option<f64>>;

    /// Whether `period` has usable data at all. Invalid periods produce empty cells.
    fn period_is_valid(&self, _period: &Period) -> bool {
        true
    }
}

/// Value and percentage of one line for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Raw value, `None` when there is no data
    pub value: Option<f64>,
    /// Ratio to the reference line, `None` when not computed or not computable
    pub percent: Option<f64>,
}

/// One column of a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnValue {
    /// Period identifier (see [`Period::strid`])
    pub period: String,
    /// Computed cell
    #[serde(flatten)]
    pub cell: Cell,
}

/// Computed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineData {
    /// Line slug
    pub slug: String,
    /// Row label
    pub label: String,
    /// Label-only row
    pub blank: bool,
    /// Reference row
    pub reference: bool,
    /// Sub-row
    pub sub: bool,
    /// One entry per period, in column order; empty for blank rows
    pub values: Vec<ColumnValue>,
    /// Total over all periods, when requested
    pub total: Option<Cell>,
}

/// Computed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Table identifier
    pub id: String,
    /// Table title
    pub title: String,
    /// Table caption
    pub caption: String,
    /// Column headers (period names)
    pub periods: Vec<String>,
    /// Options the table was computed with
    pub options: TableOptions,
    /// Rows, sorted by index then slug
    pub lines: Vec<LineData>,
}

/// An indicator table bound to an entity and a list of periods.
#[derive(Debug)]
pub struct IndicatorReport<'a, T: IndicatorTable> {
    table: &'a T,
    entity_slug: String,
    periods: Vec<Period>,
    options: TableOptions,
}

impl<'a, T: IndicatorTable> IndicatorReport<'a, T> {
    /// Binds `table` to an entity and periods.
    ///
    /// Options are layered: main defaults, then the table's
    /// [`IndicatorTable::default_options`], then `overrides`.
    pub fn new(
        table: &'a T,
        entity_slug: impl Into<String>,
        periods: Vec<Period>,
        overrides: OptionOverrides,
    ) -> Self {
        let options = TableOptions::default()
            .merged(&table.default_options())
            .merged(&overrides);
        Self {
            table,
            entity_slug: entity_slug.into(),
            periods,
            options,
        }
    }

    /// Effective options.
    #[must_use]
    pub const fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Periods, in column order.
    #[must_use]
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Number of columns: the label, one per period, one more per period
    /// with percentages, and the total.
    #[must_use]
    pub fn columns(&self) -> usize {
        let mut columns = 1 + self.periods.len();
        if self.options.with_percentage {
            columns += self.periods.len();
        }
        if self.options.with_total {
            columns += 1;
        }
        columns
    }

    /// Lines to display, sorted by index then slug.
    #[must_use]
    pub fn lines(&self) -> Vec<LineSpec> {
        let mut lines: Vec<LineSpec> = self
            .table
            .lines()
            .into_iter()
            .filter(|line| !line.is_hidden)
            .filter(|line| self.options.with_reference || !line.is_reference)
            .collect();
        sort_lines(&mut lines);
        lines
    }

    fn line(&self, slug: &str) -> Result<LineSpec> {
        self.table
            .lines()
            .into_iter()
            .find(|line| line.slug == slug)
            .ok_or_else(|| Error::UnknownLine {
                line: slug.to_string(),
            })
    }

    /// Slug of the line `slug` is measured against.
    pub fn reference_for(&self, slug: &str) -> Result<String> {
        if let Some(reference) = self.line(slug)?.reference {
            return Ok(reference);
        }

        let mut references: Vec<LineSpec> = self
            .table
            .lines()
            .into_iter()
            .filter(|line| line.is_reference)
            .collect();
        sort_lines(&mut references);
        references
            .into_iter()
            .next()
            .map(|line| line.slug)
            .ok_or_else(|| Error::NoReferenceLine {
                table: self.table.id().to_string(),
            })
    }

    /// Raw value of a line for a period; missing source data yields `None`.
    pub fn indicator_value(&self, slug: &str, period: &Period) -> Result<Option<f64>> {
        match self.table.value(slug, period) {
            Err(Error::NoSourceData { line, period }) => {
                debug!("No source data for {line} in {period}");
                Ok(None)
            }
            other => other,
        }
    }

    /// Value of a line divided by the value of its reference for a period.
    pub fn indicator_rate(&self, slug: &str, period: &Period) -> Result<Option<f64>> {
        let reference = self.reference_for(slug)?;
        if reference == slug {
            return Ok(Some(1.0));
        }

        let value = self.indicator_value(slug, period)?;
        let reference_value = self.indicator_value(&reference, period)?;
        Ok(ratio(value, reference_value))
    }

    /// Computes one row.
    pub fn line_data(&self, line: &LineSpec) -> Result<LineData> {
        let mut data = LineData {
            slug: line.slug.clone(),
            label: line.label.clone(),
            blank: line.is_blank,
            reference: line.is_reference,
            sub: line.is_sub,
            values: Vec::with_capacity(self.periods.len()),
            total: None,
        };

        if line.is_blank {
            return Ok(data);
        }

        for period in &self.periods {
            let cell = if self.table.period_is_valid(period) {
                Cell {
                    value: self.indicator_value(&line.slug, period)?,
                    percent: if self.options.with_percentage {
                        self.indicator_rate(&line.slug, period)?
                    } else {
                        None
                    },
                }
            } else {
                Cell::default()
            };
            data.values.push(ColumnValue {
                period: period.strid(),
                cell,
            });
        }

        if self.options.with_total {
            data.total = Some(self.total(line, &data.values)?);
        }

        Ok(data)
    }

    fn total(&self, line: &LineSpec, values: &[ColumnValue]) -> Result<Cell> {
        let value = sum(values.iter().map(|column| column.cell.value));
        if !self.options.with_percentage {
            return Ok(Cell {
                value,
                percent: None,
            });
        }

        let reference = self.reference_for(&line.slug)?;
        let percent = if reference == line.slug {
            Some(1.0)
        } else {
            let mut reference_values = Vec::with_capacity(self.periods.len());
            for period in self.periods.iter().filter(|p| self.table.period_is_valid(p)) {
                reference_values.push(self.indicator_value(&reference, period)?);
            }
            ratio(value, sum(reference_values))
        };
        Ok(Cell { value, percent })
    }

    /// Computes every displayed row.
    pub fn data(&self) -> Result<TableData> {
        let lines = self
            .lines()
            .iter()
            .map(|line| self.line_data(line))
            .collect::<Result<Vec<_>>>()?;

        Ok(TableData {
            id: self.table.id().to_string(),
            title: self.table.title().to_string(),
            caption: self.table.caption().to_string(),
            periods: self.periods.iter().map(Period::name).collect(),
            options: self.options,
            lines,
        })
    }

    /// Key identifying this table, entity and period selection in a cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let periods: Vec<String> = self.periods.iter().map(Period::strid).collect();
        format!(
            "{}_{}_{}",
            self.table.id(),
            periods.join("#"),
            self.entity_slug
        )
    }

    /// [`IndicatorReport::data`] through `cache`, kept for `expiry`.
    pub async fn cached_data(
        &self,
        cache: &ResultCache<TableData>,
        expiry: Duration,
    ) -> Result<TableData> {
        let key = self.cache_key();
        cache
            .get_or_compute(&key, CachePolicy::cached(expiry), || async { self.data() })
            .await
    }
}

fn sort_lines(lines: &mut [LineSpec]) {
    lines.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.slug.cmp(&b.slug)));
}

fn sum(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, value| Some(acc.unwrap_or(0.0) + value))
}

fn ratio(value: Option<f64>, reference: Option<f64>) -> Option<f64> {
    match (value, reference) {
        (Some(_), Some(reference)) if reference == 0.0 => Some(0.0),
        (Some(value), Some(reference)) => Some(value / reference),
        _ => None,
    }
}
