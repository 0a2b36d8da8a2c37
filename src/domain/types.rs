//! Shared domain types.
//!
//! The source CSV is loosely typed text; everything past ingest works on the
//! fixed schema below. Classifications and months are closed enumerations so an
//! unknown value is rejected when a record is built, not when it is reported.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// Calendar month of the fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    Ene,
    Feb,
    Mar,
    Abr,
    May,
    Jun,
    Jul,
    Ago,
    Set,
    Oct,
    Nov,
    Dic,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Ene,
        Month::Feb,
        Month::Mar,
        Month::Abr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Ago,
        Month::Set,
        Month::Oct,
        Month::Nov,
        Month::Dic,
    ];

    /// Zero-based position within the year.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn abbr(self) -> &'static str {
        match self {
            Month::Ene => "Ene",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Abr => "Abr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Ago => "Ago",
            Month::Set => "Set",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dic => "Dic",
        }
    }

    /// Header label used in the source file, e.g. `Ene-25`.
    pub fn column_label(self, fiscal_year: i32) -> String {
        format!("{}-{:02}", self.abbr(), fiscal_year.rem_euclid(100))
    }

    /// Parse a month abbreviation, with or without a `-yy` suffix.
    pub fn parse(s: &str) -> Option<Month> {
        let abbr = s.trim().split('-').next()?.trim();
        if abbr.eq_ignore_ascii_case("sep") {
            return Some(Month::Set);
        }
        Month::ALL
            .into_iter()
            .find(|m| m.abbr().eq_ignore_ascii_case(abbr))
    }
}

/// Portfolio classification (SABCT tiers plus lifecycle statuses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sabct {
    S,
    A,
    B,
    C,
    T,
    Nuevo,
    Gestion,
    Obsoleto,
}

impl Sabct {
    pub const ALL: [Sabct; 8] = [
        Sabct::S,
        Sabct::A,
        Sabct::B,
        Sabct::C,
        Sabct::T,
        Sabct::Nuevo,
        Sabct::Gestion,
        Sabct::Obsoleto,
    ];

    /// Classifications still in the active portfolio.
    pub const ACTIVE: [Sabct; 6] = [
        Sabct::S,
        Sabct::A,
        Sabct::B,
        Sabct::C,
        Sabct::T,
        Sabct::Nuevo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Sabct::S => "S",
            Sabct::A => "A",
            Sabct::B => "B",
            Sabct::C => "C",
            Sabct::T => "T",
            Sabct::Nuevo => "Nuevo",
            Sabct::Gestion => "Gestión",
            Sabct::Obsoleto => "Obsoleto",
        }
    }

    pub fn is_active(self) -> bool {
        !matches!(self, Sabct::Gestion | Sabct::Obsoleto)
    }

    /// Case-insensitive parse; `Gestión` and `Gestion` are equivalent.
    pub fn parse(s: &str) -> Option<Sabct> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("gestion") || s.to_lowercase() == "gestión" {
            return Some(Sabct::Gestion);
        }
        Sabct::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Sabct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Categorical or identifier column of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Articulo,
    Zona,
    Canal,
    Sabct,
}

impl Dimension {
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::Articulo => "ARTICULO",
            Dimension::Zona => "ZONA_CONSOLIDADO",
            Dimension::Canal => "CANAL",
            Dimension::Sabct => "SABCT",
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ARTICULO" => Ok(Dimension::Articulo),
            "ZONA_CONSOLIDADO" | "ZONA" => Ok(Dimension::Zona),
            "CANAL" => Ok(Dimension::Canal),
            "SABCT" => Ok(Dimension::Sabct),
            _ => Err(format!(
                "unknown grouping column '{s}' (expected ARTICULO, ZONA_CONSOLIDADO, CANAL or SABCT)"
            )),
        }
    }
}

/// Numeric column of a record (raw month or derived total).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    TotalYear,
    PrePeriodTotal,
    PostPeriodTotal,
    Month(Month),
}

impl Measure {
    pub fn column_name(self) -> String {
        match self {
            Measure::TotalYear => "TOTAL_YEAR".to_string(),
            Measure::PrePeriodTotal => "PRE_PERIOD_TOTAL".to_string(),
            Measure::PostPeriodTotal => "POST_PERIOD_TOTAL".to_string(),
            Measure::Month(m) => m.abbr().to_string(),
        }
    }
}

impl FromStr for Measure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TOTAL_YEAR" | "TOTAL" => Ok(Measure::TotalYear),
            "PRE_PERIOD_TOTAL" | "PRE" => Ok(Measure::PrePeriodTotal),
            "POST_PERIOD_TOTAL" | "POST" => Ok(Measure::PostPeriodTotal),
            _ => Month::parse(s)
                .map(Measure::Month)
                .ok_or_else(|| format!("unknown numeric column '{s}'")),
        }
    }
}

/// Any column that can be reduced by an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Dimension(Dimension),
    Measure(Measure),
}

impl Field {
    pub fn column_name(self) -> String {
        match self {
            Field::Dimension(d) => d.column_name().to_string(),
            Field::Measure(m) => m.column_name(),
        }
    }
}

impl From<Dimension> for Field {
    fn from(value: Dimension) -> Self {
        Field::Dimension(value)
    }
}

impl From<Measure> for Field {
    fn from(value: Measure) -> Self {
        Field::Measure(value)
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(d) = s.parse::<Dimension>() {
            return Ok(Field::Dimension(d));
        }
        s.parse::<Measure>()
            .map(Field::Measure)
            .map_err(|_| format!("unknown column '{s}'"))
    }
}

/// How the values of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Reducer {
    /// Add the numeric field across the group.
    Sum,
    /// Count distinct values of the field within the group.
    CountDistinct,
}

/// Number of months in the "pre" sub-period.
///
/// Pre months are `Month::ALL[..n]`, post months are `Month::ALL[n..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodSplit(usize);

impl PeriodSplit {
    pub fn new(pre_months: usize) -> Result<Self, MetricsError> {
        if pre_months > Month::ALL.len() {
            return Err(MetricsError::InvalidSplit { split: pre_months });
        }
        Ok(Self(pre_months))
    }

    pub fn pre_months(self) -> usize {
        self.0
    }

    pub fn post_months(self) -> usize {
        Month::ALL.len() - self.0
    }

    pub fn is_pre(self, month: Month) -> bool {
        month.index() < self.0
    }
}

impl Default for PeriodSplit {
    fn default() -> Self {
        Self(7)
    }
}

/// One row of the source dataset, with its derived totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    articulo: String,
    zona: String,
    canal: String,
    sabct: Sabct,
    monthly: [f64; 12],
    split: PeriodSplit,
    total_year: f64,
    pre_period_total: f64,
    post_period_total: f64,
}

impl SalesRecord {
    /// Build a record and compute its totals for `split`.
    ///
    /// `total_year` is `pre + post`, so the two sub-period totals always
    /// reconcile with it exactly. Amounts are not checked here; ingest only
    /// passes finite, non-negative values.
    pub(crate) fn new(
        articulo: impl Into<String>,
        zona: impl Into<String>,
        canal: impl Into<String>,
        sabct: Sabct,
        monthly: [f64; 12],
        split: PeriodSplit,
    ) -> Self {
        let (pre, post) = monthly.split_at(split.pre_months());
        let pre_period_total: f64 = pre.iter().sum();
        let post_period_total: f64 = post.iter().sum();
        Self {
            articulo: articulo.into(),
            zona: zona.into(),
            canal: canal.into(),
            sabct,
            monthly,
            split,
            total_year: pre_period_total + post_period_total,
            pre_period_total,
            post_period_total,
        }
    }

    pub fn articulo(&self) -> &str {
        &self.articulo
    }

    pub fn zona(&self) -> &str {
        &self.zona
    }

    pub fn canal(&self) -> &str {
        &self.canal
    }

    pub fn sabct(&self) -> Sabct {
        self.sabct
    }

    /// The split the sub-period totals were computed for.
    pub fn split(&self) -> PeriodSplit {
        self.split
    }

    pub fn month(&self, month: Month) -> f64 {
        self.monthly[month.index()]
    }

    pub fn total_year(&self) -> f64 {
        self.total_year
    }

    pub fn pre_period_total(&self) -> f64 {
        self.pre_period_total
    }

    pub fn post_period_total(&self) -> f64 {
        self.post_period_total
    }

    pub fn dimension(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Articulo => &self.articulo,
            Dimension::Zona => &self.zona,
            Dimension::Canal => &self.canal,
            Dimension::Sabct => self.sabct.label(),
        }
    }

    pub fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::TotalYear => self.total_year,
            Measure::PrePeriodTotal => self.pre_period_total,
            Measure::PostPeriodTotal => self.post_period_total,
            Measure::Month(m) => self.month(m),
        }
    }
}

/// An immutable, loaded dataset (records in source row order).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    source: PathBuf,
    split: PeriodSplit,
    fiscal_year: i32,
    records: Vec<SalesRecord>,
}

impl Dataset {
    /// Every record must have been built for `split`.
    pub(crate) fn new(
        source: impl Into<PathBuf>,
        split: PeriodSplit,
        fiscal_year: i32,
        records: Vec<SalesRecord>,
    ) -> Self {
        debug_assert!(
            records.iter().all(|r| r.split == split),
            "records built for a different period split"
        );
        Self {
            source: source.into(),
            split,
            fiscal_year,
            records,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn split(&self) -> PeriodSplit {
        self.split
    }

    pub fn fiscal_year(&self) -> i32 {
        self.fiscal_year
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Month column labels as they appear in the source header.
    pub fn month_labels(&self) -> Vec<String> {
        Month::ALL
            .iter()
            .map(|m| m.column_label(self.fiscal_year))
            .collect()
    }
}
