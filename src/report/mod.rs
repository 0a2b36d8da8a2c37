//! Dashboard figures.
//!
//! Each figure is computed from the metrics engine (`aggregate_by`,
//! `participation`, `period_comparison`) and returned as plain rows ready for
//! a presentation layer. A figure that fails is logged and left empty; the
//! other figures are still produced.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ReportConfig;
use crate::domain::{Dataset, Dimension, Field, Measure, Month, Reducer, Sabct, SalesRecord};
use crate::error::MetricsError;
use crate::metrics::{
    Aggregate, PeriodComparison, aggregate_by, aggregate_records, participation, percent_of,
    reduce_records, split_comparison,
};

pub mod format;

pub use format::*;

const TOTAL: Field = Field::Measure(Measure::TotalYear);
const SKU: Field = Field::Dimension(Dimension::Articulo);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Headline {
    pub total_sales: f64,
    pub monthly_average: f64,
    /// Distinct SKUs with `TOTAL_YEAR > 0`.
    pub skus_with_movement: usize,
    pub skus_total: usize,
    /// Share of SKUs with movement; `None` for an empty dataset.
    pub active_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthPoint {
    pub month: Month,
    pub label: String,
    pub total: f64,
    /// Month falls before the period split.
    pub pre_period: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub points: Vec<MonthPoint>,
    pub average: f64,
    pub peak: Option<Month>,
    pub trough: Option<Month>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelRow {
    pub channel: String,
    pub sales: f64,
    pub skus: usize,
    pub monthly_average: f64,
    pub participation: f64,
    pub color: Option<String>,
}

/// Distinct SKUs per channel and active classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassChannelMatrix {
    pub classes: Vec<Sabct>,
    pub rows: Vec<ClassChannelRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassChannelRow {
    pub channel: String,
    /// One count per entry of `classes`.
    pub skus: Vec<usize>,
    pub total: usize,
    /// This channel's share (%) of each class's distinct SKUs.
    pub shares: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZoneChannelMatrix {
    pub channels: Vec<String>,
    pub rows: Vec<ZoneChannelRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneChannelRow {
    pub zone: String,
    /// One value per entry of `channels`.
    pub sales: Vec<f64>,
    pub skus: Vec<usize>,
    pub total_sales: f64,
    pub total_skus: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneGroupShare {
    pub group: String,
    pub sales: f64,
    pub participation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusZone {
    pub zone: String,
    pub skus: usize,
    pub sales: f64,
    /// Share of the focus-zone total.
    pub contribution: f64,
}

/// All figures of the sales report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub source: String,
    pub fiscal_year: i32,
    pub split_months: usize,
    pub rows: usize,
    pub headline: Headline,
    pub trend: MonthlyTrend,
    pub period: Option<PeriodComparison>,
    pub channels: Vec<ChannelRow>,
    pub class_channel: ClassChannelMatrix,
    pub zone_channel: ZoneChannelMatrix,
    pub zone_groups: Vec<ZoneGroupShare>,
    pub focus_zones: Vec<FocusZone>,
}

/// Compute every figure for `dataset`.
pub fn build_dashboard(dataset: &Dataset, config: &ReportConfig) -> Dashboard {
    let dashboard = Dashboard {
        source: dataset.source().display().to_string(),
        fiscal_year: dataset.fiscal_year(),
        split_months: dataset.split().pre_months(),
        rows: dataset.len(),
        headline: local("headline", headline(dataset)).unwrap_or_default(),
        trend: local("monthly trend", monthly_trend(dataset)).unwrap_or_default(),
        period: local("period comparison", split_comparison(dataset)),
        channels: local("channels", channel_table(dataset, config)).unwrap_or_default(),
        class_channel: local("classification x channel", class_channel_matrix(dataset)).unwrap_or_default(),
        zone_channel: local("zone x channel", zone_channel_matrix(dataset, config.top_zones))
            .unwrap_or_default(),
        zone_groups: local("zone groups", zone_group_shares(dataset, config)).unwrap_or_default(),
        focus_zones: local("focus zones", focus_zones(dataset, &config.focus_zones)).unwrap_or_default(),
    };
    tracing::info!(
        rows = dashboard.rows,
        channels = dashboard.channels.len(),
        total_sales = dashboard.headline.total_sales,
        "dashboard computed"
    );
    dashboard
}

fn local<T>(figure: &str, result: Result<T, MetricsError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(figure, error = %e, "figure skipped");
            None
        }
    }
}

pub fn headline(dataset: &Dataset) -> Result<Headline, MetricsError> {
    let total_sales = reduce_records(dataset.records(), TOTAL, Reducer::Sum)?;
    let moving = dataset.records().iter().filter(|r| r.total_year() > 0.0);
    let skus_with_movement = reduce_records(moving, SKU, Reducer::CountDistinct)? as usize;
    let skus_total = reduce_records(dataset.records(), SKU, Reducer::CountDistinct)? as usize;

    Ok(Headline {
        total_sales,
        monthly_average: total_sales / Month::ALL.len() as f64,
        skus_with_movement,
        skus_total,
        active_share: (skus_total > 0)
            .then(|| percent_of(skus_with_movement as f64, skus_total as f64)),
    })
}

pub fn monthly_trend(dataset: &Dataset) -> Result<MonthlyTrend, MetricsError> {
    let mut points = Vec::with_capacity(Month::ALL.len());
    for (month, label) in Month::ALL.into_iter().zip(dataset.month_labels()) {
        let total = reduce_records(dataset.records(), Field::Measure(Measure::Month(month)), Reducer::Sum)?;
        points.push(MonthPoint {
            month,
            label,
            total,
            pre_period: dataset.split().is_pre(month),
        });
    }

    let average = points.iter().map(|p| p.total).sum::<f64>() / Month::ALL.len() as f64;
    let (peak, trough) = if dataset.is_empty() {
        (None, None)
    } else {
        (
            // Ties resolve to the earliest month.
            points
                .iter()
                .rev()
                .max_by(|a, b| a.total.total_cmp(&b.total))
                .map(|p| p.month),
            points.iter().min_by(|a, b| a.total.total_cmp(&b.total)).map(|p| p.month),
        )
    };

    Ok(MonthlyTrend {
        points,
        average,
        peak,
        trough,
    })
}

/// Sales, SKUs and participation per channel, largest first.
pub fn channel_table(dataset: &Dataset, config: &ReportConfig) -> Result<Vec<ChannelRow>, MetricsError> {
    let sales = aggregate_by(dataset, &[Dimension::Canal], TOTAL, Reducer::Sum)?;
    let skus = aggregate_by(dataset, &[Dimension::Canal], SKU, Reducer::CountDistinct)?;
    let shares = participation(&sales);

    Ok(sales
        .sorted_desc()
        .into_iter()
        .map(|(key, value)| {
            let channel = key[0].as_str();
            ChannelRow {
                channel: channel.to_string(),
                sales: value,
                skus: skus.get(&[channel]) as usize,
                monthly_average: value / Month::ALL.len() as f64,
                participation: shares.get(&[channel]),
                color: config.channel_color(channel).map(str::to_string),
            }
        })
        .collect())
}

/// Distinct SKUs per channel and active classification (`Gestión` and
/// `Obsoleto` excluded).
pub fn class_channel_matrix(dataset: &Dataset) -> Result<ClassChannelMatrix, MetricsError> {
    let active = || dataset.records().iter().filter(|r| r.sabct().is_active());
    let counts = aggregate_records(active(), &[Dimension::Canal, Dimension::Sabct], SKU, Reducer::CountDistinct)?;
    let class_totals = aggregate_records(active(), &[Dimension::Sabct], SKU, Reducer::CountDistinct)?;
    let per_channel = aggregate_records(active(), &[Dimension::Canal], SKU, Reducer::CountDistinct)?;

    let classes = Sabct::ACTIVE.to_vec();
    let rows = per_channel
        .sorted_desc()
        .into_iter()
        .map(|(key, _)| {
            let channel = key[0].as_str();
            let skus: Vec<usize> = classes
                .iter()
                .map(|c| counts.get(&[channel, c.label()]) as usize)
                .collect();
            let shares = classes
                .iter()
                .zip(&skus)
                .map(|(c, n)| percent_of(*n as f64, class_totals.get(&[c.label()])))
                .collect();
            ClassChannelRow {
                channel: channel.to_string(),
                total: skus.iter().sum(),
                skus,
                shares,
            }
        })
        .collect();

    Ok(ClassChannelMatrix { classes, rows })
}

/// Sales and SKUs per zone and channel for the `top_n` zones by sales.
pub fn zone_channel_matrix(dataset: &Dataset, top_n: usize) -> Result<ZoneChannelMatrix, MetricsError> {
    let keys = [Dimension::Zona, Dimension::Canal];
    let sales = aggregate_by(dataset, &keys, TOTAL, Reducer::Sum)?;
    let skus = aggregate_by(dataset, &keys, SKU, Reducer::CountDistinct)?;
    let zone_sales = aggregate_by(dataset, &[Dimension::Zona], TOTAL, Reducer::Sum)?;

    let channels: Vec<String> = {
        let mut set: Vec<String> = sales.iter().map(|(k, _)| k[1].clone()).collect();
        set.sort();
        set.dedup();
        set
    };

    let rows = zone_sales
        .sorted_desc()
        .into_iter()
        .take(top_n)
        .map(|(key, total_sales)| {
            let zone = key[0].as_str();
            let row_sales: Vec<f64> = channels.iter().map(|c| sales.get(&[zone, c.as_str()])).collect();
            let row_skus: Vec<usize> = channels.iter().map(|c| skus.get(&[zone, c.as_str()]) as usize).collect();
            ZoneChannelRow {
                zone: zone.to_string(),
                total_skus: row_skus.iter().sum(),
                sales: row_sales,
                skus: row_skus,
                total_sales,
            }
        })
        .collect();

    Ok(ZoneChannelMatrix { channels, rows })
}

/// Participation per configured zone group; unlisted zones go to the default group.
pub fn zone_group_shares(dataset: &Dataset, config: &ReportConfig) -> Result<Vec<ZoneGroupShare>, MetricsError> {
    let zone_sales = aggregate_by(dataset, &[Dimension::Zona], TOTAL, Reducer::Sum)?;
    let shares = participation(&zone_sales);

    let mut groups: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for (key, sales) in zone_sales.iter() {
        let zone = key[0].as_str();
        let entry = groups.entry(config.zone_group_of(zone)).or_insert((0.0, 0.0));
        entry.0 += sales;
        entry.1 += shares.get(&[zone]);
    }

    let order = config
        .zone_groups
        .iter()
        .map(|g| g.name.as_str())
        .chain(std::iter::once(config.default_zone_group.as_str()));

    let mut out: Vec<ZoneGroupShare> = Vec::new();
    for name in order {
        if out.iter().any(|g| g.group == name) {
            continue;
        }
        let (sales, participation) = groups.get(name).copied().unwrap_or((0.0, 0.0));
        out.push(ZoneGroupShare {
            group: name.to_string(),
            sales,
            participation,
        });
    }
    Ok(out)
}

/// SKUs, sales and contribution for each focus zone, in configured order.
pub fn focus_zones(dataset: &Dataset, zones: &[String]) -> Result<Vec<FocusZone>, MetricsError> {
    let in_focus = |r: &&SalesRecord| zones.iter().any(|z| z.trim().eq_ignore_ascii_case(r.zona()));
    let focus: Vec<&SalesRecord> = dataset.records().iter().filter(in_focus).collect();

    let sales = aggregate_records(focus.iter().copied(), &[Dimension::Zona], TOTAL, Reducer::Sum)?;
    let skus = aggregate_records(focus.iter().copied(), &[Dimension::Zona], SKU, Reducer::CountDistinct)?;
    let total = sales.total();

    Ok(zones
        .iter()
        .map(|zone| {
            let zone_sales = sum_ci(&sales, zone);
            FocusZone {
                zone: zone.clone(),
                skus: sum_ci(&skus, zone) as usize,
                sales: zone_sales,
                contribution: percent_of(zone_sales, total),
            }
        })
        .collect())
}

fn sum_ci(aggregate: &Aggregate, zone: &str) -> f64 {
    aggregate
        .iter()
        .filter(|(k, _)| k[0].eq_ignore_ascii_case(zone.trim()))
        .map(|(_, v)| v)
        .sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::PeriodSplit;

    fn rec(sku: &str, zona: &str, canal: &str, sabct: Sabct, pre: f64, post: f64) -> SalesRecord {
        let mut months = [0.0; 12];
        for (i, m) in months.iter_mut().enumerate() {
            *m = if i < 7 { pre } else { post };
        }
        SalesRecord::new(sku, zona, canal, sabct, months, PeriodSplit::default())
    }

    pub(crate) fn fixture() -> Dataset {
        let records = vec![
            rec("SKU1", "WILSON", "MINORISTA", Sabct::S, 100.0, 50.0),
            rec("SKU2", "WILSON", "MINORISTA", Sabct::A, 10.0, 10.0),
            rec("SKU1", "PARURO", "MINORISTA", Sabct::S, 20.0, 0.0),
            rec("SKU3", "AREQUIPA", "RETAIL", Sabct::Nuevo, 30.0, 30.0),
            rec("SKU4", "AREQUIPA", "INTEGRADOR", Sabct::Obsoleto, 0.0, 0.0),
        ];
        Dataset::new("fixture.csv", PeriodSplit::default(), 2025, records)
    }

    #[test]
    fn headline_counts() {
        let h = headline(&fixture()).unwrap();
        // 950 + 120 + 140 + 360
        assert!((h.total_sales - 1570.0).abs() < 1e-9);
        assert!((h.monthly_average - 1570.0 / 12.0).abs() < 1e-9);
        assert_eq!(h.skus_with_movement, 3);
        assert_eq!(h.skus_total, 4);
        assert_eq!(h.active_share, Some(75.0));

        let empty = Dataset::new("e.csv", PeriodSplit::default(), 2025, vec![]);
        assert_eq!(headline(&empty).unwrap().active_share, None);
    }

    #[test]
    fn trend_peak_and_trough() {
        let t = monthly_trend(&fixture()).unwrap();
        assert_eq!(t.points.len(), 12);
        assert_eq!(t.points[0].label, "Ene-25");
        assert_eq!(t.points[11].label, "Dic-25");
        assert!(t.points[6].pre_period);
        assert!(!t.points[7].pre_period);
        assert_eq!(t.points[0].total, 160.0);
        assert_eq!(t.points[11].total, 90.0);
        assert_eq!(t.peak, Some(Month::Ene));
        assert_eq!(t.trough, Some(Month::Ago));
    }

    #[test]
    fn channel_table_is_sorted_and_closes() {
        let rows = channel_table(&fixture(), &ReportConfig::default()).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.channel.as_str()).collect();
        assert_eq!(names, ["MINORISTA", "RETAIL", "INTEGRADOR"]);
        assert_eq!(rows[0].skus, 2);
        assert_eq!(rows[0].color.as_deref(), Some("#4361ee"));
        let total: f64 = rows.iter().map(|r| r.participation).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(rows[2].participation, 0.0);
    }

    #[test]
    fn class_matrix_excludes_inactive() {
        let m = class_channel_matrix(&fixture()).unwrap();
        assert_eq!(m.classes, Sabct::ACTIVE.to_vec());
        assert!(m.rows.iter().all(|r| r.channel != "INTEGRADOR"));
        let minorista = m.rows.iter().find(|r| r.channel == "MINORISTA").unwrap();
        assert_eq!(minorista.skus, vec![1, 1, 0, 0, 0, 0]);
        assert_eq!(minorista.total, 2);
        assert_eq!(minorista.shares[0], 100.0);
        assert_eq!(minorista.shares[2], 0.0);
    }

    #[test]
    fn zone_matrix_orders_by_sales() {
        let m = zone_channel_matrix(&fixture(), 2).unwrap();
        assert_eq!(m.channels, ["INTEGRADOR", "MINORISTA", "RETAIL"]);
        assert_eq!(m.rows.len(), 2);
        assert_eq!(m.rows[0].zone, "WILSON");
        assert_eq!(m.rows[0].sales, vec![0.0, 1070.0, 0.0]);
        assert_eq!(m.rows[0].total_skus, 2);
        assert_eq!(m.rows[1].zone, "AREQUIPA");
        assert_eq!(m.rows[1].skus, vec![1, 0, 1]);
    }

    #[test]
    fn zone_groups_use_config() {
        let groups = zone_group_shares(&fixture(), &ReportConfig::default()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group, "Lima");
        assert!((groups[0].sales - 1210.0).abs() < 1e-9);
        assert_eq!(groups[1].group, "Provincia");
        let total: f64 = groups.iter().map(|g| g.participation).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn focus_zone_contribution() {
        let zones = vec!["WILSON".to_string(), "paruro".to_string(), "MARSANO".to_string()];
        let rows = focus_zones(&fixture(), &zones).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].skus, 2);
        assert!((rows[0].contribution - 1070.0 / 1210.0 * 100.0).abs() < 1e-9);
        assert_eq!(rows[1].sales, 140.0);
        assert_eq!(rows[2].sales, 0.0);
        assert_eq!(rows[2].contribution, 0.0);
    }

    #[test]
    fn dashboard_survives_undefined_comparison() {
        let mut months = [0.0; 12];
        months[10] = 5.0;
        let ds = Dataset::new(
            "late.csv",
            PeriodSplit::default(),
            2025,
            vec![SalesRecord::new("SKU1", "LIMA", "RETAIL", Sabct::A, months, PeriodSplit::default())],
        );
        let d = build_dashboard(&ds, &ReportConfig::default());
        let period = d.period.unwrap();
        assert!(period.percent_change.is_none());
        assert_eq!(d.channels.len(), 1);

        let ds = Dataset::new("all-pre.csv", PeriodSplit::new(12).unwrap(), 2025, vec![]);
        let d = build_dashboard(&ds, &ReportConfig::default());
        assert!(d.period.is_none());
        assert_eq!(d.headline, Headline::default());
    }
}
