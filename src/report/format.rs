//! Formatted terminal output.
//!
//! We keep formatting code in one place so the metrics code stays free of
//! presentation concerns and output changes stay local.

use crate::domain::Field;
use crate::metrics::{Aggregate, PeriodComparison};
use crate::report::{Dashboard, Headline, MonthlyTrend};

/// Format the full dashboard summary.
pub fn format_dashboard(d: &Dashboard) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Ventas {} - Movimiento de inventario ===\n", d.fiscal_year));
    out.push_str(&format!("Source: {} ({} rows)\n\n", d.source, d.rows));

    out.push_str(&format_headline(&d.headline));
    out.push('\n');
    out.push_str(&format_trend(&d.trend));
    out.push('\n');

    match &d.period {
        Some(cmp) => out.push_str(&format_comparison(cmp)),
        None => out.push_str("Period comparison: not available\n"),
    }
    out.push('\n');

    out.push_str("Sales by channel:\n");
    out.push_str(&format_row(&["channel", "sales", "skus", "monthly avg", "share"], &[16, 14, 6, 12, 8]));
    out.push_str(&separator(&[16, 14, 6, 12, 8]));
    for r in &d.channels {
        out.push_str(&format_row(
            &[
                truncate(&r.channel, 16).as_str(),
                fmt_money(r.sales).as_str(),
                r.skus.to_string().as_str(),
                fmt_money(r.monthly_average).as_str(),
                fmt_pct(r.participation).as_str(),
            ],
            &[16, 14, 6, 12, 8],
        ));
    }
    out.push('\n');

    out.push_str("SKUs by channel and classification (share of class):\n");
    let mut header: Vec<String> = vec!["channel".to_string()];
    header.extend(d.class_channel.classes.iter().map(|c| c.label().to_string()));
    header.push("total".to_string());
    let widths: Vec<usize> = std::iter::once(16)
        .chain(d.class_channel.classes.iter().map(|_| 11))
        .chain(std::iter::once(6))
        .collect();
    out.push_str(&format_row(&header.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    out.push_str(&separator(&widths));
    for r in &d.class_channel.rows {
        let mut cells = vec![truncate(&r.channel, 16)];
        cells.extend(
            r.skus
                .iter()
                .zip(&r.shares)
                .map(|(n, s)| format!("{n} ({s:.0}%)")),
        );
        cells.push(r.total.to_string());
        out.push_str(&format_row(&cells.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    }
    out.push('\n');

    out.push_str("Sales by zone and channel (top zones):\n");
    let mut header: Vec<String> = vec!["zone".to_string()];
    header.extend(d.zone_channel.channels.iter().map(|c| truncate(c, 12)));
    header.push("total".to_string());
    let widths: Vec<usize> = std::iter::once(16)
        .chain(d.zone_channel.channels.iter().map(|_| 12))
        .chain(std::iter::once(14))
        .collect();
    out.push_str(&format_row(&header.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    out.push_str(&separator(&widths));
    for r in &d.zone_channel.rows {
        let mut cells = vec![truncate(&r.zone, 16)];
        cells.extend(r.sales.iter().map(|v| fmt_money(*v)));
        cells.push(fmt_money(r.total_sales));
        out.push_str(&format_row(&cells.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    }
    out.push('\n');

    out.push_str("Zone groups:\n");
    for g in &d.zone_groups {
        out.push_str(&format!("- {:<12} {:>14} {:>8}\n", g.group, fmt_money(g.sales), fmt_pct(g.participation)));
    }

    if !d.focus_zones.is_empty() {
        out.push_str("\nFocus zones:\n");
        out.push_str(&format_row(&["zone", "skus", "sales", "share"], &[16, 6, 14, 8]));
        out.push_str(&separator(&[16, 6, 14, 8]));
        for z in &d.focus_zones {
            out.push_str(&format_row(
                &[
                    truncate(&z.zone, 16).as_str(),
                    z.skus.to_string().as_str(),
                    fmt_money(z.sales).as_str(),
                    fmt_pct(z.contribution).as_str(),
                ],
                &[16, 6, 14, 8],
            ));
        }
    }

    out
}

pub fn format_headline(h: &Headline) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total sales:      {}\n", fmt_money(h.total_sales)));
    out.push_str(&format!("Monthly average:  {}\n", fmt_money(h.monthly_average)));
    out.push_str(&format!(
        "SKUs with sales:  {} of {} ({})\n",
        h.skus_with_movement,
        h.skus_total,
        h.active_share.map(fmt_pct).unwrap_or_else(|| "-".to_string()),
    ));
    out
}

pub fn format_trend(t: &MonthlyTrend) -> String {
    let mut out = String::from("Monthly sales:\n");
    for p in &t.points {
        let mark = if Some(p.month) == t.peak {
            " <- peak"
        } else if Some(p.month) == t.trough {
            " <- low"
        } else {
            ""
        };
        out.push_str(&format!("  {:<8} {:>14}{mark}\n", p.label, fmt_money(p.total)));
    }
    out.push_str(&format!("  {:<8} {:>14}\n", "average", fmt_money(t.average)));
    out
}

pub fn format_comparison(c: &PeriodComparison) -> String {
    let change = c
        .percent_change
        .map(|v| format!("{v:+.1}%"))
        .unwrap_or_else(|| "undefined (no pre-period sales)".to_string());
    format!(
        "Before split ({} months): {} / month\nAfter split ({} months):  {} / month\nChange: {change}\n",
        c.pre_months,
        fmt_money(c.pre_average),
        c.post_months,
        fmt_money(c.post_average),
    )
}

/// Format a single aggregate, largest group first.
pub fn format_aggregate(aggregate: &Aggregate, metric: Field, as_share: bool) -> String {
    let mut widths: Vec<usize> = aggregate.dimensions().iter().map(|_| 20).collect();
    widths.push(16);

    let mut header: Vec<String> = aggregate
        .dimensions()
        .iter()
        .map(|d| d.column_name().to_string())
        .collect();
    header.push(if as_share {
        "share".to_string()
    } else {
        metric.column_name()
    });

    let mut out = format_row(&header.iter().map(String::as_str).collect::<Vec<_>>(), &widths);
    out.push_str(&separator(&widths));
    for (key, value) in aggregate.sorted_desc() {
        let mut cells: Vec<String> = key.iter().map(|k| truncate(k, 20)).collect();
        cells.push(if as_share {
            fmt_pct(value)
        } else {
            fmt_number(value)
        });
        out.push_str(&format_row(&cells.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    }
    out.push_str(&format!("{} groups\n", aggregate.len()));
    out
}

fn format_row(cells: &[&str], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if i == 0 {
            line.push_str(&format!("{cell:<width$}"));
        } else {
            line.push_str(&format!(" {cell:>width$}"));
        }
    }
    let mut line = line.trim_end().to_string();
    line.push('\n');
    line
}

fn separator(widths: &[usize]) -> String {
    let parts: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    format!("{}\n", parts.join(" "))
}

/// `1234567.8` -> `$1,234,568`.
pub fn fmt_money(v: f64) -> String {
    format!("${}", group_thousands(v.round()))
}

fn fmt_number(v: f64) -> String {
    if v.fract() == 0.0 {
        group_thousands(v)
    } else {
        format!("{v:.2}")
    }
}

fn fmt_pct(v: f64) -> String {
    format!("{v:.1}%")
}

fn group_thousands(v: f64) -> String {
    let digits = format!("{:.0}", v.abs());
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if v < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
