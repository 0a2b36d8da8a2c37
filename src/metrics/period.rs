//! Before/after comparison around the period split.

use serde::Serialize;

use crate::domain::Dataset;
use crate::error::MetricsError;

/// Monthly averages of the two sub-periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub pre_months: usize,
    pub post_months: usize,
    pub pre_total: f64,
    pub post_total: f64,
    pub pre_average: f64,
    pub post_average: f64,
    /// `(post / pre - 1) * 100`; `None` when the pre average is zero or
    /// either average is not finite.
    pub percent_change: Option<f64>,
}

impl PeriodComparison {
    /// The percent change, or `DivisionUndefined` when the pre average is zero.
    pub fn try_percent_change(&self) -> Result<f64, MetricsError> {
        self.percent_change.ok_or(MetricsError::DivisionUndefined {
            what: "percent change",
        })
    }
}

/// Compare the monthly average sales before and after the split.
///
/// Fails with `DivisionUndefined` if either month count is zero; a zero pre
/// average is not an error and yields `percent_change = None`.
pub fn period_comparison(
    dataset: &Dataset,
    pre_months: usize,
    post_months: usize,
) -> Result<PeriodComparison, MetricsError> {
    if pre_months == 0 {
        return Err(MetricsError::DivisionUndefined {
            what: "pre-period average",
        });
    }
    if post_months == 0 {
        return Err(MetricsError::DivisionUndefined {
            what: "post-period average",
        });
    }

    let pre_total: f64 = dataset.records().iter().map(|r| r.pre_period_total()).sum();
    let post_total: f64 = dataset.records().iter().map(|r| r.post_period_total()).sum();
    let pre_average = pre_total / pre_months as f64;
    let post_average = post_total / post_months as f64;

    // Overflowed totals give no meaningful change either.
    let percent_change = if pre_average == 0.0 || !pre_average.is_finite() || !post_average.is_finite() {
        None
    } else {
        Some((post_average / pre_average - 1.0) * 100.0)
    };

    Ok(PeriodComparison {
        pre_months,
        post_months,
        pre_total,
        post_total,
        pre_average,
        post_average,
        percent_change,
    })
}

/// `period_comparison` using the month counts of the dataset's own split.
pub fn split_comparison(dataset: &Dataset) -> Result<PeriodComparison, MetricsError> {
    let split = dataset.split();
    period_comparison(dataset, split.pre_months(), split.post_months())
}
