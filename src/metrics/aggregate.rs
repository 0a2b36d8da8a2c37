//! Group-by aggregation and participation shares.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::{Dataset, Dimension, Field, Reducer, SalesRecord};
use crate::error::MetricsError;

/// One value per group-key field, in the order the keys were requested.
pub type GroupKey = Vec<String>;

/// Result of `aggregate_by`: a value per group.
///
/// Groups only exist for key tuples that occur in the data; `get` reports
/// any other tuple as `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    dimensions: Vec<Dimension>,
    values: BTreeMap<GroupKey, f64>,
}

impl Aggregate {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self {
            dimensions,
            values: BTreeMap::new(),
        }
    }

    pub fn from_pairs<I, K>(dimensions: Vec<Dimension>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<GroupKey>,
    {
        Self {
            dimensions,
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn get(&self, key: &[&str]) -> f64 {
        let key: GroupKey = key.iter().map(|s| s.to_string()).collect();
        self.values.get(&key).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    /// Sum of every group value.
    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }

    /// Groups sorted by value, largest first (ties by key).
    pub fn sorted_desc(&self) -> Vec<(&GroupKey, f64)> {
        let mut rows: Vec<_> = self.iter().collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DistinctValue {
    Text(String),
    Number(u64),
}

fn distinct_value(record: &SalesRecord, field: Field) -> DistinctValue {
    match field {
        Field::Dimension(d) => DistinctValue::Text(record.dimension(d).to_string()),
        Field::Measure(m) => {
            // -0.0 and 0.0 are the same amount.
            let v = record.measure(m);
            let v = if v == 0.0 { 0.0 } else { v };
            DistinctValue::Number(v.to_bits())
        }
    }
}

/// Group `dataset` by `group_keys` and reduce `metric` within each group.
pub fn aggregate_by(
    dataset: &Dataset,
    group_keys: &[Dimension],
    metric: Field,
    reducer: Reducer,
) -> Result<Aggregate, MetricsError> {
    aggregate_records(dataset.records(), group_keys, metric, reducer)
}

/// Same as `aggregate_by`, over any subset of records.
pub fn aggregate_records<'a, I>(
    records: I,
    group_keys: &[Dimension],
    metric: Field,
    reducer: Reducer,
) -> Result<Aggregate, MetricsError>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    if group_keys.is_empty() {
        return Err(MetricsError::InvalidAggregation(
            "at least one group key is required".to_string(),
        ));
    }

    let key_of = |r: &SalesRecord| -> GroupKey {
        group_keys
            .iter()
            .map(|d| r.dimension(*d).to_string())
            .collect()
    };

    let mut out = Aggregate::new(group_keys.to_vec());
    match (reducer, metric) {
        (Reducer::Sum, Field::Measure(measure)) => {
            for r in records {
                *out.values.entry(key_of(r)).or_insert(0.0) += r.measure(measure);
            }
        }
        (Reducer::Sum, Field::Dimension(d)) => {
            return Err(MetricsError::InvalidAggregation(format!(
                "cannot SUM categorical column `{}`",
                d.column_name()
            )));
        }
        (Reducer::CountDistinct, field) => {
            let mut seen: HashMap<GroupKey, HashSet<DistinctValue>> = HashMap::new();
            for r in records {
                seen.entry(key_of(r))
                    .or_default()
                    .insert(distinct_value(r, field));
            }
            out.values = seen
                .into_iter()
                .map(|(k, set)| (k, set.len() as f64))
                .collect();
        }
    }
    Ok(out)
}

/// Reduce `metric` over the records without grouping.
pub fn reduce_records<'a, I>(records: I, metric: Field, reducer: Reducer) -> Result<f64, MetricsError>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    match (reducer, metric) {
        (Reducer::Sum, Field::Measure(measure)) => Ok(records.into_iter().map(|r| r.measure(measure)).sum()),
        (Reducer::Sum, Field::Dimension(d)) => Err(MetricsError::InvalidAggregation(format!(
            "cannot SUM categorical column `{}`",
            d.column_name()
        ))),
        (Reducer::CountDistinct, field) => {
            let set: HashSet<DistinctValue> = records
                .into_iter()
                .map(|r| distinct_value(r, field))
                .collect();
            Ok(set.len() as f64)
        }
    }
}

/// Convert group values into percentages of their grand total.
///
/// When the grand total is zero or not finite every share is `0.0`.
pub fn participation(aggregate: &Aggregate) -> Aggregate {
    let total = aggregate.total();
    let values = aggregate
        .values
        .iter()
        .map(|(k, v)| (k.clone(), percent_of(*v, total)))
        .collect();
    Aggregate {
        dimensions: aggregate.dimensions.clone(),
        values,
    }
}

/// `numerator / denominator * 100`, or `0.0` when the denominator is zero
/// or the share is not finite.
pub fn percent_of(numerator: f64, denominator: f64) -> f64 {
    let pct = numerator / denominator * 100.0;
    if denominator == 0.0 || !pct.is_finite() {
        0.0
    } else {
        pct
    }
}
