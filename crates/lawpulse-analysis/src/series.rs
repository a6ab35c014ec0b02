use std::collections::{BTreeMap, BTreeSet};

use lawpulse_core::{BucketKey, Metric, Snapshot};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::context::QueryContext;
use crate::range::RangeError;

const DATE_FIELD: &str = "date";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedSeries {
    pub name: String,
    pub values: BTreeMap<BucketKey, f64>,
}

impl NamedSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, key: BucketKey, value: f64) {
        *self.values.entry(key).or_insert(0.0) += value;
    }
}

/// One bucket of a merged series, serialized flat as
/// `{"date": key, "<metric>": value, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub key: BucketKey,
    pub values: Vec<(String, f64)>,
}

impl SeriesPoint {
    pub fn value(&self, metric: &str) -> f64 {
        self.values
            .iter()
            .find(|(name, _)| name == metric)
            .map(|(_, value)| *value)
            .unwrap_or(0.0)
    }

    /// Sum of the named metrics; an empty selection sums every metric.
    pub fn merged(&self, metrics: &[&str]) -> f64 {
        if metrics.is_empty() {
            return self.values.iter().map(|(_, value)| value).sum();
        }
        metrics.iter().map(|metric| self.value(metric)).sum()
    }
}

impl Serialize for SeriesPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry(DATE_FIELD, &self.key)?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeSeries {
    pub metrics: Vec<String>,
    pub points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn merged_values(&self, metrics: &[&str]) -> Vec<(BucketKey, f64)> {
        self.points
            .iter()
            .map(|point| (point.key.clone(), point.merged(metrics)))
            .collect()
    }
}

/// Union of all keys in chronological order, with 0 where a series has no
/// value. Metrics keep request order; repeated names are summed. A series
/// named `date` is published as `date_value` so it cannot shadow the key.
pub fn build_time_series(series: &[NamedSeries]) -> TimeSeries {
    let mut metrics: Vec<String> = Vec::new();
    for named in series {
        let name = metric_name(&named.name);
        if !metrics.contains(&name) {
            metrics.push(name);
        }
    }

    let keys = series
        .iter()
        .flat_map(|named| named.values.keys().cloned())
        .collect::<BTreeSet<_>>();

    let points = keys
        .into_iter()
        .map(|key| {
            let mut values = metrics
                .iter()
                .map(|name| (name.clone(), 0.0))
                .collect::<Vec<_>>();
            for named in series {
                let Some(value) = named.values.get(&key) else {
                    continue;
                };
                let metric = metric_name(&named.name);
                if let Some(slot) = values.iter_mut().find(|(name, _)| *name == metric) {
                    slot.1 += value;
                }
            }
            SeriesPoint { key, values }
        })
        .collect();

    TimeSeries { metrics, points }
}

fn metric_name(name: &str) -> String {
    if name == DATE_FIELD {
        format!("{DATE_FIELD}_value")
    } else {
        name.to_owned()
    }
}

/// `news` and `social` bucket totals over the selected range, summed across
/// the context domains.
pub fn channel_series(
    snapshot: &Snapshot,
    context: &QueryContext,
) -> Result<Vec<NamedSeries>, RangeError> {
    let mut series = Vec::with_capacity(2);
    for metric in [Metric::News, Metric::Social] {
        let mut named = NamedSeries::new(metric.as_str());
        for domain in context.present_domains(snapshot) {
            for bucket in context.buckets_for(domain, metric)? {
                named.add(bucket.key.clone(), bucket.total() as f64);
            }
        }
        series.push(named);
    }
    Ok(series)
}
