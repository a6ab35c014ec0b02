use std::collections::{BTreeMap, HashMap};

use lawpulse_core::{BucketKey, Granularity, Metric, Snapshot};
use serde::Serialize;

use crate::context::QueryContext;
use crate::range::{BucketRange, RangeError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelTotal {
    pub label: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketTotal {
    pub key: BucketKey,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct VolumeSummary {
    pub total: u64,
    pub by_domain: Vec<LabelTotal>,
    pub by_theme: Vec<LabelTotal>,
    pub by_incident: Vec<LabelTotal>,
    pub by_bucket: Vec<BucketTotal>,
    pub missing_domains: Vec<String>,
}

/// Sums per label, remembering the order labels were first seen.
#[derive(Debug, Default)]
pub(crate) struct LabelAccumulator {
    totals: Vec<LabelTotal>,
    index: HashMap<String, usize>,
}

impl LabelAccumulator {
    pub(crate) fn add(&mut self, label: &str, amount: u64) {
        match self.index.get(label) {
            Some(position) => {
                let entry = &mut self.totals[*position];
                entry.total = entry.total.saturating_add(amount);
            }
            None => {
                self.index.insert(label.to_owned(), self.totals.len());
                self.totals.push(LabelTotal {
                    label: label.to_owned(),
                    total: amount,
                });
            }
        }
    }

    pub(crate) fn into_totals(self) -> Vec<LabelTotal> {
        self.totals
    }
}

pub fn aggregate_volume(
    snapshot: &Snapshot,
    domains: &[String],
    granularity: Granularity,
    range: &BucketRange,
    metric: Metric,
) -> Result<VolumeSummary, RangeError> {
    let context = QueryContext::new(domains.to_vec(), granularity, metric, *range);
    volume_for_context(snapshot, &context)
}

pub(crate) fn volume_for_context(
    snapshot: &Snapshot,
    context: &QueryContext,
) -> Result<VolumeSummary, RangeError> {
    // Validates the range even when no requested domain exists.
    context.selected_keys(snapshot, context.metric)?;

    let mut summary = VolumeSummary::default();
    let mut by_domain = LabelAccumulator::default();
    let mut by_theme = LabelAccumulator::default();
    let mut by_incident = LabelAccumulator::default();
    let mut by_bucket = BTreeMap::<BucketKey, u64>::new();

    for name in &context.domains {
        let Some(domain) = snapshot.domain(name) else {
            by_domain.add(name, 0);
            summary.missing_domains.push(name.clone());
            continue;
        };
        let mut domain_total = 0;
        for bucket in context.buckets(domain)? {
            for theme in &bucket.themes {
                by_theme.add(&theme.name, theme.total());
                for incident in &theme.incidents {
                    by_incident.add(&incident.name, incident.count);
                }
            }
            let bucket_total = bucket.total();
            let slot = by_bucket.entry(bucket.key.clone()).or_insert(0);
            *slot = slot.saturating_add(bucket_total);
            domain_total = u64::saturating_add(domain_total, bucket_total);
        }
        by_domain.add(name, domain_total);
        summary.total = summary.total.saturating_add(domain_total);
    }

    summary.by_domain = by_domain.into_totals();
    summary.by_theme = by_theme.into_totals();
    summary.by_incident = by_incident.into_totals();
    summary.by_bucket = by_bucket
        .into_iter()
        .map(|(key, total)| BucketTotal { key, total })
        .collect();
    Ok(summary)
}

/// Bottom-up totals per bucket over whole timelines, summed across domains.
pub fn bucket_totals(
    snapshot: &Snapshot,
    domains: &[String],
    granularity: Granularity,
    metric: Metric,
) -> BTreeMap<BucketKey, u64> {
    let mut totals = BTreeMap::new();
    for domain in domains.iter().filter_map(|name| snapshot.domain(name)) {
        for (key, bucket) in &domain.timeline(metric, granularity).buckets {
            let slot = totals.entry(key.clone()).or_insert(0);
            *slot = u64::saturating_add(*slot, bucket.total());
        }
    }
    totals
}
