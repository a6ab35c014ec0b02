use lawpulse_core::{
    Bucket, BucketKey, DomainData, Granularity, Metric, Query, Snapshot, WeekNumbering,
};
use serde::Serialize;

use crate::range::{BucketRange, RangeError, filter_keys, resolve_range, select_buckets};

/// A query with its domains resolved against a snapshot and its bounds
/// typed for the query granularity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryContext {
    pub domains: Vec<String>,
    pub granularity: Granularity,
    pub metric: Metric,
    pub range: BucketRange,
}

impl QueryContext {
    pub fn new(
        domains: Vec<String>,
        granularity: Granularity,
        metric: Metric,
        range: BucketRange,
    ) -> Self {
        Self {
            domains,
            granularity,
            metric,
            range,
        }
    }

    pub fn resolve(
        query: &Query,
        snapshot: &Snapshot,
        numbering: WeekNumbering,
    ) -> Result<Self, RangeError> {
        let range = resolve_range(
            &query.range,
            query.granularity,
            query.convert_dates,
            numbering,
        )?;
        Ok(Self::new(
            query.resolved_domains(snapshot),
            query.granularity,
            query.metric,
            range,
        ))
    }

    pub fn with_metric(&self, metric: Metric) -> Self {
        Self {
            metric,
            ..self.clone()
        }
    }

    /// Requested domains present in the snapshot, in request order.
    pub fn present_domains<'a>(
        &'a self,
        snapshot: &'a Snapshot,
    ) -> impl Iterator<Item = &'a DomainData> + 'a {
        self.domains
            .iter()
            .filter_map(move |name| snapshot.domain(name))
    }

    pub fn missing_domains(&self, snapshot: &Snapshot) -> Vec<String> {
        self.domains
            .iter()
            .filter(|name| snapshot.domain(name).is_none())
            .cloned()
            .collect()
    }

    pub fn buckets<'a>(&self, domain: &'a DomainData) -> Result<Vec<&'a Bucket>, RangeError> {
        self.buckets_for(domain, self.metric)
    }

    pub fn buckets_for<'a>(
        &self,
        domain: &'a DomainData,
        metric: Metric,
    ) -> Result<Vec<&'a Bucket>, RangeError> {
        select_buckets(domain.timeline(metric, self.granularity), &self.range)
    }

    /// Union of selected keys over the context domains for one channel,
    /// chronological.
    pub fn selected_keys(
        &self,
        snapshot: &Snapshot,
        metric: Metric,
    ) -> Result<Vec<BucketKey>, RangeError> {
        let mut keys = Vec::new();
        for domain in self.present_domains(snapshot) {
            keys.extend(domain.timeline(metric, self.granularity).keys());
        }
        keys.sort();
        keys.dedup();
        filter_keys(self.granularity, &keys, &self.range)
    }
}
