use chrono::NaiveDate;
use serde::Serialize;

use crate::{BucketKey, Granularity, Metric, Snapshot};

/// Bounds as supplied by a caller, before they are checked against the
/// timeline granularity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryRange {
    #[default]
    All,
    Dates {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    Keys {
        start: Option<BucketKey>,
        end: Option<BucketKey>,
    },
}

impl QueryRange {
    pub fn dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        if start.is_none() && end.is_none() {
            return Self::All;
        }
        Self::Dates { start, end }
    }

    pub fn keys(start: Option<BucketKey>, end: Option<BucketKey>) -> Self {
        if start.is_none() && end.is_none() {
            return Self::All;
        }
        Self::Keys { start, end }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Query {
    pub domains: Vec<String>,
    pub granularity: Granularity,
    pub range: QueryRange,
    pub metric: Metric,
    pub convert_dates: bool,
}

impl Query {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            ..Self::default()
        }
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_range(mut self, range: QueryRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_convert_dates(mut self, convert_dates: bool) -> Self {
        self.convert_dates = convert_dates;
        self
    }

    /// Requested domains in request order with duplicates removed; an empty
    /// request selects every domain of the snapshot in document order.
    pub fn resolved_domains(&self, snapshot: &Snapshot) -> Vec<String> {
        if self.domains.is_empty() {
            return snapshot.domain_names();
        }
        let mut resolved: Vec<String> = Vec::with_capacity(self.domains.len());
        for domain in &self.domains {
            let domain = domain.trim();
            if domain.is_empty() || resolved.iter().any(|seen| seen == domain) {
                continue;
            }
            resolved.push(domain.to_owned());
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainData;

    #[test]
    fn empty_domain_request_selects_snapshot_order() {
        let snapshot = Snapshot {
            domains: vec![DomainData::new("privacy"), DomainData::new("child")],
            ..Snapshot::default()
        };

        assert_eq!(
            Query::new(Granularity::Daily).resolved_domains(&snapshot),
            vec!["privacy", "child"]
        );
        assert_eq!(
            Query::new(Granularity::Daily)
                .with_domains(["child", " child ", "finance"])
                .resolved_domains(&snapshot),
            vec!["child", "finance"]
        );
    }

    #[test]
    fn open_bounds_collapse_to_all() {
        assert!(QueryRange::dates(None, None).is_all());
        assert!(QueryRange::keys(None, None).is_all());
        assert!(!QueryRange::dates(NaiveDate::from_ymd_opt(2025, 3, 1), None).is_all());
    }
}
