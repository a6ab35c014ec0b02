use lawpulse_core::{BucketKey, DomainData, Incident, RepresentativeItem, Snapshot, Theme};
use serde::Serialize;

use crate::context::QueryContext;
use crate::series::TimeSeries;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepresentativeDetail {
    pub domain: String,
    pub theme: String,
    pub incident: Option<String>,
    pub count: u64,
    pub representative_item: Option<RepresentativeItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PeakRecord {
    pub date: Option<BucketKey>,
    pub value: f64,
    pub representative_detail: Option<RepresentativeDetail>,
}

impl PeakRecord {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
    }
}

/// Bucket with the largest merged value; the earliest bucket wins ties. An
/// empty or all-zero series has no peak.
pub fn find_peak(
    series: &TimeSeries,
    metrics: &[&str],
    snapshot: &Snapshot,
    context: &QueryContext,
) -> PeakRecord {
    let mut best: Option<(&BucketKey, f64)> = None;
    for point in &series.points {
        let value = point.merged(metrics);
        if value > 0.0 && best.is_none_or(|(_, current)| value > current) {
            best = Some((&point.key, value));
        }
    }
    let Some((key, value)) = best else {
        return PeakRecord::empty();
    };

    PeakRecord {
        date: Some(key.clone()),
        value,
        representative_detail: representative_detail(snapshot, context, key),
    }
}

/// Highest theme in the bucket across the context domains, then that
/// theme's highest incident.
pub fn representative_detail(
    snapshot: &Snapshot,
    context: &QueryContext,
    key: &BucketKey,
) -> Option<RepresentativeDetail> {
    let mut best: Option<(&DomainData, &Theme)> = None;
    let mut best_total = 0;
    for domain in context.present_domains(snapshot) {
        let Some(bucket) = domain.timeline(context.metric, context.granularity).get(key) else {
            continue;
        };
        for theme in &bucket.themes {
            let total = theme.total();
            if best.is_none() || total > best_total {
                best = Some((domain, theme));
                best_total = total;
            }
        }
    }
    let (domain, theme) = best?;

    let mut top_incident: Option<&Incident> = None;
    for incident in &theme.incidents {
        if top_incident.is_none_or(|current| incident.count > current.count) {
            top_incident = Some(incident);
        }
    }

    Some(match top_incident {
        Some(incident) => RepresentativeDetail {
            domain: domain.name.clone(),
            theme: theme.name.clone(),
            incident: Some(incident.name.clone()),
            count: incident.count,
            representative_item: incident.representative_item.clone(),
        },
        None => RepresentativeDetail {
            domain: domain.name.clone(),
            theme: theme.name.clone(),
            incident: None,
            count: best_total,
            representative_item: None,
        },
    })
}
