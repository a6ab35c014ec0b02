use lawpulse_core::{BucketKey, CanonicalStance, Incident, Metric, Snapshot, StanceBreakdown};
use serde::Serialize;

use crate::context::QueryContext;
use crate::range::RangeError;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StanceSummary {
    pub strengthen: u64,
    pub weaken: u64,
    pub oppose: u64,
    pub unknown: u64,
    pub total: u64,
    pub strengthen_pct: f64,
    pub weaken_pct: f64,
    pub oppose_pct: f64,
}

impl StanceSummary {
    pub fn from_counts(strengthen: u64, weaken: u64, oppose: u64, unknown: u64) -> Self {
        let total = strengthen.saturating_add(weaken).saturating_add(oppose);
        Self {
            strengthen,
            weaken,
            oppose,
            unknown,
            total,
            strengthen_pct: percent(strengthen, total),
            weaken_pct: percent(weaken, total),
            oppose_pct: percent(oppose, total),
        }
    }

    pub fn from_breakdown(breakdown: &StanceBreakdown) -> Self {
        Self::from_counts(
            breakdown.strengthen,
            breakdown.weaken,
            breakdown.oppose,
            breakdown.unknown,
        )
    }

    pub fn count(&self, stance: CanonicalStance) -> u64 {
        match stance {
            CanonicalStance::Strengthen => self.strengthen,
            CanonicalStance::Weaken => self.weaken,
            CanonicalStance::Oppose => self.oppose,
            CanonicalStance::Unknown => self.unknown,
        }
    }

    pub fn pct(&self, stance: CanonicalStance) -> f64 {
        match stance {
            CanonicalStance::Strengthen => self.strengthen_pct,
            CanonicalStance::Weaken => self.weaken_pct,
            CanonicalStance::Oppose => self.oppose_pct,
            CanonicalStance::Unknown => 0.0,
        }
    }

    /// Canonical stance with the largest count; ties keep the earlier one.
    pub fn leading(&self) -> Option<CanonicalStance> {
        let mut leading: Option<CanonicalStance> = None;
        for stance in CanonicalStance::CANONICAL {
            let count = self.count(stance);
            if count > 0 && leading.is_none_or(|current| count > self.count(current)) {
                leading = Some(stance);
            }
        }
        leading
    }

    /// Percentage-point gap between the two largest shares.
    pub fn gap(&self) -> f64 {
        let mut shares = CanonicalStance::CANONICAL.map(|stance| self.pct(stance));
        shares.sort_by(|left, right| right.partial_cmp(left).unwrap_or(std::cmp::Ordering::Equal));
        round1(shares[0] - shares[1])
    }
}

/// Rounds half away from zero at one decimal place.
pub fn round1(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 10.0).round() / 10.0
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(count as f64 / total as f64 * 100.0)
}

pub fn aggregate_stance<'a, I>(incidents: I) -> StanceSummary
where
    I: IntoIterator<Item = &'a Incident>,
{
    let mut breakdown = StanceBreakdown::default();
    for incident in incidents {
        breakdown.add_counts(&incident.stance);
    }
    StanceSummary::from_breakdown(&breakdown)
}

pub(crate) fn stance_for_context(
    snapshot: &Snapshot,
    context: &QueryContext,
) -> Result<StanceSummary, RangeError> {
    let mut incidents = Vec::new();
    for domain in context.present_domains(snapshot) {
        for bucket in context.buckets(domain)? {
            incidents.extend(bucket.incidents().map(|(_, incident)| incident));
        }
    }
    Ok(aggregate_stance(incidents))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStance {
    pub domain: String,
    pub summary: StanceSummary,
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StanceByDomain {
    pub domains: Vec<DomainStance>,
    pub overall: StanceSummary,
    pub leading: Option<CanonicalStance>,
    pub most_skewed: Option<String>,
    pub most_balanced: Option<String>,
}

/// Stance split per domain over the social channel.
pub fn stance_by_domain(
    snapshot: &Snapshot,
    context: &QueryContext,
) -> Result<StanceByDomain, RangeError> {
    let social = context.with_metric(Metric::Social);
    social.selected_keys(snapshot, Metric::Social)?;

    let mut result = StanceByDomain::default();
    let mut overall = StanceBreakdown::default();
    for name in &social.domains {
        let summary = match snapshot.domain(name) {
            Some(domain) => {
                let mut incidents = Vec::new();
                for bucket in social.buckets(domain)? {
                    incidents.extend(bucket.incidents().map(|(_, incident)| incident));
                }
                aggregate_stance(incidents)
            }
            None => StanceSummary::default(),
        };
        overall.add_counts(&StanceBreakdown {
            strengthen: summary.strengthen,
            weaken: summary.weaken,
            oppose: summary.oppose,
            unknown: summary.unknown,
            ..StanceBreakdown::default()
        });
        result.domains.push(DomainStance {
            domain: name.clone(),
            gap: summary.gap(),
            summary,
        });
    }

    result.overall = StanceSummary::from_breakdown(&overall);
    result.leading = result.overall.leading();

    let mut skewed: Option<&DomainStance> = None;
    let mut balanced: Option<&DomainStance> = None;
    for entry in result.domains.iter().filter(|entry| entry.summary.total > 0) {
        if skewed.is_none_or(|current| entry.gap > current.gap) {
            skewed = Some(entry);
        }
        if balanced.is_none_or(|current| entry.gap < current.gap) {
            balanced = Some(entry);
        }
    }
    result.most_skewed = skewed.map(|entry| entry.domain.clone());
    result.most_balanced = balanced.map(|entry| entry.domain.clone());
    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StancePoint {
    pub key: BucketKey,
    pub summary: StanceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StancePeak {
    pub stance: CanonicalStance,
    pub key: Option<BucketKey>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StanceDelta {
    pub stance: CanonicalStance,
    pub delta_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StanceTimeline {
    pub points: Vec<StancePoint>,
    pub peaks: Vec<StancePeak>,
    pub deltas: Vec<StanceDelta>,
}

/// Stance split per bucket over the last `window` selected social buckets.
pub fn stance_timeline(
    snapshot: &Snapshot,
    context: &QueryContext,
    window: usize,
) -> Result<StanceTimeline, RangeError> {
    let social = context.with_metric(Metric::Social);
    let keys = social.selected_keys(snapshot, Metric::Social)?;
    let keys = &keys[keys.len().saturating_sub(window)..];

    let mut points = Vec::with_capacity(keys.len());
    for key in keys {
        let incidents = social
            .present_domains(snapshot)
            .filter_map(|domain| {
                domain
                    .timeline(Metric::Social, social.granularity)
                    .get(key)
            })
            .flat_map(|bucket| bucket.incidents().map(|(_, incident)| incident));
        points.push(StancePoint {
            key: key.clone(),
            summary: aggregate_stance(incidents),
        });
    }

    let peaks = CanonicalStance::CANONICAL
        .iter()
        .map(|stance| {
            let mut peak = StancePeak {
                stance: *stance,
                key: None,
                count: 0,
            };
            for point in &points {
                let count = point.summary.count(*stance);
                if count > peak.count {
                    peak.key = Some(point.key.clone());
                    peak.count = count;
                }
            }
            peak
        })
        .collect();

    let deltas = match (points.first(), points.last()) {
        (Some(first), Some(last)) => CanonicalStance::CANONICAL
            .iter()
            .map(|stance| StanceDelta {
                stance: *stance,
                delta_pct: round1(last.summary.pct(*stance) - first.summary.pct(*stance)),
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(StanceTimeline {
        points,
        peaks,
        deltas,
    })
}
