use std::collections::BTreeMap;

use lawpulse_core::{BucketKey, Metric, Snapshot, StanceBreakdown};
use serde::Serialize;

use crate::context::QueryContext;
use crate::growth::{GrowthPolicy, GrowthReport, compute_growth};
use crate::range::RangeError;
use crate::ranking::{RankPolicy, rank_top_n};
use crate::volume::bucket_totals;

const MOMENTUM_WINDOW: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub name: String,
    pub value: u64,
    pub social_total: u64,
    pub growth: GrowthReport,
    pub trend: Vec<u64>,
    pub social_trend: Vec<u64>,
    pub amplification: f64,
    pub polarity: f64,
}

impl KpiCard {
    fn zero(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: 0,
            social_total: 0,
            growth: GrowthReport::default(),
            trend: Vec::new(),
            social_trend: Vec::new(),
            amplification: 0.0,
            polarity: 0.0,
        }
    }
}

/// One card per requested domain. Domains missing from the snapshot get a
/// zero card.
pub fn build_kpis(
    snapshot: &Snapshot,
    context: &QueryContext,
    policy: &GrowthPolicy,
) -> Result<Vec<KpiCard>, RangeError> {
    context.selected_keys(snapshot, Metric::News)?;

    let mut cards = Vec::with_capacity(context.domains.len());
    for name in &context.domains {
        let Some(domain) = snapshot.domain(name) else {
            cards.push(KpiCard::zero(name));
            continue;
        };

        let mut per_bucket = BTreeMap::<BucketKey, (u64, u64)>::new();
        for bucket in context.buckets_for(domain, Metric::News)? {
            let slot = per_bucket.entry(bucket.key.clone()).or_default();
            slot.0 = slot.0.saturating_add(bucket.total());
        }
        let mut stance = StanceBreakdown::default();
        for bucket in context.buckets_for(domain, Metric::Social)? {
            let slot = per_bucket.entry(bucket.key.clone()).or_default();
            slot.1 = slot.1.saturating_add(bucket.total());
            for (_, incident) in bucket.incidents() {
                stance.add_counts(&incident.stance);
            }
        }

        let trend = per_bucket.values().map(|(news, _)| *news).collect::<Vec<_>>();
        let social_trend = per_bucket
            .values()
            .map(|(_, social)| *social)
            .collect::<Vec<_>>();
        let value = trend.iter().copied().fold(0, u64::saturating_add);
        let social_total = social_trend.iter().copied().fold(0, u64::saturating_add);

        let news_totals = bucket_totals(
            snapshot,
            std::slice::from_ref(name),
            context.granularity,
            Metric::News,
        );
        let growth = compute_growth(&news_totals, context.granularity, &context.range, policy)?;

        cards.push(KpiCard {
            name: name.clone(),
            value,
            social_total,
            growth,
            trend,
            social_trend,
            amplification: social_total as f64 / value.max(1) as f64,
            polarity: polarity(&stance),
        });
    }
    Ok(cards)
}

/// `|support - oppose| / (support + oppose)`, where support covers both
/// strengthen and weaken.
pub fn polarity(stance: &StanceBreakdown) -> f64 {
    let support = stance.support();
    let total = support.saturating_add(stance.oppose);
    if total == 0 {
        return 0.0;
    }
    support.abs_diff(stance.oppose) as f64 / total as f64
}

/// Cards with the insights derived from them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct KpiReport {
    pub cards: Vec<KpiCard>,
    pub insights: KpiInsights,
}

impl KpiReport {
    pub fn new(cards: Vec<KpiCard>) -> Self {
        let insights = kpi_insights(&cards);
        Self { cards, insights }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct KpiInsights {
    pub top_volume: Option<String>,
    pub top_growth: Option<String>,
    pub top_amplification: Option<String>,
    pub top_polarity: Option<String>,
    pub volatility_pct: f64,
    pub momentum: f64,
}

pub fn kpi_insights(cards: &[KpiCard]) -> KpiInsights {
    let top = |metric: fn(&KpiCard) -> f64, include_non_positive: bool| {
        rank_top_n(
            cards.iter(),
            |card| card.name.clone(),
            |card| metric(card),
            1,
            RankPolicy {
                include_non_positive,
            },
        )
        .into_iter()
        .next()
        .map(|group| group.label)
    };

    let top_volume = top(|card| card.value as f64, false);
    let combined = top_volume
        .as_ref()
        .and_then(|name| cards.iter().find(|card| &card.name == name))
        .map(|card| {
            card.trend
                .iter()
                .zip(card.social_trend.iter())
                .map(|(news, social)| news.saturating_add(*social) as f64)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    KpiInsights {
        top_growth: top(|card| card.growth.rate_pct, true),
        top_amplification: top(|card| card.amplification, false),
        top_polarity: top(|card| card.polarity, false),
        volatility_pct: volatility_pct(&combined),
        momentum: momentum(&combined),
        top_volume,
    }
}

/// Population standard deviation relative to the mean, in percent.
pub fn volatility_pct(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / count;
    variance.sqrt() / mean.max(1.0) * 100.0
}

/// Mean of the last three points minus the mean of the three before them.
pub fn momentum(values: &[f64]) -> f64 {
    let recent_start = values.len().saturating_sub(MOMENTUM_WINDOW);
    let recent = &values[recent_start..];
    let earlier = &values[recent_start.saturating_sub(MOMENTUM_WINDOW)..recent_start];
    if recent.is_empty() || earlier.is_empty() {
        return 0.0;
    }
    mean(recent) - mean(earlier)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
