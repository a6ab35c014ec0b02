use std::collections::{BTreeMap, HashSet};

use lawpulse_core::{BucketKey, CanonicalStance, Incident, Metric, Snapshot, StanceBreakdown};
use serde::Serialize;

use crate::context::QueryContext;
use crate::range::RangeError;
use crate::ranking::{RankPolicy, rank_top_n};
use crate::stance::StanceSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StanceRankEntry {
    pub domain: String,
    pub count: u64,
    pub sparkline: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StanceRanking {
    pub stance: CanonicalStance,
    pub entries: Vec<StanceRankEntry>,
}

/// For each canonical stance, the domains with the most social mentions of
/// it, each with that stance's count over its last `sparkline_points`
/// buckets.
pub fn rank_domains_by_stance(
    snapshot: &Snapshot,
    context: &QueryContext,
    top_n: usize,
    sparkline_points: usize,
    policy: RankPolicy,
) -> Result<Vec<StanceRanking>, RangeError> {
    let social = context.with_metric(Metric::Social);
    social.selected_keys(snapshot, Metric::Social)?;

    let mut per_domain: Vec<(String, BTreeMap<BucketKey, StanceBreakdown>)> = Vec::new();
    for domain in social.present_domains(snapshot) {
        let mut by_bucket = BTreeMap::new();
        for bucket in social.buckets(domain)? {
            let breakdown: &mut StanceBreakdown = by_bucket.entry(bucket.key.clone()).or_default();
            for (_, incident) in bucket.incidents() {
                breakdown.add_counts(&incident.stance);
            }
        }
        per_domain.push((domain.name.clone(), by_bucket));
    }

    let mut rankings = Vec::with_capacity(CanonicalStance::CANONICAL.len());
    for stance in CanonicalStance::CANONICAL {
        let ranked = rank_top_n(
            per_domain.iter(),
            |(name, _)| name.clone(),
            |(_, by_bucket)| {
                by_bucket
                    .values()
                    .map(|breakdown| breakdown.count(stance))
                    .fold(0, u64::saturating_add) as f64
            },
            top_n,
            policy,
        );

        let entries = ranked
            .into_iter()
            .map(|group| {
                let sparkline = per_domain
                    .iter()
                    .find(|(name, _)| *name == group.label)
                    .map(|(_, by_bucket)| {
                        let counts = by_bucket
                            .values()
                            .map(|breakdown| breakdown.count(stance))
                            .collect::<Vec<_>>();
                        counts[counts.len().saturating_sub(sparkline_points)..].to_vec()
                    })
                    .unwrap_or_default();
                StanceRankEntry {
                    domain: group.label,
                    count: group.total as u64,
                    sparkline,
                }
            })
            .collect();
        rankings.push(StanceRanking { stance, entries });
    }
    Ok(rankings)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatuteRank {
    pub statute: String,
    pub social_total: u64,
    pub stance: StanceSummary,
    pub news_articles: u64,
    pub incident_count: usize,
}

/// Statutes ranked by social volume. News articles are matched by statute
/// label across the same domains and range.
pub fn rank_statutes(
    snapshot: &Snapshot,
    context: &QueryContext,
    top_n: usize,
    policy: RankPolicy,
) -> Result<Vec<StatuteRank>, RangeError> {
    context.selected_keys(snapshot, Metric::Social)?;

    let mut social_records: Vec<(&str, &str, &Incident)> = Vec::new();
    let mut news_articles = BTreeMap::<&str, u64>::new();
    for domain in context.present_domains(snapshot) {
        for bucket in context.buckets_for(domain, Metric::Social)? {
            for (theme, incident) in bucket.incidents() {
                social_records.push((incident.law_label(theme), theme.name.as_str(), incident));
            }
        }
        for bucket in context.buckets_for(domain, Metric::News)? {
            for (theme, incident) in bucket.incidents() {
                *news_articles.entry(incident.law_label(theme)).or_insert(0) +=
                    incident.article_count;
            }
        }
    }

    let ranked = rank_top_n(
        social_records.iter(),
        |(law, _, _)| *law,
        |(_, _, incident)| incident.count as f64,
        top_n,
        policy,
    );

    Ok(ranked
        .into_iter()
        .map(|group| {
            let members = social_records
                .iter()
                .filter(|(law, _, _)| *law == group.label)
                .collect::<Vec<_>>();
            let mut breakdown = StanceBreakdown::default();
            let mut distinct = HashSet::new();
            for (_, theme, incident) in &members {
                breakdown.add_counts(&incident.stance);
                distinct.insert((*theme, incident.name.as_str()));
            }
            StatuteRank {
                statute: group.label.to_owned(),
                social_total: group.total as u64,
                stance: StanceSummary::from_breakdown(&breakdown),
                news_articles: news_articles.get(group.label).copied().unwrap_or(0),
                incident_count: distinct.len(),
            }
        })
        .collect())
}
