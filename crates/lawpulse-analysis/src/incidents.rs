use lawpulse_core::{Metric, RepresentativeItem, Snapshot, StanceBreakdown};
use serde::Serialize;

use crate::context::QueryContext;
use crate::range::RangeError;
use crate::ranking::{RankPolicy, rank_top_n};
use crate::series::{NamedSeries, TimeSeries, build_time_series};
use crate::stance::StanceSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopIncident {
    pub domain: String,
    pub theme: String,
    pub incident: String,
    pub news_count: u64,
    pub representative_item: Option<RepresentativeItem>,
    pub social: StanceSummary,
}

/// Incidents with the most news coverage across the context domains, each
/// with its social stance over the same range.
pub fn top_incidents(
    snapshot: &Snapshot,
    context: &QueryContext,
    top_n: usize,
    policy: RankPolicy,
) -> Result<Vec<TopIncident>, RangeError> {
    context.selected_keys(snapshot, Metric::News)?;

    let mut records = Vec::new();
    for domain in context.present_domains(snapshot) {
        for bucket in context.buckets_for(domain, Metric::News)? {
            for (theme, incident) in bucket.incidents() {
                records.push((domain, theme, incident));
            }
        }
    }

    let ranked = rank_top_n(
        records.iter(),
        |&&(domain, _, incident)| (domain.name.as_str(), incident.name.as_str()),
        |&&(_, _, incident)| incident.count as f64,
        top_n,
        policy,
    );

    let mut top = Vec::with_capacity(ranked.len());
    for group in ranked {
        let (domain_name, incident_name) = group.label;
        let occurrences = records
            .iter()
            .filter(|(domain, _, incident)| {
                domain.name == domain_name && incident.name == incident_name
            })
            .collect::<Vec<_>>();
        let Some(&&(domain, theme, _)) = occurrences.first() else {
            continue;
        };
        let representative_item = occurrences
            .iter()
            .find_map(|(_, _, incident)| incident.representative_item.clone());

        let mut stance = StanceBreakdown::default();
        for bucket in context.buckets_for(domain, Metric::Social)? {
            for (_, incident) in bucket.incidents() {
                if incident.name == incident_name {
                    stance.add_counts(&incident.stance);
                }
            }
        }

        top.push(TopIncident {
            domain: domain_name.to_owned(),
            theme: theme.name.clone(),
            incident: incident_name.to_owned(),
            news_count: group.total as u64,
            representative_item,
            social: StanceSummary::from_breakdown(&stance),
        });
    }
    Ok(top)
}

/// News and social counts of one incident per bucket, across the context
/// domains. The incident matches by name or by its label without the theme
/// prefix.
pub fn incident_trend(
    snapshot: &Snapshot,
    context: &QueryContext,
    incident_name: &str,
) -> Result<TimeSeries, RangeError> {
    let wanted = incident_name.trim();
    let mut series = Vec::with_capacity(2);
    for metric in [Metric::News, Metric::Social] {
        let mut named = NamedSeries::new(metric.as_str());
        for domain in context.present_domains(snapshot) {
            for bucket in context.buckets_for(domain, metric)? {
                for (theme, incident) in bucket.incidents() {
                    if incident.name == wanted || incident.display_label(theme) == wanted {
                        named.add(bucket.key.clone(), incident.count as f64);
                    }
                }
            }
        }
        series.push(named);
    }
    context.selected_keys(snapshot, context.metric)?;
    Ok(build_time_series(&series))
}

#[cfg(test)]
mod tests {
    use lawpulse_core::{Granularity, load_snapshot_from_value};
    use serde_json::json;

    use super::*;
    use crate::range::BucketRange;

    fn snapshot() -> Snapshot {
        load_snapshot_from_value(&json!({
            "privacy": {
                "news": { "daily_timeline": {
                    "2025-03-01": { "중분류목록": { "mid_data": { "소분류목록": {
                        "mid_data_leak": { "count": 3, "articles": [{ "title": "first leak" }] },
                        "mid_data_sale": { "count": 2 }
                    } } } },
                    "2025-03-02": { "중분류목록": { "mid_data": { "소분류목록": {
                        "mid_data_leak": { "count": 4 },
                        "mid_data_sale": { "count": 6 }
                    } } } }
                } },
                "addsocial": { "daily_timeline": {
                    "2025-03-02": { "중분류목록": { "mid_data": { "소분류목록": {
                        "mid_data_leak": { "찬성": { "개정강화": { "count": 3 } }, "반대": { "count": 1 } }
                    } } } },
                    "2025-03-03": { "중분류목록": { "mid_data": { "소분류목록": {
                        "mid_data_leak": { "count": 5 }
                    } } } }
                } }
            }
        }))
        .expect("snapshot")
    }

    fn context() -> QueryContext {
        QueryContext::new(
            vec!["privacy".to_owned()],
            Granularity::Daily,
            Metric::News,
            BucketRange::All,
        )
    }

    #[test]
    fn top_incidents_sum_news_and_attach_social_stance() {
        let top = top_incidents(&snapshot(), &context(), 5, RankPolicy::default())
            .expect("top incidents");

        let names = top
            .iter()
            .map(|entry| (entry.incident.as_str(), entry.news_count))
            .collect::<Vec<_>>();
        assert_eq!(names, vec![("mid_data_sale", 8), ("mid_data_leak", 7)]);

        let leak = &top[1];
        assert_eq!(
            leak.representative_item
                .as_ref()
                .and_then(|item| item.title.as_deref()),
            Some("first leak")
        );
        assert_eq!(leak.social.strengthen_pct, 75.0);
        assert_eq!(top[0].social.total, 0);
    }

    #[test]
    fn incident_trend_matches_display_label() {
        let trend = incident_trend(&snapshot(), &context(), "leak").expect("trend");

        assert_eq!(trend.metrics, vec!["news", "social"]);
        let rows = trend
            .points
            .iter()
            .map(|point| (point.key.to_string(), point.value("news"), point.value("social")))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec![
                ("2025-03-01".to_owned(), 3.0, 0.0),
                ("2025-03-02".to_owned(), 4.0, 4.0),
                ("2025-03-03".to_owned(), 0.0, 5.0),
            ]
        );
    }
}
