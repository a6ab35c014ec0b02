use std::path::Path;

use serde_json::{Map, Value};

use crate::model::{Bucket, DomainData, Incident, RepresentativeItem, Snapshot, Theme};
use crate::stance::{CanonicalStance, LabelDiagnostics, SampleItem, StanceBreakdown};
use crate::{BucketKey, CoreError, Granularity, Metric, normalize_stance};

const COMBINED_ROOT_KEY: &str = "all";
const DOMAIN_LIST_KEYS: &[&str] = &["대분류목록", "domains"];
const THEME_LIST_KEYS: &[&str] = &["중분류목록", "themes"];
const INCIDENT_LIST_KEYS: &[&str] = &["소분류목록", "incidents"];
const STATUTE_KEYS: &[&str] = &["관련법", "statute", "statute_label"];
const REPRESENTATIVE_KEYS: &[&str] = &["대표뉴스", "representative", "representative_item"];
const SAMPLE_LIST_KEYS: &[&str] = &["소셜목록", "samples"];
const SUPPORT_KEY: &str = "찬성";
const OPPOSE_KEY: &str = "반대";
const STANCE_KEY: &str = "stance";

pub fn load_snapshot_from_path(path: &Path) -> Result<Snapshot, CoreError> {
    let raw = std::fs::read_to_string(path)?;
    load_snapshot_from_str(&raw)
}

pub fn load_snapshot_from_str(raw: &str) -> Result<Snapshot, CoreError> {
    let value = serde_json::from_str::<Value>(raw)?;
    load_snapshot_from_value(&value)
}

/// Builds a snapshot from a decoded document. Shape problems below the root
/// never fail the load: missing pieces become empty, malformed numbers become
/// zero, and unrecognized stance labels are recorded in the diagnostics.
pub fn load_snapshot_from_value(value: &Value) -> Result<Snapshot, CoreError> {
    let root = value.as_object().ok_or_else(|| {
        CoreError::InvalidSnapshot(format!(
            "expected a JSON object keyed by domain, found {}",
            json_kind(value)
        ))
    })?;

    let mut diagnostics = LabelDiagnostics::default();
    let mut domains = Vec::new();
    for (name, domain_value) in root {
        if name == COMBINED_ROOT_KEY {
            continue;
        }
        let Some(domain_object) = domain_value.as_object() else {
            tracing::debug!(domain = %name, "skipping non-object domain entry");
            continue;
        };
        domains.push(parse_domain(name, domain_object, &mut diagnostics));
    }

    if let Some(combined) = root.get(COMBINED_ROOT_KEY).and_then(Value::as_object) {
        split_combined_root(combined, &mut domains, &mut diagnostics);
    }

    for (label, occurrences) in &diagnostics.unknown_labels {
        tracing::warn!(label = %label, occurrences, "unrecognized stance label");
    }
    tracing::debug!(
        domains = domains.len(),
        unknown_labels = diagnostics.unknown_total,
        "loaded snapshot"
    );

    Ok(Snapshot {
        domains,
        diagnostics,
    })
}

fn parse_domain(
    name: &str,
    object: &Map<String, Value>,
    diagnostics: &mut LabelDiagnostics,
) -> DomainData {
    let mut domain = DomainData::new(name);
    for metric in [Metric::News, Metric::Social] {
        let Some(channel) = channel_object(object, metric) else {
            continue;
        };
        for (field, timeline_value) in channel {
            let Ok(granularity) = field.parse::<Granularity>() else {
                continue;
            };
            let Some(buckets) = timeline_value.as_object() else {
                continue;
            };
            let timeline = domain.channel_mut(metric).get_mut(granularity);
            for (raw_key, bucket_value) in buckets {
                timeline.insert(parse_bucket(granularity, raw_key, bucket_value, diagnostics));
            }
        }
    }
    domain
}

// `addsocial` carries the stance breakdown, `social` only the bucket totals.
fn channel_object(object: &Map<String, Value>, metric: Metric) -> Option<&Map<String, Value>> {
    match metric {
        Metric::News => object.get("news").and_then(Value::as_object),
        Metric::Social => object
            .get("addsocial")
            .and_then(Value::as_object)
            .or_else(|| object.get("social").and_then(Value::as_object)),
    }
}

/// The combined layout stores every domain inside each bucket under
/// `all.<channel>.<timeline>.<key>.대분류목록.<domain>`. Domains that already
/// have a top-level entry keep it.
fn split_combined_root(
    combined: &Map<String, Value>,
    domains: &mut Vec<DomainData>,
    diagnostics: &mut LabelDiagnostics,
) {
    let existing = domains
        .iter()
        .map(|domain| domain.name.clone())
        .collect::<Vec<_>>();

    for metric in [Metric::News, Metric::Social] {
        let Some(channel) = channel_object(combined, metric) else {
            continue;
        };
        for (field, timeline_value) in channel {
            let Ok(granularity) = field.parse::<Granularity>() else {
                continue;
            };
            let Some(buckets) = timeline_value.as_object() else {
                continue;
            };
            for (raw_key, bucket_value) in buckets {
                let Some(per_domain) = first_object(bucket_value, DOMAIN_LIST_KEYS) else {
                    continue;
                };
                for (name, domain_bucket) in per_domain {
                    if existing.iter().any(|known| known == name) {
                        continue;
                    }
                    let position = match domains.iter().position(|domain| &domain.name == name) {
                        Some(position) => position,
                        None => {
                            domains.push(DomainData::new(name.as_str()));
                            domains.len() - 1
                        }
                    };
                    let bucket = parse_bucket(granularity, raw_key, domain_bucket, diagnostics);
                    domains[position]
                        .channel_mut(metric)
                        .get_mut(granularity)
                        .insert(bucket);
                }
            }
        }
    }
}

fn parse_bucket(
    granularity: Granularity,
    raw_key: &str,
    value: &Value,
    diagnostics: &mut LabelDiagnostics,
) -> Bucket {
    let mut bucket = Bucket::new(BucketKey::parse(granularity, raw_key));
    let Some(object) = value.as_object() else {
        bucket.count = Some(coerce_count(value));
        return bucket;
    };

    bucket.count = object
        .get("count")
        .map(coerce_count)
        .or_else(|| support_oppose_sum(object));

    if let Some(themes) = first_present(object, THEME_LIST_KEYS) {
        for (name, theme_value) in named_entries(themes) {
            bucket
                .themes
                .push(parse_theme(name, theme_value, diagnostics));
        }
    }
    bucket
}

fn parse_theme(name: String, value: &Value, diagnostics: &mut LabelDiagnostics) -> Theme {
    let mut theme = Theme {
        name,
        count: None,
        incidents: Vec::new(),
    };
    let Some(object) = value.as_object() else {
        theme.count = Some(coerce_count(value));
        return theme;
    };

    theme.count = object.get("count").map(coerce_count);
    if let Some(incidents) = first_present(object, INCIDENT_LIST_KEYS) {
        for (name, incident_value) in named_entries(incidents) {
            theme
                .incidents
                .push(parse_incident(name, incident_value, diagnostics));
        }
    }
    theme
}

fn parse_incident(name: String, value: &Value, diagnostics: &mut LabelDiagnostics) -> Incident {
    let Some(object) = value.as_object() else {
        return Incident {
            name,
            count: coerce_count(value),
            ..Incident::default()
        };
    };

    let stance = parse_stance(object, diagnostics);
    let articles = object
        .get("articles")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let article_count = articles.len() as u64;

    let count = object
        .get("count")
        .filter(|count| is_numeric(count))
        .map(coerce_count)
        .or_else(|| support_oppose_sum(object))
        .or_else(|| (stance.total() > 0).then(|| stance.total()))
        .unwrap_or(article_count);

    let representative_item = first_present(object, REPRESENTATIVE_KEYS)
        .and_then(parse_representative)
        .or_else(|| articles.first().and_then(parse_representative))
        .or_else(|| {
            stance.samples.iter_all().next().map(|sample| RepresentativeItem {
                title: sample.title.clone(),
                url: sample.url.clone(),
                content: Some(sample.content.clone()),
            })
        });

    Incident {
        name,
        count,
        statute_label: first_present(object, STATUTE_KEYS).and_then(parse_statute),
        representative_item,
        stance,
        article_count,
    }
}

fn parse_stance(
    object: &Map<String, Value>,
    diagnostics: &mut LabelDiagnostics,
) -> StanceBreakdown {
    let mut breakdown = StanceBreakdown::default();

    let mut labelled = Vec::new();
    for key in [SUPPORT_KEY, STANCE_KEY] {
        if let Some(entries) = object.get(key).and_then(Value::as_object) {
            labelled.extend(entries.iter());
        }
    }
    for (label, entry) in labelled {
        let stance = normalize_stance(label);
        if stance == CanonicalStance::Unknown {
            diagnostics.record_unknown(label);
        }
        let (count, samples) = stance_entry(entry);
        breakdown.add(stance, count, samples);
    }

    let oppose = object.get(OPPOSE_KEY);
    let samples = oppose.map(stance_samples).unwrap_or_default();
    // Sample lists may be truncated, so their length is the last resort.
    let count = oppose
        .and_then(explicit_count)
        .or_else(|| {
            object
                .get("counts")
                .and_then(Value::as_object)
                .and_then(|counts| counts.get(OPPOSE_KEY))
                .filter(|count| is_numeric(count))
                .map(coerce_count)
        })
        .unwrap_or(samples.len() as u64);
    breakdown.add(CanonicalStance::Oppose, count, samples);
    breakdown
}

fn stance_entry(value: &Value) -> (u64, Vec<SampleItem>) {
    let samples = stance_samples(value);
    let count = explicit_count(value).unwrap_or(samples.len() as u64);
    (count, samples)
}

/// A bare number, or the numeric `count` field of a stance object.
fn explicit_count(value: &Value) -> Option<u64> {
    match value.as_object() {
        Some(object) => object
            .get("count")
            .filter(|count| is_numeric(count))
            .map(coerce_count),
        None => Some(coerce_count(value)),
    }
}

fn stance_samples(value: &Value) -> Vec<SampleItem> {
    value
        .as_object()
        .and_then(|object| first_present(object, SAMPLE_LIST_KEYS))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_sample).collect())
        .unwrap_or_default()
}

fn parse_sample(value: &Value) -> Option<SampleItem> {
    match value {
        Value::String(content) => Some(SampleItem {
            content: content.clone(),
            ..SampleItem::default()
        }),
        Value::Object(object) => Some(SampleItem {
            content: string_field(object, &["content", "text", "body"]).unwrap_or_default(),
            channel: string_field(object, &["channel", "source", "platform"]),
            title: string_field(object, &["title"]),
            url: string_field(object, &["url", "link"]),
        }),
        _ => None,
    }
}

fn parse_representative(value: &Value) -> Option<RepresentativeItem> {
    match value {
        Value::String(title) if !title.trim().is_empty() => Some(RepresentativeItem {
            title: Some(title.clone()),
            ..RepresentativeItem::default()
        }),
        Value::Object(object) => {
            let item = RepresentativeItem {
                title: string_field(object, &["title", "headline"]),
                url: string_field(object, &["url", "link"]),
                content: string_field(object, &["content", "summary", "description"]),
            };
            (item != RepresentativeItem::default()).then_some(item)
        }
        _ => None,
    }
}

fn parse_statute(value: &Value) -> Option<String> {
    match value {
        Value::String(label) => Some(label.trim().to_owned()).filter(|label| !label.is_empty()),
        Value::Array(labels) => labels.iter().find_map(parse_statute),
        _ => None,
    }
}

/// `counts.찬성 + counts.반대`, or the same pair stored directly on the object.
fn support_oppose_sum(object: &Map<String, Value>) -> Option<u64> {
    let counts = object
        .get("counts")
        .and_then(Value::as_object)
        .unwrap_or(object);
    let support = counts.get(SUPPORT_KEY).filter(|value| is_numeric(value));
    let oppose = counts.get(OPPOSE_KEY).filter(|value| is_numeric(value));
    if support.is_none() && oppose.is_none() {
        return None;
    }
    let support = support.map(coerce_count).unwrap_or(0);
    Some(support.saturating_add(oppose.map(coerce_count).unwrap_or(0)))
}

/// Accepts maps keyed by label (the producer's shape) and arrays of objects
/// carrying a `name` field.
fn named_entries(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(entries) => entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let name = item
                    .as_object()
                    .and_then(|object| string_field(object, &["name", "label", "title"]))
                    .unwrap_or_else(|| format!("#{index}"));
                (name, item)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

fn first_object<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    let object = value.as_object()?;
    first_present(object, keys).and_then(Value::as_object)
}

fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(text) => text.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

/// Negative, fractional-negative, non-finite or non-numeric values become 0.
pub(crate) fn coerce_count(value: &Value) -> u64 {
    let number = match value {
        Value::Number(number) => number
            .as_u64()
            .map(|count| count as f64)
            .or_else(|| number.as_f64()),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(number) if number.is_finite() && number > 0.0 => number as u64,
        _ => 0,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn coerce_count_clamps_bad_numbers_to_zero() {
        assert_eq!(coerce_count(&json!(12)), 12);
        assert_eq!(coerce_count(&json!(-4)), 0);
        assert_eq!(coerce_count(&json!("7")), 7);
        assert_eq!(coerce_count(&json!("many")), 0);
        assert_eq!(coerce_count(&json!(null)), 0);
        assert_eq!(coerce_count(&json!(2.9)), 2);
    }

    #[test]
    fn incident_count_falls_back_through_counts_stance_and_articles() {
        let mut diagnostics = LabelDiagnostics::default();

        let from_counts = parse_incident(
            "a".to_owned(),
            &json!({ "counts": { "찬성": 3, "반대": 4 } }),
            &mut diagnostics,
        );
        assert_eq!(from_counts.count, 7);

        let from_stance = parse_incident(
            "b".to_owned(),
            &json!({
                "찬성": { "개정강화": { "소셜목록": [{ "content": "x" }, { "content": "y" }] } },
                "반대": { "count": 1 }
            }),
            &mut diagnostics,
        );
        assert_eq!(from_stance.count, 3);

        let from_articles = parse_incident(
            "c".to_owned(),
            &json!({ "articles": [{ "title": "one" }, { "title": "two" }] }),
            &mut diagnostics,
        );
        assert_eq!(from_articles.count, 2);
        assert_eq!(from_articles.article_count, 2);
        assert_eq!(
            from_articles
                .representative_item
                .as_ref()
                .and_then(RepresentativeItem::headline),
            Some("one")
        );

        let empty = parse_incident("d".to_owned(), &json!({}), &mut diagnostics);
        assert_eq!(empty.count, 0);
    }

    #[test]
    fn oppose_falls_back_to_counts_when_entry_is_missing() {
        let mut diagnostics = LabelDiagnostics::default();
        let incident = parse_incident(
            "a".to_owned(),
            &json!({ "count": 9, "counts": { "찬성": 4, "반대": 5 } }),
            &mut diagnostics,
        );
        assert_eq!(incident.count, 9);
        assert_eq!(incident.stance.oppose, 5);
    }

    #[test]
    fn oppose_prefers_reported_counts_over_truncated_samples() {
        let mut diagnostics = LabelDiagnostics::default();
        let incident = parse_incident(
            "a".to_owned(),
            &json!({
                "counts": { "찬성": 3, "반대": 40 },
                "찬성": { "개정강화": { "count": 3 } },
                "반대": { "소셜목록": [{ "content": "a" }, { "content": "b" }] }
            }),
            &mut diagnostics,
        );
        assert_eq!(incident.stance.oppose, 40);
        assert_eq!(incident.stance.samples.oppose.len(), 2);
        assert_eq!(incident.count, 43);

        let explicit = parse_incident(
            "b".to_owned(),
            &json!({
                "counts": { "반대": 40 },
                "반대": { "count": 12, "소셜목록": [{ "content": "a" }] }
            }),
            &mut diagnostics,
        );
        assert_eq!(explicit.stance.oppose, 12);

        let samples_only = parse_incident(
            "c".to_owned(),
            &json!({ "반대": { "소셜목록": [{ "content": "a" }, { "content": "b" }] } }),
            &mut diagnostics,
        );
        assert_eq!(samples_only.stance.oppose, 2);
    }

    #[test]
    fn huge_counts_saturate_instead_of_overflowing() {
        let snapshot = load_snapshot_from_value(&json!({
            "privacy": { "news": { "daily_timeline": { "2025-03-01": { "중분류목록": {
                "mid_data": { "소분류목록": {
                    "leak": { "count": 1.0e19 },
                    "breach": { "count": 1.0e19 }
                } },
                "mid_cctv": { "count": 1.0e19 }
            } } } } }
        }))
        .expect("snapshot");

        let bucket = snapshot
            .domain("privacy")
            .and_then(|domain| {
                domain
                    .timeline(Metric::News, Granularity::Daily)
                    .buckets
                    .values()
                    .next()
            })
            .expect("bucket");
        assert_eq!(bucket.themes[0].total(), u64::MAX);
        assert_eq!(bucket.total(), u64::MAX);

        let stance = parse_incident(
            "a".to_owned(),
            &json!({ "counts": { "찬성": 1.0e19, "반대": 1.0e19 } }),
            &mut LabelDiagnostics::default(),
        );
        assert_eq!(stance.count, u64::MAX);
    }

    #[test]
    fn unknown_support_labels_are_recorded() {
        let mut diagnostics = LabelDiagnostics::default();
        let incident = parse_incident(
            "a".to_owned(),
            &json!({ "찬성": { "개정강화": { "count": 2 }, "중립": { "count": 5 } } }),
            &mut diagnostics,
        );
        assert_eq!(incident.stance.strengthen, 2);
        assert_eq!(incident.stance.unknown, 5);
        assert_eq!(incident.stance.total(), 2);
        assert_eq!(diagnostics.unknown_labels.get("중립"), Some(&1));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let error = load_snapshot_from_value(&json!([1, 2, 3])).expect_err("array root");
        assert!(matches!(error, CoreError::InvalidSnapshot(_)));
    }
}
