use chrono::NaiveDate;
use lawpulse_analysis::{AggregationEngine, AnalysisError, GrowthBasis, RangeError};
use lawpulse_core::{
    BucketKey, Granularity, Metric, Query, QueryRange, Snapshot, load_snapshot_from_value,
};
use serde_json::json;

fn snapshot() -> Snapshot {
    load_snapshot_from_value(&json!({
        "privacy": {
            "news": {
                "daily_timeline": {
                    "2025-03-01": { "count": 3 },
                    "2025-03-02": { "중분류목록": {
                        "mid_data": { "count": 99, "소분류목록": {
                            "mid_data_leak": { "count": 3, "관련법": "개인정보보호법" },
                            "mid_data_sale": { "count": 4, "관련법": "개인정보보호법" }
                        } },
                        "mid_cctv": { "소분류목록": {
                            "camera": { "count": 8, "대표뉴스": "camera headline" }
                        } }
                    } }
                },
                "weekly_timeline": {
                    "2025-W01": { "count": 5 },
                    "2024-W52": { "count": 7 },
                    "2024-W09": { "count": 2 }
                }
            },
            "addsocial": {
                "daily_timeline": {
                    "2025-03-02": { "중분류목록": { "mid_data": { "소분류목록": {
                        "mid_data_leak": {
                            "찬성": {
                                "개정강화": { "count": 30 },
                                "폐지약화": { "count": 20 },
                                "모름": { "count": 2 }
                            },
                            "반대": { "count": 50 }
                        }
                    } } } }
                }
            }
        },
        "child": {
            "news": {
                "daily_timeline": {
                    "2025-03-01": { "count": 2 },
                    "2025-03-02": { "count": 2 },
                    "2025-03-03": { "count": 2 },
                    "2025-03-04": { "count": 3 },
                    "2025-03-05": { "count": 3 },
                    "2025-03-06": { "count": 6 }
                }
            }
        }
    }))
    .expect("snapshot")
}

fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("date")
}

fn daily(domains: &[&str]) -> Query {
    Query::new(Granularity::Daily).with_domains(domains.iter().copied())
}

#[test]
fn bottom_up_volume_sums_incidents() {
    let engine = AggregationEngine::default();
    let query = daily(&["privacy"]).with_range(QueryRange::dates(
        Some(date("2025-03-02")),
        Some(date("2025-03-02")),
    ));

    let volume = engine.volume(&snapshot(), &query).expect("volume");

    assert_eq!(volume.total, 15);
    assert_eq!(volume.by_theme[0].label, "mid_data");
    assert_eq!(volume.by_theme[0].total, 7);
    assert_eq!(volume.by_bucket.len(), 1);
}

#[test]
fn repeated_queries_return_identical_results() {
    let engine = AggregationEngine::default();
    let snapshot = snapshot();
    let query = daily(&["privacy", "child"]);

    let first = engine.volume(&snapshot, &query).expect("first");
    let second = engine.volume(&snapshot, &query).expect("second");
    assert_eq!(first, second);
    assert_eq!(
        engine.graph(&snapshot, &query).expect("graph"),
        engine.graph(&snapshot, &query).expect("graph again")
    );
}

#[test]
fn stance_split_counts_unknown_labels_separately() {
    let engine = AggregationEngine::default();
    let snapshot = snapshot();

    let stance = engine
        .stance(&snapshot, &daily(&["privacy"]))
        .expect("stance");
    assert_eq!(
        (stance.strengthen_pct, stance.weaken_pct, stance.oppose_pct),
        (30.0, 20.0, 50.0)
    );
    assert_eq!(stance.total, 100);
    assert_eq!(stance.unknown, 2);
    assert_eq!(snapshot.diagnostics.unknown_total, 1);
    assert!(snapshot.diagnostics.unknown_labels.contains_key("모름"));

    let empty = engine
        .stance(&snapshot, &daily(&["child"]))
        .expect("empty stance");
    assert_eq!(empty.total, 0);
    assert_eq!(
        (empty.strengthen_pct, empty.weaken_pct, empty.oppose_pct),
        (0.0, 0.0, 0.0)
    );
}

#[test]
fn growth_is_suppressed_below_the_baseline() {
    let engine = AggregationEngine::default();

    let growth = engine
        .growth(&snapshot(), &daily(&["privacy"]))
        .expect("growth");

    assert_eq!(growth.previous_total, 3);
    assert_eq!(growth.current_total, 15);
    assert!(growth.suppressed);
    assert_eq!(growth.rate_pct, 0.0);
}

#[test]
fn daily_growth_compares_preceding_calendar_days() {
    let engine = AggregationEngine::default();
    let query = daily(&["child"]).with_range(QueryRange::dates(
        Some(date("2025-03-04")),
        Some(date("2025-03-06")),
    ));

    let growth = engine.growth(&snapshot(), &query).expect("growth");

    assert_eq!(growth.basis, GrowthBasis::CalendarDays);
    assert_eq!((growth.current_total, growth.previous_total), (12, 6));
    assert_eq!(growth.rate_pct, 100.0);
}

#[test]
fn empty_selection_yields_zero_shapes() {
    let engine = AggregationEngine::default();
    let snapshot = snapshot();
    let query = daily(&["finance"]);

    let volume = engine.volume(&snapshot, &query).expect("volume");
    assert_eq!(volume.total, 0);
    assert_eq!(volume.missing_domains, vec!["finance"]);

    assert!(engine.peak(&snapshot, &query).expect("peak").is_empty());
    assert!(engine.graph(&snapshot, &query).expect("graph").is_empty());
    assert!(engine.series(&snapshot, &query).expect("series").is_empty());
    let growth = engine.growth(&snapshot, &query).expect("growth");
    assert_eq!(growth.rate_pct, 0.0);

    let cards = engine.kpis(&snapshot, &query).expect("kpis");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].value, 0);
}

#[test]
fn mismatched_range_granularity_is_refused() {
    let engine = AggregationEngine::default();
    let query = Query::new(Granularity::Weekly)
        .with_domains(["privacy"])
        .with_range(QueryRange::keys(
            Some(BucketKey::parse(Granularity::Daily, "2025-03-01")),
            None,
        ));

    let error = engine.volume(&snapshot(), &query).expect_err("mismatch");
    assert!(matches!(
        error,
        AnalysisError::Range(RangeError::GranularityMismatch { .. })
    ));
}

#[test]
fn weekly_keys_order_across_year_boundaries() {
    let engine = AggregationEngine::default();
    let query = Query::new(Granularity::Weekly).with_domains(["privacy"]);

    let series = engine.series(&snapshot(), &query).expect("series");

    let keys = series
        .points
        .iter()
        .map(|point| point.key.to_string())
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["2024-W09", "2024-W52", "2025-W01"]);
}

#[test]
fn converted_dates_select_the_containing_weeks() {
    let engine = AggregationEngine::default();
    let query = Query::new(Granularity::Weekly)
        .with_domains(["privacy"])
        .with_convert_dates(true)
        .with_range(QueryRange::dates(Some(date("2024-12-24")), None));

    let volume = engine.volume(&snapshot(), &query).expect("volume");
    assert_eq!(volume.total, 12);
}

#[test]
fn peak_points_at_the_heaviest_theme() {
    let engine = AggregationEngine::default();

    let peak = engine
        .peak(&snapshot(), &daily(&["privacy"]))
        .expect("peak");

    assert_eq!(
        peak.date.as_ref().map(ToString::to_string).as_deref(),
        Some("2025-03-02")
    );
    assert_eq!(peak.value, 15.0);
    let detail = peak.representative_detail.expect("detail");
    assert_eq!(detail.theme, "mid_cctv");
    assert_eq!(detail.incident.as_deref(), Some("camera"));
}

#[test]
fn social_metric_drives_graph_and_statutes() {
    let engine = AggregationEngine::default();
    let query = daily(&["privacy"]).with_metric(Metric::Social);

    let graph = engine.graph(&snapshot(), &query).expect("graph");
    // The social incident carries no statute, so the theme stands in.
    assert_eq!(
        graph.representative.as_deref(),
        Some("mid_data::mid_data::mid_data_leak")
    );

    let statutes = engine.statutes(&snapshot(), &query).expect("statutes");
    assert_eq!(statutes.len(), 1);
    assert_eq!(statutes[0].statute, "mid_data");
}
