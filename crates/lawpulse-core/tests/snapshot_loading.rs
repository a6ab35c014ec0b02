use std::error::Error;
use std::fs;

use lawpulse_core::{
    BucketKey, CanonicalStance, Granularity, Metric, load_snapshot_from_path,
    load_snapshot_from_str, load_snapshot_from_value,
};
use serde_json::json;
use tempfile::tempdir;

fn producer_document() -> serde_json::Value {
    json!({
        "privacy": {
            "news": {
                "daily_timeline": {
                    "2025-03-02": {
                        "count": 100,
                        "중분류목록": {
                            "mid_data": {
                                "count": 50,
                                "소분류목록": {
                                    "mid_data_leak": {
                                        "count": 5,
                                        "관련법": "개인정보보호법",
                                        "대표뉴스": "leak headline",
                                        "articles": [{ "title": "a1", "url": "https://example.com/1" }]
                                    },
                                    "mid_data_breach": { "count": 10 }
                                }
                            }
                        }
                    },
                    "2025-03-01": { "중분류목록": {} , "count": 4 }
                },
                "weekly_timeline": {
                    "2025-W09": { "중분류목록": { "mid_data": { "count": 3 } } }
                }
            },
            "social": {
                "daily_timeline": { "2025-03-01": { "counts": { "찬성": 1, "반대": 1 } } }
            },
            "addsocial": {
                "daily_timeline": {
                    "2025-03-02": {
                        "중분류목록": {
                            "mid_data": {
                                "소분류목록": {
                                    "mid_data_leak": {
                                        "count": 6,
                                        "counts": { "찬성": 4, "반대": 2 },
                                        "찬성": {
                                            "개정강화": { "count": 3, "소셜목록": [{ "content": "s1", "channel": "blog" }] },
                                            "폐지완화": { "count": 1, "소셜목록": [] }
                                        },
                                        "반대": { "소셜목록": [{ "content": "o1", "channel": "twitter" }, { "content": "o2" }] }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
        "child": {
            "news": { "daily_timeline": { "2025-03-02": { "count": 2 } } }
        }
    })
}

#[test]
fn producer_document_loads_with_bottom_up_counts() {
    let snapshot = load_snapshot_from_value(&producer_document()).expect("load snapshot");

    assert_eq!(snapshot.domain_names(), vec!["privacy", "child"]);
    let privacy = snapshot.domain("privacy").expect("privacy domain");
    let daily = privacy.timeline(Metric::News, Granularity::Daily);

    let keys = daily.keys().iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(keys, vec!["2025-03-01", "2025-03-02"]);

    let march_second = BucketKey::parse(Granularity::Daily, "2025-03-02");
    assert_eq!(daily.total(&march_second), 15);
    assert_eq!(
        daily.total(&BucketKey::parse(Granularity::Daily, "2025-03-01")),
        4
    );

    let bucket = daily.get(&march_second).expect("bucket");
    let leak = &bucket.themes[0].incidents[0];
    assert_eq!(leak.statute_label.as_deref(), Some("개인정보보호법"));
    assert_eq!(
        leak.representative_item
            .as_ref()
            .and_then(|item| item.title.as_deref()),
        Some("leak headline")
    );
    assert_eq!(leak.article_count, 1);
}

#[test]
fn addsocial_channel_wins_over_plain_social() {
    let snapshot = load_snapshot_from_value(&producer_document()).expect("load snapshot");
    let privacy = snapshot.domain("privacy").expect("privacy domain");
    let social = privacy.timeline(Metric::Social, Granularity::Daily);

    assert_eq!(social.keys().len(), 1);
    let bucket = social
        .get(&BucketKey::parse(Granularity::Daily, "2025-03-02"))
        .expect("addsocial bucket");
    let (_, incident) = bucket.incidents().next().expect("incident");

    assert_eq!(incident.stance.count(CanonicalStance::Strengthen), 3);
    assert_eq!(incident.stance.count(CanonicalStance::Weaken), 1);
    assert_eq!(incident.stance.count(CanonicalStance::Oppose), 2);
    assert_eq!(incident.stance.samples.oppose.len(), 2);
    assert!(snapshot.diagnostics.is_clean());
}

#[test]
fn combined_all_layout_is_split_into_domains() {
    let document = json!({
        "all": {
            "news": {
                "weekly_timeline": {
                    "2025-W10": {
                        "대분류목록": {
                            "safety": { "중분류목록": { "mid_fire": { "count": 8 } } },
                            "finance": { "중분류목록": { "mid_loan": { "count": 2 } } }
                        }
                    }
                }
            }
        }
    });
    let snapshot = load_snapshot_from_value(&document).expect("load snapshot");

    assert_eq!(snapshot.domain_names(), vec!["safety", "finance"]);
    let safety = snapshot.domain("safety").expect("safety domain");
    let weekly = safety.timeline(Metric::News, Granularity::Weekly);
    assert_eq!(
        weekly.total(&BucketKey::parse(Granularity::Weekly, "2025-W10")),
        8
    );
}

#[test]
fn snapshot_file_round_trips_through_disk() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let path = temp.path().join("snapshot.json");
    fs::write(&path, serde_json::to_string(&producer_document())?)?;

    let from_disk = load_snapshot_from_path(&path)?;
    let from_value = load_snapshot_from_value(&producer_document())?;
    assert_eq!(from_disk, from_value);
    Ok(())
}

#[test]
fn invalid_json_is_reported() {
    assert!(load_snapshot_from_str("{ not json").is_err());
}
