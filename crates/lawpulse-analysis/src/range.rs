use chrono::NaiveDate;
use lawpulse_core::{
    Bucket, BucketKey, DayKey, Granularity, MonthKey, QueryRange, Timeline, WeekKey,
    WeekNumbering,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("a {range} range cannot filter a {timeline} timeline")]
    GranularityMismatch {
        timeline: Granularity,
        range: Granularity,
    },
    #[error(
        "calendar date bounds cannot filter a {granularity} timeline; enable date conversion or pass {granularity} keys"
    )]
    DateBoundsOnCoarseGranularity { granularity: Granularity },
    #[error("invalid {granularity} bucket key '{raw}'")]
    InvalidKey {
        granularity: Granularity,
        raw: String,
    },
}

/// Inclusive bounds over one kind of typed key. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyRange<K> {
    pub start: Option<K>,
    pub end: Option<K>,
}

impl<K: Ord + Copy> KeyRange<K> {
    pub fn new(start: Option<K>, end: Option<K>) -> Self {
        Self { start, end }
    }

    pub fn between(start: K, end: K) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.start.is_none_or(|start| *key >= start) && self.end.is_none_or(|end| *key <= end)
    }

    /// A start after the end selects nothing.
    pub fn is_degenerate(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "granularity", rename_all = "snake_case")]
pub enum BucketRange {
    #[default]
    All,
    Daily(KeyRange<DayKey>),
    Weekly(KeyRange<WeekKey>),
    Monthly(KeyRange<MonthKey>),
}

impl BucketRange {
    pub fn granularity(&self) -> Option<Granularity> {
        match self {
            Self::All => None,
            Self::Daily(_) => Some(Granularity::Daily),
            Self::Weekly(_) => Some(Granularity::Weekly),
            Self::Monthly(_) => Some(Granularity::Monthly),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::All => false,
            Self::Daily(range) => range.is_degenerate(),
            Self::Weekly(range) => range.is_degenerate(),
            Self::Monthly(range) => range.is_degenerate(),
        }
    }

    /// Unrecognized keys never fall inside a bounded range.
    pub fn contains(&self, key: &BucketKey) -> bool {
        match (self, key) {
            (Self::All, _) => true,
            (Self::Daily(range), BucketKey::Day(day)) => range.contains(day),
            (Self::Weekly(range), BucketKey::Week(week)) => range.contains(week),
            (Self::Monthly(range), BucketKey::Month(month)) => range.contains(month),
            _ => false,
        }
    }

    /// Both calendar bounds of a fully bounded daily range.
    pub fn daily_bounds(&self) -> Option<(DayKey, DayKey)> {
        match self {
            Self::Daily(KeyRange {
                start: Some(start),
                end: Some(end),
            }) => Some((*start, *end)),
            _ => None,
        }
    }

    fn check(&self, granularity: Granularity) -> Result<(), RangeError> {
        match self.granularity() {
            Some(range) if range != granularity => {
                tracing::warn!(
                    timeline = %granularity,
                    range = %range,
                    "refusing range of a different granularity"
                );
                Err(RangeError::GranularityMismatch {
                    timeline: granularity,
                    range,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Keys of a `granularity` timeline that fall inside `range`, in
/// chronological order.
pub fn filter_keys(
    granularity: Granularity,
    keys: &[BucketKey],
    range: &BucketRange,
) -> Result<Vec<BucketKey>, RangeError> {
    range.check(granularity)?;
    if range.is_degenerate() {
        return Ok(Vec::new());
    }
    let mut selected = keys
        .iter()
        .filter(|key| range.contains(key))
        .cloned()
        .collect::<Vec<_>>();
    selected.sort();
    Ok(selected)
}

pub fn select_buckets<'a>(
    timeline: &'a Timeline,
    range: &BucketRange,
) -> Result<Vec<&'a Bucket>, RangeError> {
    range.check(timeline.granularity)?;
    if range.is_degenerate() {
        return Ok(Vec::new());
    }
    Ok(timeline
        .buckets
        .iter()
        .filter(|(key, _)| range.contains(key))
        .map(|(_, bucket)| bucket)
        .collect())
}

/// Turns caller bounds into a typed range for a `granularity` timeline.
/// Calendar dates reach a weekly or monthly timeline only through
/// `convert_dates`, which maps each date to the bucket containing it.
pub fn resolve_range(
    range: &QueryRange,
    granularity: Granularity,
    convert_dates: bool,
    numbering: WeekNumbering,
) -> Result<BucketRange, RangeError> {
    match range {
        QueryRange::All => Ok(BucketRange::All),
        QueryRange::Dates { start, end } => {
            resolve_dates(*start, *end, granularity, convert_dates, numbering)
        }
        QueryRange::Keys { start, end } => resolve_keys(start.as_ref(), end.as_ref(), granularity),
    }
}

fn resolve_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    granularity: Granularity,
    convert_dates: bool,
    numbering: WeekNumbering,
) -> Result<BucketRange, RangeError> {
    match granularity {
        Granularity::Daily => Ok(BucketRange::Daily(KeyRange::new(
            start.map(DayKey::new),
            end.map(DayKey::new),
        ))),
        _ if !convert_dates => {
            tracing::warn!(granularity = %granularity, "refusing calendar dates on coarse timeline");
            Err(RangeError::DateBoundsOnCoarseGranularity { granularity })
        }
        Granularity::Weekly => Ok(BucketRange::Weekly(KeyRange::new(
            start.map(|date| WeekKey::containing(date, numbering)),
            end.map(|date| WeekKey::containing(date, numbering)),
        ))),
        Granularity::Monthly => Ok(BucketRange::Monthly(KeyRange::new(
            start.map(MonthKey::containing),
            end.map(MonthKey::containing),
        ))),
    }
}

fn resolve_keys(
    start: Option<&BucketKey>,
    end: Option<&BucketKey>,
    granularity: Granularity,
) -> Result<BucketRange, RangeError> {
    for key in [start, end].into_iter().flatten() {
        if !key.is_recognized() {
            return Err(RangeError::InvalidKey {
                granularity: key.granularity(),
                raw: key.to_string(),
            });
        }
        if key.granularity() != granularity {
            return Err(RangeError::GranularityMismatch {
                timeline: granularity,
                range: key.granularity(),
            });
        }
    }
    Ok(match granularity {
        Granularity::Daily => BucketRange::Daily(KeyRange::new(
            start.and_then(BucketKey::as_day),
            end.and_then(BucketKey::as_day),
        )),
        Granularity::Weekly => BucketRange::Weekly(KeyRange::new(
            start.and_then(BucketKey::as_week),
            end.and_then(BucketKey::as_week),
        )),
        Granularity::Monthly => BucketRange::Monthly(KeyRange::new(
            start.and_then(BucketKey::as_month),
            end.and_then(BucketKey::as_month),
        )),
    })
}

/// Parses textual bounds. When every given bound is a calendar date the
/// result is `QueryRange::Dates`; otherwise each bound must be a key of
/// `granularity`.
pub fn parse_query_range(
    granularity: Granularity,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<QueryRange, RangeError> {
    let start = start.map(str::trim).filter(|text| !text.is_empty());
    let end = end.map(str::trim).filter(|text| !text.is_empty());

    let as_date = |text: &str| DayKey::parse(text).map(DayKey::date);
    let all_dates = [start, end]
        .into_iter()
        .flatten()
        .all(|text| as_date(text).is_some());
    if all_dates {
        return Ok(QueryRange::dates(
            start.and_then(as_date),
            end.and_then(as_date),
        ));
    }

    let parse_key = |text: &str| {
        let key = BucketKey::parse(granularity, text);
        if key.is_recognized() {
            Ok(key)
        } else {
            Err(RangeError::InvalidKey {
                granularity,
                raw: text.to_owned(),
            })
        }
    };
    Ok(QueryRange::keys(
        start.map(parse_key).transpose()?,
        end.map(parse_key).transpose()?,
    ))
}
