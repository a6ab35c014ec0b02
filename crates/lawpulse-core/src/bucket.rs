use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use lawpulse_config::WeekNumbering;
use serde::{Serialize, Serializer};

use crate::Granularity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.len() != 10 {
            return None;
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(Self)
    }

    pub fn days_until(self, later: DayKey) -> i64 {
        later.0.signed_duration_since(self.0).num_days()
    }

    pub fn minus_days(self, days: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(days)).map(Self)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> Option<Self> {
        (week <= 53).then_some(Self { year, week })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn week(self) -> u32 {
        self.week
    }

    /// `Sunday` follows strftime `%U`: days before the first Sunday of the
    /// year fall in week 0.
    pub fn containing(date: NaiveDate, numbering: WeekNumbering) -> Self {
        match numbering {
            WeekNumbering::Sunday => {
                let weekday = date.weekday().num_days_from_sunday();
                Self {
                    year: date.year(),
                    week: (date.ordinal0() + 7 - weekday) / 7,
                }
            }
            WeekNumbering::Iso => {
                let iso = date.iso_week();
                Self {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (year, week) = text
            .split_once("-W")
            .or_else(|| text.split_once("-w"))?;
        if year.len() != 4 || week.is_empty() || week.len() > 2 {
            return None;
        }
        let year = year.parse::<i32>().ok()?;
        let week = week.parse::<u32>().ok()?;
        Self::new(year, week)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let (year, month) = text.trim().split_once('-')?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A time-bucket key tagged with its granularity. Recognized keys order
/// chronologically; keys that do not parse sort after them by raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    Day(DayKey),
    Week(WeekKey),
    Month(MonthKey),
    Unrecognized {
        granularity: Granularity,
        raw: String,
    },
}

impl BucketKey {
    pub fn parse(granularity: Granularity, raw: &str) -> Self {
        let parsed = match granularity {
            Granularity::Daily => DayKey::parse(raw).map(Self::Day),
            Granularity::Weekly => WeekKey::parse(raw).map(Self::Week),
            Granularity::Monthly => MonthKey::parse(raw).map(Self::Month),
        };
        parsed.unwrap_or_else(|| Self::Unrecognized {
            granularity,
            raw: raw.to_owned(),
        })
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Day(_) => Granularity::Daily,
            Self::Week(_) => Granularity::Weekly,
            Self::Month(_) => Granularity::Monthly,
            Self::Unrecognized { granularity, .. } => *granularity,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized { .. })
    }

    pub fn as_day(&self) -> Option<DayKey> {
        match self {
            Self::Day(key) => Some(*key),
            _ => None,
        }
    }

    pub fn as_week(&self) -> Option<WeekKey> {
        match self {
            Self::Week(key) => Some(*key),
            _ => None,
        }
    }

    pub fn as_month(&self) -> Option<MonthKey> {
        match self {
            Self::Month(key) => Some(*key),
            _ => None,
        }
    }

    fn class(&self) -> u8 {
        match self {
            Self::Day(_) => 0,
            Self::Week(_) => 1,
            Self::Month(_) => 2,
            Self::Unrecognized { .. } => 3,
        }
    }
}

impl From<DayKey> for BucketKey {
    fn from(value: DayKey) -> Self {
        Self::Day(value)
    }
}

impl From<WeekKey> for BucketKey {
    fn from(value: WeekKey) -> Self {
        Self::Week(value)
    }
}

impl From<MonthKey> for BucketKey {
    fn from(value: MonthKey) -> Self {
        Self::Month(value)
    }
}

impl Ord for BucketKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Day(left), Self::Day(right)) => left.cmp(right),
            (Self::Week(left), Self::Week(right)) => left.cmp(right),
            (Self::Month(left), Self::Month(right)) => left.cmp(right),
            (
                Self::Unrecognized {
                    granularity: left_granularity,
                    raw: left_raw,
                },
                Self::Unrecognized {
                    granularity: right_granularity,
                    raw: right_raw,
                },
            ) => left_granularity
                .cmp(right_granularity)
                .then_with(|| left_raw.cmp(right_raw)),
            _ => self.class().cmp(&other.class()),
        }
    }
}

impl PartialOrd for BucketKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(key) => fmt::Display::fmt(key, f),
            Self::Week(key) => fmt::Display::fmt(key, f),
            Self::Month(key) => fmt::Display::fmt(key, f),
            Self::Unrecognized { raw, .. } => f.write_str(raw),
        }
    }
}

macro_rules! serialize_as_display {
    ($($key:ty),+) => {
        $(
            impl Serialize for $key {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }
        )+
    };
}

serialize_as_display!(DayKey, WeekKey, MonthKey, BucketKey);
