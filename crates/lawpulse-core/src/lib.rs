use serde::{Deserialize, Serialize};
use thiserror::Error;

mod bucket;
mod loader;
mod model;
mod query;
mod stance;

pub use bucket::{BucketKey, DayKey, MonthKey, WeekKey};
pub use lawpulse_config::WeekNumbering;
pub use loader::{load_snapshot_from_path, load_snapshot_from_str, load_snapshot_from_value};
pub use model::{
    Bucket, ChannelTimelines, DomainData, Incident, RepresentativeItem, Snapshot, Theme, Timeline,
};
pub use query::{Query, QueryRange};
pub use stance::{
    CanonicalStance, LabelDiagnostics, SampleItem, StanceBreakdown, StanceSamples,
    normalize_stance,
};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn timeline_field(self) -> &'static str {
        match self {
            Self::Daily => "daily_timeline",
            Self::Weekly => "weekly_timeline",
            Self::Monthly => "monthly_timeline",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "daily" | "daily_timeline" => Ok(Self::Daily),
            "weekly" | "weekly_timeline" => Ok(Self::Weekly),
            "monthly" | "monthly_timeline" => Ok(Self::Monthly),
            other => Err(format!(
                "invalid granularity '{other}', expected one of: daily, weekly, monthly"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    News,
    Social,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Social => "social",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "news" => Ok(Self::News),
            "social" => Ok(Self::Social),
            other => Err(format!(
                "invalid metric '{other}', expected one of: news, social"
            )),
        }
    }
}
