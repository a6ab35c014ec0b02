use std::collections::BTreeMap;

use serde::Serialize;

use crate::stance::{LabelDiagnostics, StanceBreakdown};
use crate::{BucketKey, Granularity, Metric};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub domains: Vec<DomainData>,
    pub diagnostics: LabelDiagnostics,
}

impl Snapshot {
    pub fn domain(&self, name: &str) -> Option<&DomainData> {
        self.domains.iter().find(|domain| domain.name == name)
    }

    pub fn domain_names(&self) -> Vec<String> {
        self.domains.iter().map(|domain| domain.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainData {
    pub name: String,
    pub news: ChannelTimelines,
    pub social: ChannelTimelines,
}

impl DomainData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            news: ChannelTimelines::default(),
            social: ChannelTimelines::default(),
        }
    }

    pub fn channel(&self, metric: Metric) -> &ChannelTimelines {
        match metric {
            Metric::News => &self.news,
            Metric::Social => &self.social,
        }
    }

    pub fn channel_mut(&mut self, metric: Metric) -> &mut ChannelTimelines {
        match metric {
            Metric::News => &mut self.news,
            Metric::Social => &mut self.social,
        }
    }

    pub fn timeline(&self, metric: Metric, granularity: Granularity) -> &Timeline {
        self.channel(metric).get(granularity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelTimelines {
    pub daily: Timeline,
    pub weekly: Timeline,
    pub monthly: Timeline,
}

impl Default for ChannelTimelines {
    fn default() -> Self {
        Self {
            daily: Timeline::new(Granularity::Daily),
            weekly: Timeline::new(Granularity::Weekly),
            monthly: Timeline::new(Granularity::Monthly),
        }
    }
}

impl ChannelTimelines {
    pub fn get(&self, granularity: Granularity) -> &Timeline {
        match granularity {
            Granularity::Daily => &self.daily,
            Granularity::Weekly => &self.weekly,
            Granularity::Monthly => &self.monthly,
        }
    }

    pub fn get_mut(&mut self, granularity: Granularity) -> &mut Timeline {
        match granularity {
            Granularity::Daily => &mut self.daily,
            Granularity::Weekly => &mut self.weekly,
            Granularity::Monthly => &mut self.monthly,
        }
    }

    pub fn is_empty(&self) -> bool {
        Granularity::ALL
            .iter()
            .all(|granularity| self.get(*granularity).is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub granularity: Granularity,
    pub buckets: BTreeMap<BucketKey, Bucket>,
}

impl Timeline {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            buckets: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn keys(&self) -> Vec<BucketKey> {
        self.buckets.keys().cloned().collect()
    }

    pub fn get(&self, key: &BucketKey) -> Option<&Bucket> {
        self.buckets.get(key)
    }

    pub fn total(&self, key: &BucketKey) -> u64 {
        self.get(key).map(Bucket::total).unwrap_or(0)
    }

    /// Keys such as `2025-W1` and `2025-W01` parse to the same bucket; their
    /// contents are merged instead of overwritten.
    pub fn insert(&mut self, bucket: Bucket) {
        match self.buckets.get_mut(&bucket.key) {
            Some(existing) => existing.merge(bucket),
            None => {
                self.buckets.insert(bucket.key.clone(), bucket);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: BucketKey,
    pub count: Option<u64>,
    pub themes: Vec<Theme>,
}

impl Bucket {
    pub fn new(key: BucketKey) -> Self {
        Self {
            key,
            count: None,
            themes: Vec::new(),
        }
    }

    /// Sum of theme totals; the bucket's own count is used only when it has
    /// no themes.
    pub fn total(&self) -> u64 {
        if self.themes.is_empty() {
            return self.count.unwrap_or(0);
        }
        self.themes
            .iter()
            .map(Theme::total)
            .fold(0, u64::saturating_add)
    }

    pub fn incidents(&self) -> impl Iterator<Item = (&Theme, &Incident)> {
        self.themes
            .iter()
            .flat_map(|theme| theme.incidents.iter().map(move |incident| (theme, incident)))
    }

    fn merge(&mut self, other: Bucket) {
        self.count = add_optional(self.count, other.count);
        for theme in other.themes {
            match self.themes.iter_mut().find(|existing| existing.name == theme.name) {
                Some(existing) => {
                    existing.count = add_optional(existing.count, theme.count);
                    existing.incidents.extend(theme.incidents);
                }
                None => self.themes.push(theme),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub name: String,
    pub count: Option<u64>,
    pub incidents: Vec<Incident>,
}

impl Theme {
    pub fn total(&self) -> u64 {
        if self.incidents.is_empty() {
            return self.count.unwrap_or(0);
        }
        self.incidents
            .iter()
            .map(|incident| incident.count)
            .fold(0, u64::saturating_add)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Incident {
    pub name: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statute_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representative_item: Option<RepresentativeItem>,
    pub stance: StanceBreakdown,
    pub article_count: u64,
}

impl Incident {
    /// Statute the incident is filed under, falling back to its theme.
    pub fn law_label<'a>(&'a self, theme: &'a Theme) -> &'a str {
        self.statute_label
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(theme.name.as_str())
    }

    pub fn display_label(&self, theme: &Theme) -> String {
        let prefix = format!("{}_", theme.name);
        self.name
            .strip_prefix(prefix.as_str())
            .filter(|rest| !rest.is_empty())
            .unwrap_or(self.name.as_str())
            .to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RepresentativeItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl RepresentativeItem {
    pub fn headline(&self) -> Option<&str> {
        self.title.as_deref().or(self.content.as_deref())
    }
}

fn add_optional(left: Option<u64>, right: Option<u64>) -> Option<u64> {
    match (left, right) {
        (None, None) => None,
        (left, right) => Some(left.unwrap_or(0).saturating_add(right.unwrap_or(0))),
    }
}
