use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStance {
    Strengthen,
    Weaken,
    Oppose,
    Unknown,
}

impl CanonicalStance {
    pub const CANONICAL: [CanonicalStance; 3] = [Self::Strengthen, Self::Weaken, Self::Oppose];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strengthen => "strengthen",
            Self::Weaken => "weaken",
            Self::Oppose => "oppose",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CanonicalStance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Producers have spelled the weaken stance both 폐지약화 and 폐지완화.
const STANCE_ALIASES: &[(&str, CanonicalStance)] = &[
    ("개정강화", CanonicalStance::Strengthen),
    ("강화", CanonicalStance::Strengthen),
    ("strengthen", CanonicalStance::Strengthen),
    ("favor_strengthen", CanonicalStance::Strengthen),
    ("폐지약화", CanonicalStance::Weaken),
    ("폐지완화", CanonicalStance::Weaken),
    ("약화", CanonicalStance::Weaken),
    ("완화", CanonicalStance::Weaken),
    ("weaken", CanonicalStance::Weaken),
    ("favor_weaken", CanonicalStance::Weaken),
    ("반대", CanonicalStance::Oppose),
    ("강한반대", CanonicalStance::Oppose),
    ("oppose", CanonicalStance::Oppose),
    ("against", CanonicalStance::Oppose),
];

pub fn normalize_stance(raw_label: &str) -> CanonicalStance {
    let label = raw_label.trim().replace(['-', ' '], "_");
    STANCE_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(label.as_str()))
        .map(|(_, stance)| *stance)
        .unwrap_or(CanonicalStance::Unknown)
}

/// Occurrences of stance labels that matched no alias, by raw label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelDiagnostics {
    pub unknown_total: u64,
    pub unknown_labels: BTreeMap<String, u64>,
}

impl LabelDiagnostics {
    pub fn record_unknown(&mut self, raw_label: &str) {
        self.unknown_total += 1;
        *self
            .unknown_labels
            .entry(raw_label.trim().to_owned())
            .or_insert(0) += 1;
    }

    pub fn is_clean(&self) -> bool {
        self.unknown_total == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SampleItem {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StanceSamples {
    pub strengthen: Vec<SampleItem>,
    pub weaken: Vec<SampleItem>,
    pub oppose: Vec<SampleItem>,
}

impl StanceSamples {
    pub fn for_stance(&self, stance: CanonicalStance) -> &[SampleItem] {
        match stance {
            CanonicalStance::Strengthen => &self.strengthen,
            CanonicalStance::Weaken => &self.weaken,
            CanonicalStance::Oppose => &self.oppose,
            CanonicalStance::Unknown => &[],
        }
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &SampleItem> {
        self.strengthen
            .iter()
            .chain(self.weaken.iter())
            .chain(self.oppose.iter())
    }

    fn push(&mut self, stance: CanonicalStance, items: Vec<SampleItem>) {
        match stance {
            CanonicalStance::Strengthen => self.strengthen.extend(items),
            CanonicalStance::Weaken => self.weaken.extend(items),
            CanonicalStance::Oppose => self.oppose.extend(items),
            CanonicalStance::Unknown => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StanceBreakdown {
    pub strengthen: u64,
    pub weaken: u64,
    pub oppose: u64,
    pub unknown: u64,
    #[serde(default)]
    pub samples: StanceSamples,
}

impl StanceBreakdown {
    pub fn count(&self, stance: CanonicalStance) -> u64 {
        match stance {
            CanonicalStance::Strengthen => self.strengthen,
            CanonicalStance::Weaken => self.weaken,
            CanonicalStance::Oppose => self.oppose,
            CanonicalStance::Unknown => self.unknown,
        }
    }

    pub fn add(&mut self, stance: CanonicalStance, count: u64, samples: Vec<SampleItem>) {
        match stance {
            CanonicalStance::Strengthen => self.strengthen = self.strengthen.saturating_add(count),
            CanonicalStance::Weaken => self.weaken = self.weaken.saturating_add(count),
            CanonicalStance::Oppose => self.oppose = self.oppose.saturating_add(count),
            CanonicalStance::Unknown => self.unknown = self.unknown.saturating_add(count),
        }
        self.samples.push(stance, samples);
    }

    /// Adds another breakdown's counts, leaving samples untouched.
    pub fn add_counts(&mut self, other: &StanceBreakdown) {
        self.strengthen = self.strengthen.saturating_add(other.strengthen);
        self.weaken = self.weaken.saturating_add(other.weaken);
        self.oppose = self.oppose.saturating_add(other.oppose);
        self.unknown = self.unknown.saturating_add(other.unknown);
    }

    /// Canonical total; `unknown` is reported separately and never counted.
    pub fn total(&self) -> u64 {
        self.support().saturating_add(self.oppose)
    }

    pub fn support(&self) -> u64 {
        self.strengthen.saturating_add(self.weaken)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0 && self.unknown == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_weaken_spellings_normalize_to_one_stance() {
        assert_eq!(normalize_stance("폐지약화"), CanonicalStance::Weaken);
        assert_eq!(normalize_stance("폐지완화"), CanonicalStance::Weaken);
        assert_eq!(normalize_stance(" 개정강화 "), CanonicalStance::Strengthen);
        assert_eq!(normalize_stance("반대"), CanonicalStance::Oppose);
    }

    #[test]
    fn english_aliases_ignore_case_and_separators() {
        assert_eq!(normalize_stance("Favor-Strengthen"), CanonicalStance::Strengthen);
        assert_eq!(normalize_stance("favor weaken"), CanonicalStance::Weaken);
        assert_eq!(normalize_stance("OPPOSE"), CanonicalStance::Oppose);
    }

    #[test]
    fn unknown_labels_are_not_dropped() {
        assert_eq!(normalize_stance("중립"), CanonicalStance::Unknown);
        assert_eq!(normalize_stance(""), CanonicalStance::Unknown);

        let mut diagnostics = LabelDiagnostics::default();
        diagnostics.record_unknown("중립");
        diagnostics.record_unknown("중립 ");
        diagnostics.record_unknown("neutral");

        assert_eq!(diagnostics.unknown_total, 3);
        assert_eq!(diagnostics.unknown_labels.get("중립"), Some(&2));
        assert!(!diagnostics.is_clean());
    }

    #[test]
    fn unknown_counts_stay_out_of_the_canonical_total() {
        let mut stance = StanceBreakdown::default();
        stance.add(CanonicalStance::Strengthen, 3, Vec::new());
        stance.add(CanonicalStance::Oppose, 2, Vec::new());
        stance.add(CanonicalStance::Unknown, 7, Vec::new());

        assert_eq!(stance.total(), 5);
        assert_eq!(stance.unknown, 7);
        assert_eq!(stance.support(), 3);
    }
}
