use std::collections::BTreeMap;

use lawpulse_config::GrowthConfig;
use lawpulse_core::{BucketKey, DayKey, Granularity};
use serde::Serialize;

use crate::range::{BucketRange, RangeError, filter_keys};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthPolicy {
    pub min_baseline: u64,
    pub clamp_pct: f64,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::from(&GrowthConfig::default())
    }
}

impl From<&GrowthConfig> for GrowthPolicy {
    fn from(config: &GrowthConfig) -> Self {
        Self {
            min_baseline: config.min_baseline,
            clamp_pct: config.clamp_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthBasis {
    /// Last bucket against the one before it.
    #[default]
    LastBucket,
    /// Selected calendar days against the same number of days before them.
    CalendarDays,
    /// Selected buckets against as many buckets immediately before them.
    PrecedingBuckets,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GrowthReport {
    pub current_total: u64,
    pub previous_total: u64,
    pub rate_pct: f64,
    pub suppressed: bool,
    pub basis: GrowthBasis,
}

/// Percent change from `previous` to `current`. A previous total under the
/// noise floor reports 0 and is flagged as suppressed.
pub fn growth_rate(current: u64, previous: u64, policy: &GrowthPolicy) -> GrowthReport {
    let suppressed = previous < policy.min_baseline || previous == 0;
    let rate_pct = if suppressed {
        0.0
    } else {
        let raw = (current as f64 - previous as f64) / previous as f64 * 100.0;
        let clamp = policy.clamp_pct.abs();
        raw.clamp(-clamp, clamp)
    };
    GrowthReport {
        current_total: current,
        previous_total: previous,
        rate_pct,
        suppressed,
        basis: GrowthBasis::LastBucket,
    }
}

/// Growth over per-bucket totals of a `granularity` timeline.
pub fn compute_growth(
    totals: &BTreeMap<BucketKey, u64>,
    granularity: Granularity,
    range: &BucketRange,
    policy: &GrowthPolicy,
) -> Result<GrowthReport, RangeError> {
    let keys = totals.keys().cloned().collect::<Vec<_>>();
    let selected = filter_keys(granularity, &keys, range)?;
    let ordered = keys
        .iter()
        .filter(|key| key.is_recognized())
        .collect::<Vec<_>>();
    let total_of = |key: &BucketKey| totals.get(key).copied().unwrap_or(0);

    if range.is_all() {
        let current = ordered.last().map(|key| total_of(key)).unwrap_or(0);
        let previous = ordered
            .len()
            .checked_sub(2)
            .map(|index| total_of(ordered[index]))
            .unwrap_or(0);
        return Ok(growth_rate(current, previous, policy));
    }

    if let Some((start, end)) = range.daily_bounds() {
        let mut report = calendar_growth(totals, start, end, policy);
        report.basis = GrowthBasis::CalendarDays;
        return Ok(report);
    }

    let selected = selected
        .into_iter()
        .filter(BucketKey::is_recognized)
        .collect::<Vec<_>>();
    let current = selected.iter().map(total_of).fold(0, u64::saturating_add);
    let previous = match selected.first() {
        Some(first) => {
            let position = ordered
                .iter()
                .position(|key| *key == first)
                .unwrap_or(0);
            ordered[position.saturating_sub(selected.len())..position]
                .iter()
                .map(|key| total_of(key))
                .fold(0, u64::saturating_add)
        }
        None => 0,
    };
    let mut report = growth_rate(current, previous, policy);
    report.basis = GrowthBasis::PrecedingBuckets;
    Ok(report)
}

fn calendar_growth(
    totals: &BTreeMap<BucketKey, u64>,
    start: DayKey,
    end: DayKey,
    policy: &GrowthPolicy,
) -> GrowthReport {
    if start > end {
        return growth_rate(0, 0, policy);
    }
    let days = start.days_until(end).unsigned_abs() + 1;
    let sum_between = |from: DayKey, to: DayKey| {
        totals
            .iter()
            .filter_map(|(key, total)| key.as_day().map(|day| (day, *total)))
            .filter(|(day, _)| *day >= from && *day <= to)
            .map(|(_, total)| total)
            .fold(0, u64::saturating_add)
    };

    let current = sum_between(start, end);
    let previous = match (start.minus_days(days), start.minus_days(1)) {
        (Some(from), Some(to)) => sum_between(from, to),
        _ => 0,
    };
    growth_rate(current, previous, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::KeyRange;

    fn daily_totals(values: &[(&str, u64)]) -> BTreeMap<BucketKey, u64> {
        values
            .iter()
            .map(|(raw, total)| (BucketKey::parse(Granularity::Daily, raw), *total))
            .collect()
    }

    fn day(text: &str) -> DayKey {
        DayKey::parse(text).expect("day key")
    }

    #[test]
    fn small_baseline_suppresses_growth() {
        let report = growth_rate(10, 3, &GrowthPolicy::default());
        assert_eq!(report.rate_pct, 0.0);
        assert!(report.suppressed);
    }

    #[test]
    fn growth_is_clamped() {
        let policy = GrowthPolicy::default();
        assert_eq!(growth_rate(1_000, 5, &policy).rate_pct, 500.0);
        assert_eq!(growth_rate(0, 10, &policy).rate_pct, -100.0);
        assert_eq!(growth_rate(15, 10, &policy).rate_pct, 50.0);
    }

    #[test]
    fn unbounded_range_compares_last_two_buckets() {
        let totals = daily_totals(&[("2025-03-01", 8), ("2025-03-02", 10), ("2025-03-03", 15)]);
        let report = compute_growth(
            &totals,
            Granularity::Daily,
            &BucketRange::All,
            &GrowthPolicy::default(),
        )
        .expect("growth");

        assert_eq!(report.current_total, 15);
        assert_eq!(report.previous_total, 10);
        assert_eq!(report.rate_pct, 50.0);
        assert_eq!(report.basis, GrowthBasis::LastBucket);
    }

    #[test]
    fn daily_bounds_compare_with_preceding_calendar_days() {
        let totals = daily_totals(&[
            ("2025-03-01", 4),
            ("2025-03-02", 6),
            ("2025-03-04", 20),
            ("2025-03-05", 10),
        ]);
        let range = BucketRange::Daily(KeyRange::between(day("2025-03-04"), day("2025-03-05")));

        let report = compute_growth(&totals, Granularity::Daily, &range, &GrowthPolicy::default())
            .expect("growth");

        // 2025-03-02 and the empty 2025-03-03 form the previous window.
        assert_eq!(report.current_total, 30);
        assert_eq!(report.previous_total, 6);
        assert_eq!(report.rate_pct, 400.0);
        assert_eq!(report.basis, GrowthBasis::CalendarDays);
    }

    #[test]
    fn weekly_bounds_compare_with_preceding_buckets() {
        let totals = [("2024-W52", 5), ("2025-W00", 5), ("2025-W01", 10), ("2025-W02", 20)]
            .iter()
            .map(|(raw, total)| (BucketKey::parse(Granularity::Weekly, raw), *total))
            .collect::<BTreeMap<_, _>>();
        let range = BucketRange::Weekly(KeyRange::new(
            Some(lawpulse_core::WeekKey::new(2025, 1).expect("week")),
            None,
        ));

        let report = compute_growth(&totals, Granularity::Weekly, &range, &GrowthPolicy::default())
            .expect("growth");

        assert_eq!(report.current_total, 30);
        assert_eq!(report.previous_total, 10);
        assert_eq!(report.rate_pct, 200.0);
        assert_eq!(report.basis, GrowthBasis::PrecedingBuckets);
    }

    #[test]
    fn previous_three_is_below_the_noise_floor() {
        let totals = daily_totals(&[("2025-03-01", 3), ("2025-03-02", 30)]);
        let report = compute_growth(
            &totals,
            Granularity::Daily,
            &BucketRange::All,
            &GrowthPolicy::default(),
        )
        .expect("growth");

        assert_eq!(report.rate_pct, 0.0);
        assert!(report.suppressed);
    }
}
