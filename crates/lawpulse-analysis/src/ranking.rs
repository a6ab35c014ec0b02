use std::collections::HashMap;
use std::hash::Hash;

use lawpulse_config::RankingConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RankPolicy {
    pub include_non_positive: bool,
}

impl From<&RankingConfig> for RankPolicy {
    fn from(config: &RankingConfig) -> Self {
        Self {
            include_non_positive: config.include_non_positive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup<K> {
    pub label: K,
    pub total: f64,
    pub first_seen: usize,
}

/// Groups `records` by `key_fn`, sums `metric_fn` per group and returns the
/// `n` largest groups. Equal totals keep first-encountered order.
pub fn rank_top_n<R, K, FK, FM>(
    records: impl IntoIterator<Item = R>,
    mut key_fn: FK,
    mut metric_fn: FM,
    n: usize,
    policy: RankPolicy,
) -> Vec<RankedGroup<K>>
where
    K: Eq + Hash + Clone,
    FK: FnMut(&R) -> K,
    FM: FnMut(&R) -> f64,
{
    let mut groups: Vec<RankedGroup<K>> = Vec::new();
    let mut index = HashMap::<K, usize>::new();
    for record in records {
        let key = key_fn(&record);
        let value = metric_fn(&record);
        let value = if value.is_nan() { 0.0 } else { value };
        match index.get(&key) {
            Some(position) => groups[*position].total += value,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(RankedGroup {
                    label: key,
                    total: value,
                    first_seen: groups.len(),
                });
            }
        }
    }

    // Opposite infinities sum to NaN; such a group counts as empty.
    for group in &mut groups {
        if group.total.is_nan() || group.total == 0.0 {
            group.total = 0.0;
        }
    }
    groups.retain(|group| policy.include_non_positive || group.total > 0.0);
    groups.sort_by(|left, right| {
        right
            .total
            .total_cmp(&left.total)
            .then_with(|| left.first_seen.cmp(&right.first_seen))
    });
    groups.truncate(n);
    groups
}
