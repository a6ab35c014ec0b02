use std::collections::BTreeMap;

use lawpulse_core::{Metric, Snapshot};
use serde::Serialize;

use crate::context::QueryContext;
use crate::range::RangeError;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HeatmapCell {
    pub support: u64,
    pub oppose: u64,
    pub total: u64,
    pub ratio: f64,
}

impl HeatmapCell {
    fn finish(&mut self) {
        self.total = self.support.saturating_add(self.oppose);
        self.ratio = if self.total == 0 {
            0.0
        } else {
            self.support as f64 / self.total as f64
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapHighlight {
    pub domain: String,
    pub theme: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StanceHeatmap {
    pub domains: Vec<String>,
    pub themes: Vec<String>,
    /// Row per domain, column per theme.
    pub cells: Vec<Vec<HeatmapCell>>,
    pub highest_ratio: Option<HeatmapHighlight>,
    pub lowest_ratio: Option<HeatmapHighlight>,
    pub busiest: Option<HeatmapHighlight>,
}

/// Support share per domain and theme over the social channel.
pub fn stance_heatmap(
    snapshot: &Snapshot,
    context: &QueryContext,
) -> Result<StanceHeatmap, RangeError> {
    let social = context.with_metric(Metric::Social);
    social.selected_keys(snapshot, Metric::Social)?;

    let mut heatmap = StanceHeatmap {
        domains: social.domains.clone(),
        ..StanceHeatmap::default()
    };
    let mut rows = Vec::with_capacity(social.domains.len());
    for name in &social.domains {
        let mut row = BTreeMap::<usize, HeatmapCell>::new();
        if let Some(domain) = snapshot.domain(name) {
            for bucket in social.buckets(domain)? {
                for theme in &bucket.themes {
                    let known = heatmap.themes.iter().position(|existing| existing == &theme.name);
                    let column = match known {
                        Some(column) => column,
                        None => {
                            heatmap.themes.push(theme.name.clone());
                            heatmap.themes.len() - 1
                        }
                    };
                    let cell = row.entry(column).or_default();
                    for incident in &theme.incidents {
                        cell.support = cell.support.saturating_add(incident.stance.support());
                        cell.oppose = cell.oppose.saturating_add(incident.stance.oppose);
                    }
                }
            }
        }
        rows.push(row);
    }

    for row in rows {
        let mut cells = vec![HeatmapCell::default(); heatmap.themes.len()];
        for (column, mut cell) in row {
            cell.finish();
            cells[column] = cell;
        }
        heatmap.cells.push(cells);
    }

    let mut highest: Option<(usize, usize, f64)> = None;
    let mut lowest: Option<(usize, usize, f64)> = None;
    let mut busiest: Option<(usize, usize, f64)> = None;
    for (row, cells) in heatmap.cells.iter().enumerate() {
        for (column, cell) in cells.iter().enumerate() {
            if cell.total == 0 {
                continue;
            }
            if highest.is_none_or(|(_, _, ratio)| cell.ratio > ratio) {
                highest = Some((row, column, cell.ratio));
            }
            if lowest.is_none_or(|(_, _, ratio)| cell.ratio < ratio) {
                lowest = Some((row, column, cell.ratio));
            }
            if busiest.is_none_or(|(_, _, total)| cell.total as f64 > total) {
                busiest = Some((row, column, cell.total as f64));
            }
        }
    }
    let highlight = |found: Option<(usize, usize, f64)>| {
        found.map(|(row, column, value)| HeatmapHighlight {
            domain: heatmap.domains[row].clone(),
            theme: heatmap.themes[column].clone(),
            value,
        })
    };
    let highest_ratio = highlight(highest);
    let lowest_ratio = highlight(lowest);
    let busiest = highlight(busiest);

    heatmap.highest_ratio = highest_ratio;
    heatmap.lowest_ratio = lowest_ratio;
    heatmap.busiest = busiest;
    Ok(heatmap)
}
