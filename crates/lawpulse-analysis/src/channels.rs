use lawpulse_core::{Metric, Snapshot};
use serde::Serialize;

use crate::context::QueryContext;
use crate::range::RangeError;
use crate::volume::{LabelAccumulator, LabelTotal};

/// Channels every mix reports, even at zero.
pub const KNOWN_CHANNELS: [&str; 4] = ["blog", "twitter", "community", "insta"];
const UNKNOWN_CHANNEL: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChannelMix {
    pub channels: Vec<LabelTotal>,
    pub total: u64,
}

impl ChannelMix {
    pub fn count(&self, channel: &str) -> u64 {
        self.channels
            .iter()
            .find(|entry| entry.label == channel)
            .map(|entry| entry.total)
            .unwrap_or(0)
    }
}

/// Social samples per source channel over the selected buckets.
pub fn channel_mix(snapshot: &Snapshot, context: &QueryContext) -> Result<ChannelMix, RangeError> {
    let social = context.with_metric(Metric::Social);
    social.selected_keys(snapshot, Metric::Social)?;

    let mut accumulator = LabelAccumulator::default();
    for channel in KNOWN_CHANNELS {
        accumulator.add(channel, 0);
    }

    let mut total = 0;
    for domain in social.present_domains(snapshot) {
        for bucket in social.buckets(domain)? {
            for (_, incident) in bucket.incidents() {
                for sample in incident.stance.samples.iter_all() {
                    let channel = sample
                        .channel
                        .as_deref()
                        .map(|channel| channel.trim().to_lowercase())
                        .filter(|channel| !channel.is_empty())
                        .unwrap_or_else(|| UNKNOWN_CHANNEL.to_owned());
                    accumulator.add(&channel, 1);
                    total += 1;
                }
            }
        }
    }

    Ok(ChannelMix {
        channels: accumulator.into_totals(),
        total,
    })
}
