mod channels;
mod context;
mod engine;
mod graph;
mod growth;
mod heatmap;
mod incidents;
mod kpi;
mod peak;
mod range;
mod ranking;
mod series;
mod stance;
mod statutes;
mod volume;

use thiserror::Error;

pub use channels::{ChannelMix, KNOWN_CHANNELS, channel_mix};
pub use context::QueryContext;
pub use engine::AggregationEngine;
pub use graph::{
    GraphEdge, GraphLimits, GraphNode, NodeKind, RelationGraph, StanceSample,
    build_relation_graph,
};
pub use growth::{GrowthBasis, GrowthPolicy, GrowthReport, compute_growth, growth_rate};
pub use heatmap::{HeatmapCell, HeatmapHighlight, StanceHeatmap, stance_heatmap};
pub use incidents::{TopIncident, incident_trend, top_incidents};
pub use kpi::{KpiCard, KpiInsights, KpiReport, build_kpis, kpi_insights, momentum, polarity, volatility_pct};
pub use peak::{PeakRecord, RepresentativeDetail, find_peak, representative_detail};
pub use range::{
    BucketRange, KeyRange, RangeError, filter_keys, parse_query_range, resolve_range,
    select_buckets,
};
pub use ranking::{RankPolicy, RankedGroup, rank_top_n};
pub use series::{NamedSeries, SeriesPoint, TimeSeries, build_time_series, channel_series};
pub use stance::{
    DomainStance, StanceByDomain, StanceDelta, StancePeak, StancePoint, StanceSummary,
    StanceTimeline, aggregate_stance, round1, stance_by_domain, stance_timeline,
};
pub use statutes::{
    StanceRankEntry, StanceRanking, StatuteRank, rank_domains_by_stance, rank_statutes,
};
pub use volume::{BucketTotal, LabelTotal, VolumeSummary, aggregate_volume, bucket_totals};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("range error: {0}")]
    Range(#[from] RangeError),
    #[error("snapshot error: {0}")]
    Core(#[from] lawpulse_core::CoreError),
    #[error("config error: {0}")]
    Config(#[from] lawpulse_config::ConfigError),
}
