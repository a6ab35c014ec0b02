use std::path::Path;

use lawpulse_config::{LawPulseConfig, load_workspace_config};
use lawpulse_core::{Metric, Query, Snapshot};

use crate::AnalysisError;
use crate::channels::{ChannelMix, channel_mix};
use crate::context::QueryContext;
use crate::graph::{GraphLimits, RelationGraph, build_relation_graph};
use crate::growth::{GrowthPolicy, GrowthReport, compute_growth};
use crate::heatmap::{StanceHeatmap, stance_heatmap};
use crate::incidents::{TopIncident, incident_trend, top_incidents};
use crate::kpi::{KpiCard, KpiReport, build_kpis};
use crate::peak::{PeakRecord, find_peak};
use crate::ranking::{RankPolicy, RankedGroup, rank_top_n};
use crate::series::{TimeSeries, build_time_series, channel_series};
use crate::stance::{
    StanceByDomain, StanceSummary, StanceTimeline, stance_by_domain, stance_for_context,
    stance_timeline,
};
use crate::statutes::{StanceRanking, StatuteRank, rank_domains_by_stance, rank_statutes};
use crate::volume::{VolumeSummary, bucket_totals, volume_for_context};

/// Runs dashboard queries against a snapshot with workspace-configured
/// policies. Every query resolves its range first, so a mismatched range is
/// refused before any aggregation.
#[derive(Debug, Clone, Default)]
pub struct AggregationEngine {
    config: LawPulseConfig,
}

impl AggregationEngine {
    pub fn new(config: LawPulseConfig) -> Self {
        Self { config }
    }

    pub fn from_workspace(workspace: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let config = load_workspace_config(workspace)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &LawPulseConfig {
        &self.config
    }

    pub fn growth_policy(&self) -> GrowthPolicy {
        GrowthPolicy::from(&self.config.growth)
    }

    pub fn rank_policy(&self) -> RankPolicy {
        RankPolicy::from(&self.config.ranking)
    }

    pub fn context(&self, snapshot: &Snapshot, query: &Query) -> Result<QueryContext, AnalysisError> {
        let context = QueryContext::resolve(query, snapshot, self.config.range.week_numbering)?;
        tracing::debug!(
            domains = context.domains.len(),
            granularity = %context.granularity,
            metric = context.metric.as_str(),
            week_numbering = self.config.range.week_numbering.as_str(),
            "resolved query"
        );
        Ok(context)
    }

    pub fn volume(&self, snapshot: &Snapshot, query: &Query) -> Result<VolumeSummary, AnalysisError> {
        let context = self.context(snapshot, query)?;
        let summary = volume_for_context(snapshot, &context)?;
        tracing::debug!(
            total = summary.total,
            buckets = summary.by_bucket.len(),
            missing = summary.missing_domains.len(),
            "aggregated volume"
        );
        Ok(summary)
    }

    /// Stance split over the social channel.
    pub fn stance(&self, snapshot: &Snapshot, query: &Query) -> Result<StanceSummary, AnalysisError> {
        let context = self.context(snapshot, query)?.with_metric(Metric::Social);
        context.selected_keys(snapshot, Metric::Social)?;
        Ok(stance_for_context(snapshot, &context)?)
    }

    pub fn growth(&self, snapshot: &Snapshot, query: &Query) -> Result<GrowthReport, AnalysisError> {
        let context = self.context(snapshot, query)?;
        let totals = bucket_totals(
            snapshot,
            &context.domains,
            context.granularity,
            context.metric,
        );
        let report = compute_growth(
            &totals,
            context.granularity,
            &context.range,
            &self.growth_policy(),
        )?;
        tracing::debug!(
            current = report.current_total,
            previous = report.previous_total,
            rate_pct = report.rate_pct,
            suppressed = report.suppressed,
            "computed growth"
        );
        Ok(report)
    }

    /// Query domains ranked by volume over the selected range.
    pub fn rank(
        &self,
        snapshot: &Snapshot,
        query: &Query,
    ) -> Result<Vec<RankedGroup<String>>, AnalysisError> {
        let volume = self.volume(snapshot, query)?;
        Ok(rank_top_n(
            volume.by_domain,
            |entry| entry.label.clone(),
            |entry| entry.total as f64,
            self.config.ranking.top_n,
            self.rank_policy(),
        ))
    }

    /// News and social totals per bucket.
    pub fn series(&self, snapshot: &Snapshot, query: &Query) -> Result<TimeSeries, AnalysisError> {
        let context = self.context(snapshot, query)?;
        context.selected_keys(snapshot, context.metric)?;
        let series = channel_series(snapshot, &context)?;
        Ok(build_time_series(&series))
    }

    /// Peak of the query metric's series, with its representative detail.
    pub fn peak(&self, snapshot: &Snapshot, query: &Query) -> Result<PeakRecord, AnalysisError> {
        let context = self.context(snapshot, query)?;
        context.selected_keys(snapshot, context.metric)?;
        let series = build_time_series(&channel_series(snapshot, &context)?);
        Ok(find_peak(
            &series,
            &[context.metric.as_str()],
            snapshot,
            &context,
        ))
    }

    pub fn graph(&self, snapshot: &Snapshot, query: &Query) -> Result<RelationGraph, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(build_relation_graph(
            snapshot,
            &context,
            GraphLimits::from(&self.config.graph),
        )?)
    }

    pub fn kpis(&self, snapshot: &Snapshot, query: &Query) -> Result<Vec<KpiCard>, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(build_kpis(snapshot, &context, &self.growth_policy())?)
    }

    pub fn kpi_report(&self, snapshot: &Snapshot, query: &Query) -> Result<KpiReport, AnalysisError> {
        Ok(KpiReport::new(self.kpis(snapshot, query)?))
    }

    pub fn stance_by_domain(
        &self,
        snapshot: &Snapshot,
        query: &Query,
    ) -> Result<StanceByDomain, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(stance_by_domain(snapshot, &context)?)
    }

    pub fn stance_timeline(
        &self,
        snapshot: &Snapshot,
        query: &Query,
    ) -> Result<StanceTimeline, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(stance_timeline(
            snapshot,
            &context,
            self.config.stance.timeline_window,
        )?)
    }

    pub fn heatmap(&self, snapshot: &Snapshot, query: &Query) -> Result<StanceHeatmap, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(stance_heatmap(snapshot, &context)?)
    }

    pub fn stance_rankings(
        &self,
        snapshot: &Snapshot,
        query: &Query,
    ) -> Result<Vec<StanceRanking>, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(rank_domains_by_stance(
            snapshot,
            &context,
            self.config.ranking.top_n,
            self.config.ranking.sparkline_points,
            self.rank_policy(),
        )?)
    }

    pub fn statutes(
        &self,
        snapshot: &Snapshot,
        query: &Query,
    ) -> Result<Vec<StatuteRank>, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(rank_statutes(
            snapshot,
            &context,
            self.config.ranking.top_n,
            self.rank_policy(),
        )?)
    }

    pub fn top_incidents(
        &self,
        snapshot: &Snapshot,
        query: &Query,
    ) -> Result<Vec<TopIncident>, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(top_incidents(
            snapshot,
            &context,
            self.config.ranking.top_n,
            self.rank_policy(),
        )?)
    }

    pub fn incident_trend(
        &self,
        snapshot: &Snapshot,
        query: &Query,
        incident: &str,
    ) -> Result<TimeSeries, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(incident_trend(snapshot, &context, incident)?)
    }

    pub fn channel_mix(&self, snapshot: &Snapshot, query: &Query) -> Result<ChannelMix, AnalysisError> {
        let context = self.context(snapshot, query)?;
        Ok(channel_mix(snapshot, &context)?)
    }
}

#[cfg(test)]
mod tests {
    use lawpulse_core::{Granularity, QueryRange, load_snapshot_from_value};
    use serde_json::json;

    use super::*;

    fn snapshot() -> Snapshot {
        load_snapshot_from_value(&json!({
            "privacy": { "news": { "daily_timeline": {
                "2025-03-01": { "count": 3 },
                "2025-03-02": { "count": 9 }
            } } },
            "child": { "news": { "daily_timeline": {
                "2025-03-01": { "count": 12 }
            } } }
        }))
        .expect("snapshot")
    }

    #[test]
    fn rank_orders_domains_by_volume() {
        let engine = AggregationEngine::default();
        let query = Query::new(Granularity::Daily).with_domains(["privacy", "child"]);

        let ranked = engine.rank(&snapshot(), &query).expect("rank");

        let labels = ranked
            .iter()
            .map(|group| (group.label.as_str(), group.total))
            .collect::<Vec<_>>();
        assert_eq!(labels, vec![("privacy", 12.0), ("child", 12.0)]);
    }

    #[test]
    fn coarse_query_with_dates_is_refused() {
        let engine = AggregationEngine::default();
        let query = Query::new(Granularity::Weekly)
            .with_domains(["privacy"])
            .with_range(QueryRange::dates(
                chrono::NaiveDate::from_ymd_opt(2025, 3, 1),
                chrono::NaiveDate::from_ymd_opt(2025, 3, 7),
            ));

        let error = engine.volume(&snapshot(), &query).expect_err("refused");
        assert!(matches!(error, AnalysisError::Range(_)));
    }

    #[test]
    fn workspace_config_feeds_policies() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join(".lawpulse");
        std::fs::create_dir_all(&dir).expect("create config dir");
        std::fs::write(
            dir.join("config.toml"),
            "[growth]\nmin_baseline = 2\n\n[ranking]\ntop_n = 1\n",
        )
        .expect("write config");

        let engine = AggregationEngine::from_workspace(temp.path()).expect("engine");
        assert_eq!(engine.growth_policy().min_baseline, 2);

        let query = Query::new(Granularity::Daily).with_domains(["privacy", "child"]);
        assert_eq!(engine.rank(&snapshot(), &query).expect("rank").len(), 1);
    }
}
