use std::io::Write;

use anyhow::{Context, Result};
use lawpulse_analysis::AggregationEngine;
use lawpulse_core::Snapshot;

use crate::cli::{Commands, QueryArgs, StanceView};
use crate::output::write_output;

/// Runs one command against a loaded snapshot and writes its result.
pub fn execute(
    engine: &AggregationEngine,
    snapshot: &Snapshot,
    command: &Commands,
    out: &mut dyn Write,
) -> Result<()> {
    let format = command.output();
    tracing::debug!(output = format.as_str(), "running command");
    match command {
        Commands::Kpis(args) => {
            let report = engine
                .kpi_report(snapshot, &query(args)?)
                .context("kpis failed")?;
            write_output(&report, format, out)
        }
        Commands::Volume(args) => {
            let result = engine
                .volume(snapshot, &query(args)?)
                .context("volume aggregation failed")?;
            write_output(&result, format, out)
        }
        Commands::Stance(args) => {
            let query = query(&args.query)?;
            tracing::debug!(view = args.view.as_str(), "stance view");
            match args.view {
                StanceView::Summary => {
                    let result = engine.stance(snapshot, &query).context("stance failed")?;
                    write_output(&result, format, out)
                }
                StanceView::Domains => {
                    let result = engine
                        .stance_by_domain(snapshot, &query)
                        .context("stance by domain failed")?;
                    write_output(&result, format, out)
                }
                StanceView::Timeline => {
                    let result = engine
                        .stance_timeline(snapshot, &query)
                        .context("stance timeline failed")?;
                    write_output(&result, format, out)
                }
                StanceView::Rankings => {
                    let result = engine
                        .stance_rankings(snapshot, &query)
                        .context("stance rankings failed")?;
                    write_output(&result, format, out)
                }
            }
        }
        Commands::Growth(args) => {
            let result = engine
                .growth(snapshot, &query(args)?)
                .context("growth failed")?;
            write_output(&result, format, out)
        }
        Commands::Rank(args) => {
            let result = engine
                .rank(snapshot, &query(args)?)
                .context("ranking failed")?;
            write_output(&result, format, out)
        }
        Commands::Series(args) => {
            let result = engine
                .series(snapshot, &query(args)?)
                .context("time series failed")?;
            write_output(&result, format, out)
        }
        Commands::Peak(args) => {
            let result = engine
                .peak(snapshot, &query(args)?)
                .context("peak lookup failed")?;
            write_output(&result, format, out)
        }
        Commands::Graph(args) => {
            let result = engine
                .graph(snapshot, &query(args)?)
                .context("relation graph failed")?;
            write_output(&result, format, out)
        }
        Commands::Heatmap(args) => {
            let result = engine
                .heatmap(snapshot, &query(args)?)
                .context("heatmap failed")?;
            write_output(&result, format, out)
        }
        Commands::Statutes(args) => {
            let result = engine
                .statutes(snapshot, &query(args)?)
                .context("statute ranking failed")?;
            write_output(&result, format, out)
        }
        Commands::Incidents(args) => {
            let result = engine
                .top_incidents(snapshot, &query(args)?)
                .context("incident ranking failed")?;
            write_output(&result, format, out)
        }
        Commands::IncidentTrend(args) => {
            let result = engine
                .incident_trend(snapshot, &query(&args.query)?, &args.incident)
                .with_context(|| format!("trend for incident '{}' failed", args.incident))?;
            write_output(&result, format, out)
        }
        Commands::Channels(args) => {
            let result = engine
                .channel_mix(snapshot, &query(args)?)
                .context("channel mix failed")?;
            write_output(&result, format, out)
        }
        Commands::Diagnostics(_) => write_output(&snapshot.diagnostics, format, out),
    }
}

fn query(args: &QueryArgs) -> Result<lawpulse_core::Query> {
    args.to_query().context("invalid range bounds")
}
