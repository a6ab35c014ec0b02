use std::ffi::OsStr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lawpulse_analysis::{RangeError, parse_query_range};
use lawpulse_core::{Granularity, Metric, Query};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Table => "table",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            other => Err(format!(
                "invalid output format '{other}', expected one of: json, table"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StanceView {
    #[default]
    Summary,
    Domains,
    Timeline,
    Rankings,
}

impl StanceView {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Domains => "domains",
            Self::Timeline => "timeline",
            Self::Rankings => "rankings",
        }
    }
}

impl std::str::FromStr for StanceView {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "summary" => Ok(Self::Summary),
            "domains" => Ok(Self::Domains),
            "timeline" => Ok(Self::Timeline),
            "rankings" => Ok(Self::Rankings),
            other => Err(format!(
                "invalid stance view '{other}', expected one of: summary, domains, timeline, rankings"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct QueryArgs {
    #[arg(
        long,
        value_delimiter = ',',
        value_name = "DOMAIN",
        help = "Domains to include, repeatable or comma-separated (default: every domain)"
    )]
    pub domain: Vec<String>,

    #[arg(
        long,
        default_value = "daily",
        value_parser = parse_granularity,
        help = "Timeline granularity: daily, weekly, or monthly"
    )]
    pub granularity: Granularity,

    #[arg(long, help = "Inclusive start: a date (YYYY-MM-DD) or a bucket key")]
    pub start: Option<String>,

    #[arg(long, help = "Inclusive end: a date (YYYY-MM-DD) or a bucket key")]
    pub end: Option<String>,

    #[arg(
        long,
        help = "Map calendar dates onto the weeks or months containing them"
    )]
    pub convert_dates: bool,

    #[arg(
        long,
        default_value = "news",
        value_parser = parse_metric,
        help = "Count channel: news or social"
    )]
    pub metric: Metric,

    #[arg(
        long,
        default_value = "json",
        value_parser = parse_output_format,
        help = "Output format: json or table"
    )]
    pub output: OutputFormat,
}

impl QueryArgs {
    pub fn to_query(&self) -> Result<Query, RangeError> {
        let range = parse_query_range(
            self.granularity,
            self.start.as_deref(),
            self.end.as_deref(),
        )?;
        Ok(Query::new(self.granularity)
            .with_domains(self.domain.iter().map(|domain| domain.trim()))
            .with_range(range)
            .with_metric(self.metric)
            .with_convert_dates(self.convert_dates))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct StanceArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[arg(
        long,
        default_value = "summary",
        value_parser = parse_stance_view,
        help = "Stance view: summary, domains, timeline, or rankings"
    )]
    pub view: StanceView,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct IncidentTrendArgs {
    #[arg(help = "Incident name, with or without its theme prefix")]
    pub incident: String,

    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct DiagnosticsArgs {
    #[arg(
        long,
        default_value = "json",
        value_parser = parse_output_format,
        help = "Output format: json or table"
    )]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Per-domain KPI cards with cross-domain insights
    Kpis(QueryArgs),
    /// Bottom-up volume totals by domain, theme, incident, and bucket
    Volume(QueryArgs),
    /// Stance split over social mentions
    Stance(StanceArgs),
    /// Growth rate of the selected range against the preceding period
    Growth(QueryArgs),
    /// Domains ranked by volume
    Rank(QueryArgs),
    /// News and social totals per bucket
    Series(QueryArgs),
    /// Busiest bucket with its representative theme and incident
    Peak(QueryArgs),
    /// Statute to incident relation graph
    Graph(QueryArgs),
    /// Support ratio per domain and theme
    Heatmap(QueryArgs),
    /// Statutes ranked by social volume
    Statutes(QueryArgs),
    /// Incidents ranked by news coverage
    Incidents(QueryArgs),
    /// News and social series for one incident
    IncidentTrend(IncidentTrendArgs),
    /// Social samples per source channel
    Channels(QueryArgs),
    /// Stance labels the loader did not recognize
    Diagnostics(DiagnosticsArgs),
}

impl Commands {
    pub fn output(&self) -> OutputFormat {
        match self {
            Self::Kpis(args)
            | Self::Volume(args)
            | Self::Growth(args)
            | Self::Rank(args)
            | Self::Series(args)
            | Self::Peak(args)
            | Self::Graph(args)
            | Self::Heatmap(args)
            | Self::Statutes(args)
            | Self::Incidents(args)
            | Self::Channels(args) => args.output,
            Self::Stance(args) => args.query.output,
            Self::IncidentTrend(args) => args.query.output,
            Self::Diagnostics(args) => args.output,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "LawPulse dashboard aggregation")]
pub struct Cli {
    #[arg(long, help = "Snapshot JSON file to query")]
    pub snapshot: PathBuf,

    #[arg(
        long,
        default_value = ".",
        help = "Workspace root holding .lawpulse/config.toml"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log format: human or json"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

pub fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}

fn parse_stance_view(value: &str) -> Result<StanceView, String> {
    value.parse()
}

fn parse_granularity(value: &str) -> Result<Granularity, String> {
    value.parse()
}

fn parse_metric(value: &str) -> Result<Metric, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use lawpulse_core::QueryRange;

    use super::*;

    #[test]
    fn query_flags_build_a_query() {
        let cli = Cli::try_parse_from([
            "lawpulsed",
            "--snapshot",
            "latest.json",
            "volume",
            "--domain",
            "privacy,child",
            "--domain",
            "safety",
            "--granularity",
            "weekly",
            "--start",
            "2025-W09",
            "--metric",
            "social",
            "--output",
            "table",
        ])
        .expect("volume flags should parse");

        let Commands::Volume(args) = &cli.command else {
            panic!("expected volume command");
        };
        assert_eq!(args.domain, vec!["privacy", "child", "safety"]);
        assert_eq!(cli.command.output(), OutputFormat::Table);

        let query = args.to_query().expect("query");
        assert_eq!(query.granularity, Granularity::Weekly);
        assert_eq!(query.metric, Metric::Social);
        assert!(matches!(query.range, QueryRange::Keys { .. }));
    }

    #[test]
    fn defaults_cover_daily_news_json() {
        let cli = Cli::try_parse_from(["lawpulsed", "--snapshot", "s.json", "kpis"])
            .expect("kpis should parse");

        assert_eq!(cli.log_format, LogFormat::Human);
        assert_eq!(cli.workspace, PathBuf::from("."));
        let Commands::Kpis(args) = &cli.command else {
            panic!("expected kpis command");
        };
        assert_eq!(args.granularity, Granularity::Daily);
        assert_eq!(args.metric, Metric::News);
        assert_eq!(args.output, OutputFormat::Json);
        assert!(args.to_query().expect("query").range.is_all());
    }

    #[test]
    fn incident_trend_takes_a_positional_incident() {
        let cli = Cli::try_parse_from([
            "lawpulsed",
            "--snapshot",
            "s.json",
            "--log-format",
            "json",
            "incident-trend",
            "leak",
            "--start",
            "2025-03-01",
            "--end",
            "2025-03-07",
        ])
        .expect("incident-trend should parse");

        assert_eq!(cli.log_format.as_str(), "json");
        let Commands::IncidentTrend(args) = &cli.command else {
            panic!("expected incident-trend command");
        };
        assert_eq!(args.incident, "leak");
        assert!(matches!(
            args.query.to_query().expect("query").range,
            QueryRange::Dates { .. }
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(
            Cli::try_parse_from([
                "lawpulsed",
                "--snapshot",
                "s.json",
                "volume",
                "--granularity",
                "hourly"
            ])
            .is_err()
        );
        assert!(
            Cli::try_parse_from([
                "lawpulsed",
                "--snapshot",
                "s.json",
                "stance",
                "--view",
                "pie"
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["lawpulsed", "volume"]).is_err());
    }
}
