use std::path::Path;

use anyhow::{Context, Result, bail};
use lawpulse_analysis::AggregationEngine;
use lawpulse_config::load_workspace_config_with_warnings;
use lawpulsed::cli::{Cli, LogFormat, parse_cli};
use lawpulsed::commands::execute;
use lawpulsed::fetch::{FetchRequest, FileSnapshotSource, RetryPolicy, SnapshotLoader};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.log_format);
    run(cli)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Human => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(cli: Cli) -> Result<()> {
    let (config, warnings) = load_workspace_config_with_warnings(&cli.workspace)
        .with_context(|| {
            format!(
                "failed to load workspace config under {}",
                cli.workspace.display()
            )
        })?;
    for warning in warnings {
        tracing::warn!(code = %warning.code, "config warning: {}", warning.message);
    }

    let dir = cli
        .snapshot
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = cli
        .snapshot
        .file_name()
        .with_context(|| format!("snapshot path {} has no file name", cli.snapshot.display()))?
        .to_string_lossy()
        .into_owned();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let loader = SnapshotLoader::new(FileSnapshotSource::new(dir), RetryPolicy::from(&config.fetch));
    let outcome = runtime
        .block_on(loader.load(&FetchRequest::new(name)))
        .with_context(|| format!("failed to load snapshot {}", cli.snapshot.display()))?;
    let Some(snapshot) = outcome.into_current() else {
        bail!("snapshot load was superseded by a newer request");
    };

    if !snapshot.diagnostics.is_clean() {
        tracing::warn!(
            unknown_total = snapshot.diagnostics.unknown_total,
            labels = snapshot.diagnostics.unknown_labels.len(),
            "snapshot contains unrecognized stance labels"
        );
    }

    let engine = AggregationEngine::new(config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&engine, &snapshot, &cli.command, &mut out)
}
