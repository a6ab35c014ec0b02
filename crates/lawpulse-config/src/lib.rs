use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LAWPULSE_DIR_NAME: &str = ".lawpulse";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_MIN_BASELINE: u64 = 5;
pub const DEFAULT_CLAMP_PCT: f64 = 500.0;
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_SPARKLINE_POINTS: usize = 7;
pub const DEFAULT_MAX_LAWS: usize = 5;
pub const DEFAULT_MAX_INCIDENTS_PER_LAW: usize = 10;
pub const DEFAULT_SAMPLES_PER_STANCE: usize = 2;
pub const DEFAULT_STANCE_TIMELINE_WINDOW: usize = 4;
pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_FETCH_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeekNumbering {
    #[default]
    Sunday,
    Iso,
}

impl WeekNumbering {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Iso => "iso",
        }
    }
}

impl std::str::FromStr for WeekNumbering {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "sunday" => Ok(Self::Sunday),
            "iso" => Ok(Self::Iso),
            other => Err(format!(
                "invalid week numbering '{other}', expected one of: sunday, iso"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LawPulseConfig {
    #[serde(default)]
    pub growth: GrowthConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub range: RangeConfig,
    #[serde(default)]
    pub stance: StanceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthConfig {
    #[serde(default = "default_min_baseline")]
    pub min_baseline: u64,
    #[serde(default = "default_clamp_pct")]
    pub clamp_pct: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            min_baseline: DEFAULT_MIN_BASELINE,
            clamp_pct: DEFAULT_CLAMP_PCT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub include_non_positive: bool,
    #[serde(default = "default_sparkline_points")]
    pub sparkline_points: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            include_non_positive: false,
            sparkline_points: DEFAULT_SPARKLINE_POINTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_max_laws")]
    pub max_laws: usize,
    #[serde(default = "default_max_incidents_per_law")]
    pub max_incidents_per_law: usize,
    #[serde(default = "default_samples_per_stance")]
    pub samples_per_stance: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_laws: DEFAULT_MAX_LAWS,
            max_incidents_per_law: DEFAULT_MAX_INCIDENTS_PER_LAW,
            samples_per_stance: DEFAULT_SAMPLES_PER_STANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RangeConfig {
    #[serde(default)]
    pub week_numbering: WeekNumbering,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanceConfig {
    #[serde(default = "default_stance_timeline_window")]
    pub timeline_window: usize,
}

impl Default for StanceConfig {
    fn default() -> Self {
        Self {
            timeline_window: DEFAULT_STANCE_TIMELINE_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_fetch_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_FETCH_BACKOFF_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn lawpulse_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(LAWPULSE_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    lawpulse_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<LawPulseConfig, ConfigError> {
    load_workspace_config_with_warnings(workspace_root).map(|(config, _)| config)
}

/// Loads and normalizes the workspace config, returning the warnings found
/// in the file as written.
pub fn load_workspace_config_with_warnings(
    workspace_root: impl AsRef<Path>,
) -> Result<(LawPulseConfig, Vec<ConfigWarning>), ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok((LawPulseConfig::default(), Vec::new()));
    }

    let raw = fs::read_to_string(path)?;
    let parsed: LawPulseConfig = toml::from_str(&raw)?;
    let warnings = validate_config(&parsed);
    Ok((normalize_config(parsed), warnings))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<LawPulseConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(lawpulse_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = LawPulseConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &LawPulseConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if !config.growth.clamp_pct.is_finite() || config.growth.clamp_pct < 1.0 {
        warnings.push(ConfigWarning {
            code: "growth_clamp",
            message: format!(
                "[growth].clamp_pct={} is below 1; using {DEFAULT_CLAMP_PCT}",
                config.growth.clamp_pct
            ),
        });
    }
    if config.ranking.top_n == 0 {
        warnings.push(ConfigWarning {
            code: "ranking_top_n",
            message: format!("[ranking].top_n=0 would hide every group; using {DEFAULT_TOP_N}"),
        });
    }
    if config.ranking.sparkline_points == 0 {
        warnings.push(ConfigWarning {
            code: "ranking_sparkline",
            message: format!(
                "[ranking].sparkline_points=0 would draw empty sparklines; using {DEFAULT_SPARKLINE_POINTS}"
            ),
        });
    }
    if config.graph.max_laws == 0 || config.graph.max_incidents_per_law == 0 {
        warnings.push(ConfigWarning {
            code: "graph_limits",
            message: "[graph] limits must be at least 1; zero values fall back to defaults"
                .to_owned(),
        });
    }
    if config.stance.timeline_window == 0 {
        warnings.push(ConfigWarning {
            code: "stance_window",
            message: format!(
                "[stance].timeline_window=0; using {DEFAULT_STANCE_TIMELINE_WINDOW}"
            ),
        });
    }
    if config.fetch.max_attempts == 0 {
        warnings.push(ConfigWarning {
            code: "fetch_attempts",
            message: "[fetch].max_attempts=0 would never fetch; using 1".to_owned(),
        });
    }

    warnings
}

pub fn normalize_config(mut config: LawPulseConfig) -> LawPulseConfig {
    if !config.growth.clamp_pct.is_finite() || config.growth.clamp_pct < 1.0 {
        config.growth.clamp_pct = DEFAULT_CLAMP_PCT;
    }
    if config.ranking.top_n == 0 {
        config.ranking.top_n = DEFAULT_TOP_N;
    }
    if config.ranking.sparkline_points == 0 {
        config.ranking.sparkline_points = DEFAULT_SPARKLINE_POINTS;
    }
    if config.graph.max_laws == 0 {
        config.graph.max_laws = DEFAULT_MAX_LAWS;
    }
    if config.graph.max_incidents_per_law == 0 {
        config.graph.max_incidents_per_law = DEFAULT_MAX_INCIDENTS_PER_LAW;
    }
    if config.stance.timeline_window == 0 {
        config.stance.timeline_window = DEFAULT_STANCE_TIMELINE_WINDOW;
    }
    config.fetch.max_attempts = config.fetch.max_attempts.max(1);

    config
}

fn default_min_baseline() -> u64 {
    DEFAULT_MIN_BASELINE
}

fn default_clamp_pct() -> f64 {
    DEFAULT_CLAMP_PCT
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_sparkline_points() -> usize {
    DEFAULT_SPARKLINE_POINTS
}

fn default_max_laws() -> usize {
    DEFAULT_MAX_LAWS
}

fn default_max_incidents_per_law() -> usize {
    DEFAULT_MAX_INCIDENTS_PER_LAW
}

fn default_samples_per_stance() -> usize {
    DEFAULT_SAMPLES_PER_STANCE
}

fn default_stance_timeline_window() -> usize {
    DEFAULT_STANCE_TIMELINE_WINDOW
}

fn default_fetch_max_attempts() -> u32 {
    DEFAULT_FETCH_MAX_ATTEMPTS
}

fn default_fetch_backoff_ms() -> u64 {
    DEFAULT_FETCH_BACKOFF_MS
}
