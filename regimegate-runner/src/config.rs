//! Serializable pipeline configuration.
//!
//! Loaded from TOML; every section and field has a default, so an empty file
//! (or no file at all) yields the reference configuration:
//!
//! ```toml
//! [market]
//! n_ticks = 3000
//! seed = 123
//!
//! [execution]
//! cost_bps = 0.8
//! slip_bps = 0.5
//! min_interval_ticks = 7
//! max_trades_per_100 = 12
//! confirm = 2
//!
//! [latency]
//! baseline = 5
//! agent = 2
//!
//! [validators]
//! ewma_alpha = 0.05
//! ewma_z = 2.6
//! vol_window = 60
//! vol_max = 0.009
//! persist_hold = 4
//! persist_mean_alpha = 0.05
//! persist_z = 0.28
//!
//! [positions]
//! default = 0.35
//!
//! [positions.regimes]
//! calm_trend = 0.8
//! volatile = 0.45
//! jumpy = 0.35
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regimegate_core::market::{CALM_TREND, JUMPY, VOLATILE};
use regimegate_core::simulator::SimParams;
use regimegate_core::validator::ValidatorKind;
use serde::{Deserialize, Serialize};

/// Unique identifier for a pipeline configuration (content-addressable hash).
pub type RunId = String;

/// First 12 characters of a run ID for display, or the whole ID if shorter.
pub fn short_run_id(run_id: &str) -> &str {
    run_id.get(..12).unwrap_or(run_id)
}

/// Errors raised while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Full configuration of one baseline-vs-adaptive pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub market: MarketConfig,
    pub execution: ExecutionConfig,
    pub latency: LatencyConfig,
    pub validators: ValidatorParams,
    pub positions: PositionConfig,
}

/// Synthetic market size and seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub n_ticks: usize,
    pub seed: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            n_ticks: 3000,
            seed: 123,
        }
    }
}

/// Trade-lifecycle constraints shared by baseline and adaptive runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub cost_bps: f64,
    pub slip_bps: f64,
    pub min_interval_ticks: usize,
    pub max_trades_per_100: usize,
    /// Consecutive triggers required by the confirmation wrapper.
    pub confirm: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            cost_bps: 0.8,
            slip_bps: 0.5,
            min_interval_ticks: 7,
            max_trades_per_100: 12,
            confirm: 2,
        }
    }
}

/// Entry latency in ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub baseline: usize,
    pub agent: usize,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            baseline: 5,
            agent: 2,
        }
    }
}

/// Parameters of the three validator kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorParams {
    pub ewma_alpha: f64,
    /// EWMA enter threshold; the exit threshold is derived from it.
    pub ewma_z: f64,
    pub vol_window: usize,
    pub vol_max: f64,
    pub persist_hold: usize,
    pub persist_mean_alpha: f64,
    pub persist_z: f64,
}

impl Default for ValidatorParams {
    fn default() -> Self {
        Self {
            ewma_alpha: 0.05,
            ewma_z: 2.6,
            vol_window: 60,
            vol_max: 0.009,
            persist_hold: 4,
            persist_mean_alpha: 0.05,
            persist_z: 0.28,
        }
    }
}

impl ValidatorParams {
    /// EWMA exit threshold: `max(ewma_z - 0.6, 1.2)`, never above `ewma_z`.
    pub fn ewma_exit(&self) -> f64 {
        (self.ewma_z - 0.6).max(1.2).min(self.ewma_z)
    }

    /// Factory parameter map for `kind`.
    pub fn params_for(&self, kind: ValidatorKind) -> BTreeMap<String, f64> {
        let pairs: Vec<(&str, f64)> = match kind {
            ValidatorKind::Ewma => vec![
                ("alpha", self.ewma_alpha),
                ("z_enter", self.ewma_z),
                ("z_exit", self.ewma_exit()),
            ],
            ValidatorKind::Volatility => vec![
                ("window", self.vol_window as f64),
                ("max_vol", self.vol_max),
            ],
            ValidatorKind::Persistence => vec![
                ("hold", self.persist_hold as f64),
                ("mean_alpha", self.persist_mean_alpha),
                ("z", self.persist_z),
            ],
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

/// Position size per regime label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Size used for any regime not listed in `regimes`.
    pub default: f64,
    pub regimes: BTreeMap<String, f64>,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            default: 0.35,
            regimes: [(CALM_TREND, 0.8), (VOLATILE, 0.45), (JUMPY, 0.35)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Serialize to TOML (used to echo the effective configuration).
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.execution;
        non_negative("execution.cost_bps", e.cost_bps)?;
        non_negative("execution.slip_bps", e.slip_bps)?;
        if e.confirm == 0 {
            return Err(invalid("execution.confirm", "must be >= 1"));
        }
        if e.max_trades_per_100 == 0 {
            return Err(invalid("execution.max_trades_per_100", "must be >= 1"));
        }

        let v = &self.validators;
        if !(v.ewma_alpha > 0.0 && v.ewma_alpha < 1.0) {
            return Err(invalid("validators.ewma_alpha", "must be in (0, 1)"));
        }
        if !(v.ewma_z.is_finite() && v.ewma_z > 0.0) {
            return Err(invalid("validators.ewma_z", "must be > 0"));
        }
        if v.vol_window == 0 {
            return Err(invalid("validators.vol_window", "must be >= 1"));
        }
        non_negative("validators.vol_max", v.vol_max)?;
        if v.persist_hold == 0 {
            return Err(invalid("validators.persist_hold", "must be >= 1"));
        }
        if !(v.persist_mean_alpha > 0.0 && v.persist_mean_alpha <= 1.0) {
            return Err(invalid("validators.persist_mean_alpha", "must be in (0, 1]"));
        }
        if !v.persist_z.is_finite() {
            return Err(invalid("validators.persist_z", "must be finite"));
        }

        non_negative("positions.default", self.positions.default)?;
        for (regime, &size) in &self.positions.regimes {
            if !(size.is_finite() && size >= 0.0) {
                return Err(ConfigError::Invalid {
                    field: "positions.regimes",
                    reason: format!("size for '{regime}' must be finite and >= 0, got {size}"),
                });
            }
        }
        Ok(())
    }

    /// Deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("PipelineConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Position size for a regime label.
    pub fn position_for(&self, regime: &str) -> f64 {
        self.positions
            .regimes
            .get(regime)
            .copied()
            .unwrap_or(self.positions.default)
    }

    /// Simulation parameters of the baseline run: baseline latency, unit size.
    pub fn baseline_sim_params(&self) -> SimParams {
        self.sim_params(self.latency.baseline, 1.0)
    }

    /// Simulation parameters of one adaptive segment.
    pub fn agent_sim_params(&self, regime: &str) -> SimParams {
        self.sim_params(self.latency.agent, self.position_for(regime))
    }

    fn sim_params(&self, latency_ticks: usize, position: f64) -> SimParams {
        SimParams {
            latency_ticks,
            cost_bps: self.execution.cost_bps,
            slip_bps: self.execution.slip_bps,
            position,
            min_interval_ticks: self.execution.min_interval_ticks,
            max_trades_per_100: self.execution.max_trades_per_100,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be finite and >= 0, got {value}"),
        })
    }
}
