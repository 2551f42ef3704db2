//! Single-validator runs: one validator kind over one price series.
//!
//! The parameter map mixes validator parameters with execution settings, so a
//! whole run can be described as `key=value` pairs. Execution keys
//! (`confirm`, `latency_ticks`, `cost_bps`, `slip_bps`, `position`,
//! `min_interval_ticks`, `max_trades_per_100`) are taken out of the map; the
//! rest goes to the validator factory.
//!
//! Prices come either from the synthetic market or from a CSV file with a
//! `price`, `close` or `last` column (case-insensitive, first match in that
//! order). Cells that do not parse as finite numbers are skipped.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use regimegate_core::metrics::SimulationResult;
use regimegate_core::simulator::{simulate, SimParams};
use regimegate_core::validator::{build_confirmed, FactoryError, ValidatorKind, MAX_COUNT};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Accepted price column names, in priority order.
pub const PRICE_COLUMNS: [&str; 3] = ["price", "close", "last"];

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors while loading a price series from CSV.
#[derive(Debug, thiserror::Error)]
pub enum PriceLoadError {
    #[error("failed to read prices {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV appears empty")]
    Empty,
    #[error("CSV must contain a numeric column named one of: price, close, last (case-insensitive)")]
    NoPriceColumn,
    #[error("column '{0}' contains no numeric values")]
    NoNumericValues(String),
}

/// Errors that abort a single-validator run.
#[derive(Debug, thiserror::Error)]
pub enum SingleRunError {
    #[error("validator error: {0}")]
    Factory(#[from] FactoryError),
    #[error("invalid simulation parameter {name}={value}: {reason}")]
    InvalidSimParam {
        name: String,
        value: f64,
        reason: &'static str,
    },
}

// ─── Price loading ───────────────────────────────────────────────────

/// Read a price column from CSV data with a header row.
pub fn read_prices<R: io::Read>(reader: R) -> Result<Vec<f64>, PriceLoadError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = PRICE_COLUMNS.iter().find_map(|cand| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(cand))
    });

    let mut rows = 0usize;
    let mut prices = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows += 1;
        let Some(idx) = column else { continue };
        let value = record
            .get(idx)
            .and_then(|cell| cell.trim().parse::<f64>().ok())
            .filter(|p| p.is_finite());
        if let Some(p) = value {
            prices.push(p);
        }
    }

    if rows == 0 {
        return Err(PriceLoadError::Empty);
    }
    let idx = column.ok_or(PriceLoadError::NoPriceColumn)?;
    if prices.is_empty() {
        return Err(PriceLoadError::NoNumericValues(headers[idx].to_string()));
    }
    Ok(prices)
}

/// [`read_prices`] from a file.
pub fn load_prices(path: &Path) -> Result<Vec<f64>, PriceLoadError> {
    let file = std::fs::File::open(path).map_err(|source| PriceLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let prices = read_prices(file)?;
    debug!(path = %path.display(), ticks = prices.len(), "prices loaded");
    Ok(prices)
}

// ─── Run description ─────────────────────────────────────────────────

/// Parse a `key=value` pair with a numeric value.
pub fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("value for '{key}' is not a number: '{}'", value.trim()))?;
    Ok((key.to_string(), value))
}

/// One validator kind with its parameters and execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRun {
    pub validator_kind: ValidatorKind,
    pub params: BTreeMap<String, f64>,
    pub confirm: usize,
    pub sim_params: SimParams,
}

impl ValidatorRun {
    /// Split a mixed parameter map into validator parameters, the
    /// confirmation count and simulation settings. Missing execution keys
    /// take the [`SimParams`] defaults and `confirm = 1`.
    pub fn from_params(kind: &str, params: BTreeMap<String, f64>) -> Result<Self, SingleRunError> {
        let validator_kind: ValidatorKind = kind.parse()?;
        let mut params = params;
        let defaults = SimParams::default();

        let confirm = take_count(&mut params, "confirm", 1, 1)?;
        let sim_params = SimParams {
            latency_ticks: take_count(&mut params, "latency_ticks", defaults.latency_ticks, 0)?,
            cost_bps: take_non_negative(&mut params, "cost_bps", defaults.cost_bps)?,
            slip_bps: take_non_negative(&mut params, "slip_bps", defaults.slip_bps)?,
            position: take_non_negative(&mut params, "position", defaults.position)?,
            min_interval_ticks: take_count(
                &mut params,
                "min_interval_ticks",
                defaults.min_interval_ticks,
                0,
            )?,
            max_trades_per_100: take_count(
                &mut params,
                "max_trades_per_100",
                defaults.max_trades_per_100,
                0,
            )?,
        };

        Ok(Self {
            validator_kind,
            params,
            confirm,
            sim_params,
        })
    }

    /// Build the confirmed validator and simulate it over `prices`.
    pub fn run(&self, prices: &[f64]) -> Result<ValidatorRunResult, SingleRunError> {
        let mut validator = build_confirmed(self.validator_kind.as_str(), &self.params, self.confirm)?;
        let result = simulate(prices, &mut validator, &self.sim_params);
        Ok(ValidatorRunResult {
            validator_kind: self.validator_kind,
            confirm: self.confirm,
            sim_params: self.sim_params,
            result,
        })
    }
}

/// Outcome of a single-validator run, serialized flat alongside the
/// settings that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRunResult {
    pub validator_kind: ValidatorKind,
    pub confirm: usize,
    pub sim_params: SimParams,
    #[serde(flatten)]
    pub result: SimulationResult,
}

fn take_count(
    params: &mut BTreeMap<String, f64>,
    name: &str,
    default: usize,
    min: usize,
) -> Result<usize, SingleRunError> {
    let Some(value) = params.remove(name) else {
        return Ok(default);
    };
    let reason = if !value.is_finite() || value.fract() != 0.0 {
        "must be an integer"
    } else if value < min as f64 {
        if min == 0 {
            "must be >= 0"
        } else {
            "must be >= 1"
        }
    } else if value > MAX_COUNT as f64 {
        "exceeds 1000000"
    } else {
        return Ok(value as usize);
    };
    Err(SingleRunError::InvalidSimParam {
        name: name.to_string(),
        value,
        reason,
    })
}

fn take_non_negative(
    params: &mut BTreeMap<String, f64>,
    name: &str,
    default: f64,
) -> Result<f64, SingleRunError> {
    match params.remove(name) {
        None => Ok(default),
        Some(value) if value.is_finite() && value >= 0.0 => Ok(value),
        Some(value) => Err(SingleRunError::InvalidSimParam {
            name: name.to_string(),
            value,
            reason: "must be finite and >= 0",
        }),
    }
}
