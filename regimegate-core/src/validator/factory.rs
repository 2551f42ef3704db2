//! Factory: converts a validator kind name plus a parameter map into a
//! runtime validator.
//!
//! The kind name is resolved through a fixed dispatch table and validated
//! eagerly: an unknown kind is a configuration error, never a silent default.
//! Missing parameters fall back to the kind's defaults; present parameters are
//! range-checked before construction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    ConfirmWrapper, EwmaValidator, PersistenceValidator, Validator, VolatilityValidator,
};

// ─── Error type ──────────────────────────────────────────────────────

/// Errors that can occur during validator construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FactoryError {
    #[error("Unknown validator kind: {0} (expected one of: EWMA, Volatility, Persistence)")]
    UnknownValidator(String),
    #[error("Invalid parameter {name}={value} for {kind}: {reason}")]
    InvalidParam {
        kind: ValidatorKind,
        name: String,
        value: f64,
        reason: &'static str,
    },
}

// ─── Kind ────────────────────────────────────────────────────────────

/// The closed set of validator kinds a decision may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidatorKind {
    #[serde(rename = "EWMA")]
    Ewma,
    #[serde(rename = "Volatility")]
    Volatility,
    #[serde(rename = "Persistence")]
    Persistence,
}

impl ValidatorKind {
    pub const ALL: [ValidatorKind; 3] = [
        ValidatorKind::Ewma,
        ValidatorKind::Volatility,
        ValidatorKind::Persistence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValidatorKind::Ewma => "EWMA",
            ValidatorKind::Volatility => "Volatility",
            ValidatorKind::Persistence => "Persistence",
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidatorKind {
    type Err = FactoryError;

    /// Case-insensitive match on the canonical names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EWMA" => Ok(ValidatorKind::Ewma),
            "VOLATILITY" => Ok(ValidatorKind::Volatility),
            "PERSISTENCE" => Ok(ValidatorKind::Persistence),
            _ => Err(FactoryError::UnknownValidator(s.to_string())),
        }
    }
}

// ─── Defaults ────────────────────────────────────────────────────────

/// Default parameter map for a kind.
pub fn default_params(kind: ValidatorKind) -> BTreeMap<String, f64> {
    let pairs: &[(&str, f64)] = match kind {
        ValidatorKind::Ewma => &[("alpha", 0.05), ("z_enter", 2.5), ("z_exit", 2.5)],
        ValidatorKind::Volatility => &[("window", 50.0), ("max_vol", 0.01)],
        ValidatorKind::Persistence => &[("hold", 3.0), ("mean_alpha", 0.05), ("z", 0.2)],
    };
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Upper bound for integer parameters (`window`, `hold`).
pub const MAX_COUNT: usize = 1_000_000;

struct Params<'a> {
    kind: ValidatorKind,
    map: &'a BTreeMap<String, f64>,
}

impl Params<'_> {
    fn get(&self, name: &str, default: f64) -> Result<f64, FactoryError> {
        let value = self.map.get(name).copied().unwrap_or(default);
        if !value.is_finite() {
            return Err(self.invalid(name, value, "must be finite"));
        }
        Ok(value)
    }

    fn unit_open(&self, name: &str, default: f64) -> Result<f64, FactoryError> {
        let value = self.get(name, default)?;
        if value <= 0.0 || value >= 1.0 {
            return Err(self.invalid(name, value, "must be in (0, 1)"));
        }
        Ok(value)
    }

    fn positive(&self, name: &str, default: f64) -> Result<f64, FactoryError> {
        let value = self.get(name, default)?;
        if value <= 0.0 {
            return Err(self.invalid(name, value, "must be > 0"));
        }
        Ok(value)
    }

    fn count(&self, name: &str, default: usize) -> Result<usize, FactoryError> {
        let value = self.get(name, default as f64)?;
        if value < 1.0 || value.fract() != 0.0 {
            return Err(self.invalid(name, value, "must be a positive integer"));
        }
        if value > MAX_COUNT as f64 {
            return Err(self.invalid(name, value, "exceeds 1000000"));
        }
        Ok(value as usize)
    }

    fn invalid(&self, name: &str, value: f64, reason: &'static str) -> FactoryError {
        FactoryError::InvalidParam {
            kind: self.kind,
            name: name.to_string(),
            value,
            reason,
        }
    }
}

// ─── Factories ───────────────────────────────────────────────────────

/// Create a validator from a kind name and parameter map.
///
/// EWMA: `alpha`, `z_enter`, `z_exit` (defaults to `z_enter`).
/// Volatility: `window`, `max_vol`.
/// Persistence: `hold`, `mean_alpha`, `z`.
pub fn build_validator(
    kind: &str,
    params: &BTreeMap<String, f64>,
) -> Result<Box<dyn Validator>, FactoryError> {
    let kind: ValidatorKind = kind.parse()?;
    let p = Params { kind, map: params };

    match kind {
        ValidatorKind::Ewma => {
            let alpha = p.unit_open("alpha", 0.05)?;
            let z_enter = p.positive("z_enter", 2.5)?;
            let z_exit = p.positive("z_exit", z_enter)?;
            if z_exit > z_enter {
                return Err(p.invalid("z_exit", z_exit, "must be <= z_enter"));
            }
            Ok(Box::new(EwmaValidator::with_hysteresis(
                alpha, z_enter, z_exit,
            )))
        }
        ValidatorKind::Volatility => {
            let window = p.count("window", 50)?;
            let max_vol = p.get("max_vol", 0.01)?;
            if max_vol < 0.0 {
                return Err(p.invalid("max_vol", max_vol, "must be >= 0"));
            }
            Ok(Box::new(VolatilityValidator::new(window, max_vol)))
        }
        ValidatorKind::Persistence => {
            let hold = p.count("hold", 3)?;
            let mean_alpha = p.positive("mean_alpha", 0.05)?;
            if mean_alpha > 1.0 {
                return Err(p.invalid("mean_alpha", mean_alpha, "must be <= 1"));
            }
            let z = p.get("z", 0.2)?;
            Ok(Box::new(PersistenceValidator::new(hold, mean_alpha, z)))
        }
    }
}

/// Create a validator and wrap it in a confirmation wrapper.
pub fn build_confirmed(
    kind: &str,
    params: &BTreeMap<String, f64>,
    confirm: usize,
) -> Result<ConfirmWrapper<Box<dyn Validator>>, FactoryError> {
    let inner = build_validator(kind, params)?;
    if confirm == 0 {
        return Err(FactoryError::InvalidParam {
            kind: kind.parse()?,
            name: "confirm".into(),
            value: 0.0,
            reason: "must be >= 1",
        });
    }
    Ok(ConfirmWrapper::new(inner, confirm))
}
