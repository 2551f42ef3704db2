//! Decision collaborator: picks a validator kind for a regime.
//!
//! The pipeline asks a [`Decider`] once per regime segment. The returned kind
//! name is resolved by the validator factory, so a decider naming an unknown
//! kind fails the run rather than falling back silently. [`FallbackDecider`]
//! is the opt-in hardening layer for deciders that may error.

use std::collections::BTreeMap;

use regimegate_core::market::{CALM_TREND, VOLATILE};
use regimegate_core::validator::ValidatorKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ValidatorParams;

/// Errors a decider may report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    #[error("no decision for regime '{regime}': {reason}")]
    Failed { regime: String, reason: String },
}

/// What the decider is told about the segment it decides for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionContext<'a> {
    pub current_regime: &'a str,
}

/// A validator choice bound to one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Validator kind name, resolved by the factory.
    pub validator: String,
    pub params: BTreeMap<String, f64>,
    pub reason: String,
}

impl Decision {
    pub fn new(kind: ValidatorKind, params: BTreeMap<String, f64>, reason: &str) -> Self {
        Self {
            validator: kind.as_str().to_string(),
            params,
            reason: reason.to_string(),
        }
    }
}

/// Chooses a validator for a regime.
pub trait Decider {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<Decision, DecisionError>;
}

impl<D: Decider + ?Sized> Decider for &D {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<Decision, DecisionError> {
        (**self).decide(ctx)
    }
}

impl<D: Decider + ?Sized> Decider for Box<D> {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<Decision, DecisionError> {
        (**self).decide(ctx)
    }
}

// ─── Rule-based decider ─────────────────────────────────────────────

/// Fixed regime → validator table:
/// - `calm_trend` → EWMA
/// - `volatile` → Volatility
/// - anything else → Persistence
///
/// Parameters for the chosen kind come from the configured validator params.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBasedDecider {
    params: ValidatorParams,
}

impl RuleBasedDecider {
    pub fn new(params: ValidatorParams) -> Self {
        Self { params }
    }

    /// The kind and rationale chosen for a regime label.
    pub fn rule_for(regime: &str) -> (ValidatorKind, &'static str) {
        match regime {
            CALM_TREND => (
                ValidatorKind::Ewma,
                "Stable upward trend with low volatility",
            ),
            VOLATILE => (
                ValidatorKind::Volatility,
                "Elevated return volatility; prefer volatility gate",
            ),
            _ => (
                ValidatorKind::Persistence,
                "Spiky moves; require persistence above rolling mean",
            ),
        }
    }
}

impl Default for RuleBasedDecider {
    fn default() -> Self {
        Self::new(ValidatorParams::default())
    }
}

impl Decider for RuleBasedDecider {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<Decision, DecisionError> {
        let (kind, reason) = Self::rule_for(ctx.current_regime);
        Ok(Decision::new(kind, self.params.params_for(kind), reason))
    }
}

// ─── Fallback ───────────────────────────────────────────────────────

/// Replaces decider errors with a fixed decision.
///
/// Every substitution is logged at `warn`. Unknown kinds named by a
/// successful decision still reach the factory and still fail.
#[derive(Debug, Clone)]
pub struct FallbackDecider<D> {
    inner: D,
    fallback: Decision,
}

impl<D: Decider> FallbackDecider<D> {
    pub fn new(inner: D, fallback: Decision) -> Self {
        Self { inner, fallback }
    }

    /// Falls back to the Persistence rule with the given params.
    pub fn with_persistence(inner: D, params: &ValidatorParams) -> Self {
        let fallback = Decision::new(
            ValidatorKind::Persistence,
            params.params_for(ValidatorKind::Persistence),
            "Fallback after decider failure",
        );
        Self::new(inner, fallback)
    }

    pub fn fallback(&self) -> &Decision {
        &self.fallback
    }
}

impl<D: Decider> Decider for FallbackDecider<D> {
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<Decision, DecisionError> {
        match self.inner.decide(ctx) {
            Ok(decision) => Ok(decision),
            Err(e) => {
                warn!(regime = ctx.current_regime, error = %e, "decider failed, using fallback");
                Ok(self.fallback.clone())
            }
        }
    }
}
