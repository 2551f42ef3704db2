//! Random-search tuning of validator parameters and position sizes.
//!
//! Candidates are drawn up front from per-iteration streams of the RNG
//! hierarchy, then evaluated in parallel with rayon on one shared tick series.
//! Each evaluation runs the full pipeline with its own decider and a
//! discarding decision sink, so nothing is shared between workers and the
//! outcome does not depend on scheduling.

use std::ops::RangeInclusive;

use rand::Rng;
use rayon::prelude::*;
use regimegate_core::market::{labeled_scenarios, CALM_TREND, JUMPY, VOLATILE};
use regimegate_core::rng::RngHierarchy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ConfigError, PipelineConfig, PositionConfig, ValidatorParams};
use crate::decision::RuleBasedDecider;
use crate::decision_log::{FixedClock, NullSink};
use crate::pipeline::{run_pipeline, AggregateMetrics, PipelineError};

/// RNG stream name for candidate draws.
const STREAM: &str = "optimizer";

/// Sampling ranges, all inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub ewma_alpha: RangeInclusive<f64>,
    pub ewma_z: RangeInclusive<f64>,
    pub vol_window: RangeInclusive<usize>,
    pub vol_max: RangeInclusive<f64>,
    pub persist_hold: RangeInclusive<usize>,
    pub persist_mean_alpha: RangeInclusive<f64>,
    pub persist_z: RangeInclusive<f64>,
    pub pos_calm: RangeInclusive<f64>,
    pub pos_volatile: RangeInclusive<f64>,
    pub pos_jumpy: RangeInclusive<f64>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            ewma_alpha: 0.01..=0.12,
            ewma_z: 1.8..=3.2,
            vol_window: 20..=120,
            vol_max: 0.003..=0.02,
            persist_hold: 2..=6,
            persist_mean_alpha: 0.01..=0.12,
            persist_z: 0.05..=0.35,
            pos_calm: 0.6..=1.1,
            pos_volatile: 0.2..=0.7,
            pos_jumpy: 0.1..=0.5,
        }
    }
}

impl SearchSpace {
    /// Every range must be non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let floats = [
            ("search.ewma_alpha", &self.ewma_alpha),
            ("search.ewma_z", &self.ewma_z),
            ("search.vol_max", &self.vol_max),
            ("search.persist_mean_alpha", &self.persist_mean_alpha),
            ("search.persist_z", &self.persist_z),
            ("search.pos_calm", &self.pos_calm),
            ("search.pos_volatile", &self.pos_volatile),
            ("search.pos_jumpy", &self.pos_jumpy),
        ];
        for (field, range) in floats {
            if !(range.start().is_finite() && range.end().is_finite()) || range.is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("empty range {:?}", range),
                });
            }
        }
        for (field, range) in [
            ("search.vol_window", &self.vol_window),
            ("search.persist_hold", &self.persist_hold),
        ] {
            if range.is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("empty range {:?}", range),
                });
            }
        }
        Ok(())
    }

    /// Draw one candidate.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Candidate {
        let validators = ValidatorParams {
            ewma_alpha: rng.gen_range(self.ewma_alpha.clone()),
            ewma_z: rng.gen_range(self.ewma_z.clone()),
            vol_window: rng.gen_range(self.vol_window.clone()),
            vol_max: rng.gen_range(self.vol_max.clone()),
            persist_hold: rng.gen_range(self.persist_hold.clone()),
            persist_mean_alpha: rng.gen_range(self.persist_mean_alpha.clone()),
            persist_z: rng.gen_range(self.persist_z.clone()),
        };
        let pos_jumpy = rng.gen_range(self.pos_jumpy.clone());
        let positions = PositionConfig {
            default: pos_jumpy,
            regimes: [
                (CALM_TREND, rng.gen_range(self.pos_calm.clone())),
                (VOLATILE, rng.gen_range(self.pos_volatile.clone())),
                (JUMPY, pos_jumpy),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        };
        Candidate {
            validators,
            positions,
        }
    }
}

/// Tunable part of a pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub validators: ValidatorParams,
    pub positions: PositionConfig,
}

impl Candidate {
    /// `base` with this candidate's validators and positions.
    pub fn apply(&self, base: &PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            validators: self.validators.clone(),
            positions: self.positions.clone(),
            ..base.clone()
        }
    }
}

/// One evaluated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub iteration: usize,
    pub score: f64,
    pub candidate: Candidate,
    pub aggregate: AggregateMetrics,
}

/// All trials in iteration order plus the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub seed: u64,
    pub best: Option<Trial>,
    pub trials: Vec<Trial>,
}

/// Higher is better: sharpe-like, penalized for false signals and turnover,
/// with a small pnl bonus.
pub fn score(agg: &AggregateMetrics) -> f64 {
    agg.sharpe_like - 0.25 * agg.false_signal_rate - 0.0005 * agg.trade_count as f64
        + 0.00005 * agg.total_pnl
}

/// Evaluate `iters` random candidates around `base`.
///
/// The tick series comes from `base.market`. Ties on score go to the lowest
/// iteration.
pub fn random_search(
    base: &PipelineConfig,
    space: &SearchSpace,
    iters: usize,
    seed: u64,
) -> Result<SearchOutcome, PipelineError> {
    base.validate()?;
    space.validate()?;

    let ticks = labeled_scenarios(base.market.n_ticks, base.market.seed);
    let hierarchy = RngHierarchy::new(seed);
    let candidates: Vec<Candidate> = (0..iters)
        .map(|i| space.sample(&mut hierarchy.rng_for(STREAM, i as u64)))
        .collect();
    info!(iters, seed, ticks = ticks.len(), "random search");

    let trials: Vec<Trial> = candidates
        .into_par_iter()
        .enumerate()
        .map(|(iteration, candidate)| -> Result<Trial, PipelineError> {
            let config = candidate.apply(base);
            let decider = RuleBasedDecider::new(config.validators.clone());
            let result = run_pipeline(&config, &ticks, &decider, &mut NullSink, &FixedClock(0))?;
            let score = score(&result.aggregate);
            debug!(iteration, score, "trial");
            Ok(Trial {
                iteration,
                score,
                candidate,
                aggregate: result.aggregate,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let best = trials
        .iter()
        .fold(None::<&Trial>, |best, t| match best {
            Some(b) if b.score >= t.score => Some(b),
            _ => Some(t),
        })
        .cloned();
    if let Some(b) = &best {
        info!(iteration = b.iteration, score = b.score, "best candidate");
    }

    Ok(SearchOutcome { seed, best, trials })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_base() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.market.n_ticks = 900;
        config
    }

    #[test]
    fn default_space_matches_reference_ranges() {
        let s = SearchSpace::default();
        assert_eq!(s.vol_window, 20..=120);
        assert_eq!(s.persist_hold, 2..=6);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn samples_stay_in_range() {
        let space = SearchSpace::default();
        let hierarchy = RngHierarchy::new(42);
        for i in 0..200 {
            let c = space.sample(&mut hierarchy.rng_for(STREAM, i));
            assert!(space.ewma_alpha.contains(&c.validators.ewma_alpha));
            assert!(space.vol_window.contains(&c.validators.vol_window));
            assert!(space.persist_hold.contains(&c.validators.persist_hold));
            assert!(space.pos_calm.contains(&c.positions.regimes["calm_trend"]));
            assert_eq!(c.positions.default, c.positions.regimes["jumpy"]);
        }
    }

    #[test]
    fn empty_range_rejected() {
        let space = SearchSpace {
            ewma_z: 3.0..=2.0,
            ..SearchSpace::default()
        };
        assert!(space.validate().is_err());
        assert!(matches!(
            random_search(&small_base(), &space, 2, 1),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn score_formula() {
        let agg = AggregateMetrics {
            total_pnl: 100.0,
            trade_count: 40,
            false_signal_rate: 0.4,
            sharpe_like: 0.5,
            drawdown_recovery_ticks: 3,
            adaptive_switch_count: 2,
        };
        // 0.5 - 0.1 - 0.02 + 0.005
        assert!((score(&agg) - 0.385).abs() < 1e-12);
    }

    #[test]
    fn search_is_deterministic() {
        let base = small_base();
        let a = random_search(&base, &SearchSpace::default(), 4, 42).unwrap();
        let b = random_search(&base, &SearchSpace::default(), 4, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.trials.len(), 4);
        let iterations: Vec<usize> = a.trials.iter().map(|t| t.iteration).collect();
        assert_eq!(iterations, vec![0, 1, 2, 3]);
    }

    #[test]
    fn best_has_max_score() {
        let out = random_search(&small_base(), &SearchSpace::default(), 5, 7).unwrap();
        let best = out.best.unwrap();
        assert!(out.trials.iter().all(|t| t.score <= best.score));
        let first_max = out
            .trials
            .iter()
            .find(|t| t.score == best.score)
            .unwrap()
            .iteration;
        assert_eq!(best.iteration, first_max);
    }

    #[test]
    fn zero_iterations_has_no_best() {
        let out = random_search(&small_base(), &SearchSpace::default(), 0, 1).unwrap();
        assert!(out.best.is_none());
        assert!(out.trials.is_empty());
    }
}
