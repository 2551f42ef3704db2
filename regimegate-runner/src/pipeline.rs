//! Regime-adaptive pipeline: baseline run vs per-regime validator selection.
//!
//! Phases:
//! 1. Baseline: the whole series through a confirmed EWMA validator at
//!    baseline latency and unit position.
//! 2. Per regime: for each contiguous segment, ask the decider, build and
//!    confirm the named validator, simulate the segment with agent latency and
//!    the regime's position, then append the decision to the log.
//! 3. Stitching: concatenate per-segment equity curves with a running offset.
//! 4. Aggregation across segments.
//!
//! Any error inside a segment aborts the run; records already appended to the
//! decision log are kept.

use std::ops::Range;
use std::path::Path;

use regimegate_core::domain::{prices, split_segments, LabeledTick, RegimeSegment};
use regimegate_core::metrics::SimulationResult;
use regimegate_core::simulator::simulate;
use regimegate_core::validator::{build_confirmed, FactoryError, ValidatorKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{short_run_id, ConfigError, PipelineConfig, RunId};
use crate::decision::{Decider, Decision, DecisionContext, DecisionError};
use crate::decision_log::{Clock, DecisionLog, DecisionRecord, DecisionSink};

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("validator error: {0}")]
    Factory(#[from] FactoryError),
    #[error("decision error: {0}")]
    Decision(#[from] DecisionError),
    #[error("decision log error: {0}")]
    Log(#[from] std::io::Error),
}

/// Result of one regime segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeRun {
    /// Tick range of the segment in the input series.
    pub segment: RegimeSegment,
    pub decision: Decision,
    pub result: SimulationResult,
}

/// Metrics combined across all regime segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total_pnl: f64,
    #[serde(rename = "trades")]
    pub trade_count: usize,
    #[serde(rename = "fsr")]
    pub false_signal_rate: f64,
    pub sharpe_like: f64,
    #[serde(rename = "dd_recovery_ticks")]
    pub drawdown_recovery_ticks: usize,
    pub adaptive_switch_count: usize,
}

/// Baseline vs adaptive outcome of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: RunId,
    pub baseline: SimulationResult,
    pub per_regime: Vec<RegimeRun>,
    pub aggregate: AggregateMetrics,
    pub stitched_equity: Vec<f64>,
    /// Index range each segment occupies in `stitched_equity`.
    pub segment_bounds: Vec<RegimeSegment>,
}

/// Run baseline and adaptive evaluation over a labeled series.
pub fn run_pipeline<D, S, C>(
    config: &PipelineConfig,
    ticks: &[LabeledTick],
    decider: &D,
    sink: &mut S,
    clock: &C,
) -> Result<PipelineResult, PipelineError>
where
    D: Decider + ?Sized,
    S: DecisionSink + ?Sized,
    C: Clock + ?Sized,
{
    config.validate()?;
    let run_id = config.run_id();
    let all_prices = prices(ticks);
    let confirm = config.execution.confirm;

    info!(run_id = %short_run_id(&run_id), ticks = ticks.len(), "baseline run");
    let mut baseline_validator = build_confirmed(
        ValidatorKind::Ewma.as_str(),
        &config.validators.params_for(ValidatorKind::Ewma),
        confirm,
    )?;
    let baseline = simulate(
        &all_prices,
        &mut baseline_validator,
        &config.baseline_sim_params(),
    );

    let segments = split_segments(ticks);
    info!(segments = segments.len(), "adaptive run");
    let mut per_regime = Vec::with_capacity(segments.len());
    for segment in segments {
        let decision = decider.decide(&DecisionContext {
            current_regime: &segment.regime,
        })?;
        let mut validator = build_confirmed(&decision.validator, &decision.params, confirm)?;
        let params = config.agent_sim_params(&segment.regime);
        let result = simulate(&all_prices[segment.range()], &mut validator, &params);

        sink.append(&DecisionRecord::new(clock.now(), &segment.regime, &decision))?;
        info!(
            regime = %segment.regime,
            validator = %decision.validator,
            ticks = segment.len(),
            trades = result.trade_count,
            total_pnl = result.total_pnl,
            "segment done"
        );
        per_regime.push(RegimeRun {
            segment,
            decision,
            result,
        });
    }

    let (stitched_equity, bounds) =
        stitch_equity(per_regime.iter().map(|r| r.result.equity.as_slice()));
    let segment_bounds = per_regime
        .iter()
        .zip(bounds)
        .map(|(run, range)| RegimeSegment {
            regime: run.segment.regime.clone(),
            start: range.start,
            end: range.end,
        })
        .collect();
    let aggregate = aggregate(per_regime.iter().map(|r| &r.result));
    debug!(?aggregate, "aggregate");
    info!(
        baseline_pnl = baseline.total_pnl,
        agent_pnl = aggregate.total_pnl,
        switches = aggregate.adaptive_switch_count,
        "pipeline finished"
    );

    Ok(PipelineResult {
        run_id,
        baseline,
        per_regime,
        aggregate,
        stitched_equity,
        segment_bounds,
    })
}

/// [`run_pipeline`] with a fresh decision log file at `log_path`.
pub fn run_to_file<D, C>(
    config: &PipelineConfig,
    ticks: &[LabeledTick],
    decider: &D,
    log_path: &Path,
    clock: &C,
) -> Result<PipelineResult, PipelineError>
where
    D: Decider + ?Sized,
    C: Clock + ?Sized,
{
    let mut log = DecisionLog::create(log_path)?;
    run_pipeline(config, ticks, decider, &mut log, clock)
}

/// Concatenate equity curves, shifting each by the last value of the
/// previous one. Empty curves are skipped and get an empty range.
///
/// Returns the stitched curve and the range each input occupies in it.
pub fn stitch_equity<'a, I>(curves: I) -> (Vec<f64>, Vec<Range<usize>>)
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut stitched = Vec::new();
    let mut bounds = Vec::new();
    let mut offset = 0.0_f64;
    for curve in curves {
        let start = stitched.len();
        stitched.extend(curve.iter().map(|v| v + offset));
        if let Some(&last) = stitched.get(start..).and_then(|s| s.last()) {
            offset = last;
        }
        bounds.push(start..stitched.len());
    }
    (stitched, bounds)
}

/// Sum pnl and trades; unweighted mean of fsr, sharpe-like and drawdown
/// recovery (truncated). One switch between each pair of adjacent segments.
pub fn aggregate<'a, I>(results: I) -> AggregateMetrics
where
    I: IntoIterator<Item = &'a SimulationResult>,
{
    let mut agg = AggregateMetrics::default();
    let mut n = 0usize;
    let mut fsr_sum = 0.0_f64;
    let mut sharpe_sum = 0.0_f64;
    let mut dd_sum = 0.0_f64;
    for r in results {
        n += 1;
        agg.total_pnl += r.total_pnl;
        agg.trade_count += r.trade_count;
        fsr_sum += r.false_signal_rate;
        sharpe_sum += r.sharpe_like;
        dd_sum += r.drawdown_recovery_ticks as f64;
    }
    if n > 0 {
        let n_f = n as f64;
        agg.false_signal_rate = fsr_sum / n_f;
        agg.sharpe_like = sharpe_sum / n_f;
        agg.drawdown_recovery_ticks = (dd_sum / n_f) as usize;
    }
    agg.adaptive_switch_count = n.saturating_sub(1);
    agg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RuleBasedDecider;
    use crate::decision_log::FixedClock;
    use regimegate_core::domain::{Direction, Trade};

    fn result_with(pnls: &[f64]) -> SimulationResult {
        SimulationResult::from_trades(
            pnls.iter()
                .enumerate()
                .map(|(i, &pnl)| Trade {
                    signal_tick: i * 10,
                    entry_tick: i * 10 + 1,
                    exit_tick: i * 10 + 2,
                    direction: Direction::Long,
                    pnl,
                })
                .collect(),
        )
    }

    #[test]
    fn stitch_carries_offset() {
        let a = [1.0, 3.0];
        let b = [0.5, -1.0, 2.0];
        let (curve, bounds) = stitch_equity([&a[..], &b[..]]);
        assert_eq!(curve, vec![1.0, 3.0, 3.5, 2.0, 5.0]);
        assert_eq!(bounds, vec![0..2, 2..5]);
    }

    #[test]
    fn stitch_skips_empty_curves() {
        let a = [2.0];
        let empty: [f64; 0] = [];
        let c = [1.0, 4.0];
        let (curve, bounds) = stitch_equity([&a[..], &empty[..], &c[..]]);
        assert_eq!(curve, vec![2.0, 3.0, 6.0]);
        assert_eq!(bounds, vec![0..1, 1..1, 1..3]);
    }

    #[test]
    fn aggregate_math() {
        let results = [
            result_with(&[1.0, -1.0, 2.0]),
            result_with(&[-0.5, -0.5]),
            result_with(&[]),
        ];
        let agg = aggregate(&results);
        assert!((agg.total_pnl - 1.0).abs() < 1e-12);
        assert_eq!(agg.trade_count, 5);
        // fsr: 1/3, 1.0, 0.0
        assert!((agg.false_signal_rate - (1.0 / 3.0 + 1.0) / 3.0).abs() < 1e-12);
        assert_eq!(agg.adaptive_switch_count, 2);
    }

    #[test]
    fn aggregate_truncates_recovery() {
        // recoveries 1 and 2 → mean 1.5 → 1
        let results = [
            result_with(&[1.0, -1.0, 1.0]),
            result_with(&[1.0, -1.0, -1.0, 1.5, 0.5]),
        ];
        assert_eq!(results[0].drawdown_recovery_ticks, 1);
        assert_eq!(results[1].drawdown_recovery_ticks, 2);
        assert_eq!(aggregate(&results).drawdown_recovery_ticks, 1);
    }

    #[test]
    fn aggregate_of_nothing_is_neutral() {
        let agg = aggregate(std::iter::empty());
        assert_eq!(agg, AggregateMetrics::default());
    }

    #[test]
    fn empty_series_runs() {
        let mut sink: Vec<DecisionRecord> = Vec::new();
        let r = run_pipeline(
            &PipelineConfig::default(),
            &[],
            &RuleBasedDecider::default(),
            &mut sink,
            &FixedClock(0),
        )
        .unwrap();
        assert!(r.per_regime.is_empty());
        assert!(r.stitched_equity.is_empty());
        assert_eq!(r.baseline.trade_count, 0);
        assert_eq!(r.aggregate.adaptive_switch_count, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn invalid_config_rejected_before_any_work() {
        let mut config = PipelineConfig::default();
        config.execution.confirm = 0;
        let mut sink: Vec<DecisionRecord> = Vec::new();
        let err = run_pipeline(
            &config,
            &[LabeledTick::new(100.0, "calm_trend")],
            &RuleBasedDecider::default(),
            &mut sink,
            &FixedClock(0),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(sink.is_empty());
    }
}
