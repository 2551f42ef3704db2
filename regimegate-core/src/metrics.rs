//! Trade metrics: pure functions over an ordered list of trade pnls.
//!
//! Every metric is well-defined on an empty list: neutral values (`0.0` / `0`),
//! never NaN.

use serde::{Deserialize, Serialize};

use crate::domain::Trade;
use crate::EPSILON;

/// Outcome of one simulation run.
///
/// Field names in the serialized form follow the result artifact consumed by
/// downstream reporting (`trades`, `fsr`, `dd_recovery_ticks`, `trades_detail`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub total_pnl: f64,
    #[serde(rename = "trades")]
    pub trade_count: usize,
    #[serde(rename = "fsr")]
    pub false_signal_rate: f64,
    pub sharpe_like: f64,
    #[serde(rename = "dd_recovery_ticks")]
    pub drawdown_recovery_ticks: usize,
    pub max_drawdown: f64,
    pub equity: Vec<f64>,
    #[serde(rename = "trades_detail")]
    pub trades: Vec<Trade>,
}

impl SimulationResult {
    /// Derive every metric from the ordered trade list.
    pub fn from_trades(trades: Vec<Trade>) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        let equity = equity_curve(&pnls);
        Self {
            total_pnl: total_pnl(&pnls),
            trade_count: pnls.len(),
            false_signal_rate: false_signal_rate(&pnls),
            sharpe_like: sharpe_like(&pnls),
            drawdown_recovery_ticks: drawdown_recovery_ticks(&pnls),
            max_drawdown: max_drawdown(&equity),
            equity,
            trades,
        }
    }

    /// The neutral result of a run that placed no trades.
    pub fn empty() -> Self {
        Self::from_trades(Vec::new())
    }

    /// Last cumulative pnl of the reported equity curve.
    pub fn final_equity(&self) -> f64 {
        self.equity.last().copied().unwrap_or(0.0)
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn total_pnl(pnls: &[f64]) -> f64 {
    pnls.iter().sum()
}

/// Fraction of trades with negative pnl.
pub fn false_signal_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|&&p| p < 0.0).count() as f64 / pnls.len() as f64
}

/// Mean pnl over population standard deviation (plus epsilon).
///
/// Returns 0.0 for fewer than two trades.
pub fn sharpe_like(pnls: &[f64]) -> f64 {
    if pnls.len() < 2 {
        return 0.0;
    }
    mean_f64(pnls) / (std_dev(pnls) + EPSILON)
}

/// Cumulative pnl per trade; `[0.0]` when there are fewer than two trades.
pub fn equity_curve(pnls: &[f64]) -> Vec<f64> {
    if pnls.len() <= 1 {
        return vec![0.0];
    }
    cumulative(pnls)
}

/// Longest drawdown recovery, in trade-index units.
///
/// Tracks the running peak of the cumulative pnl (starting from 0.0). A new
/// peak ends any open drawdown without recording it. Each time a new maximum
/// drawdown depth is reached, that index becomes the drawdown start. Only a
/// return to within `1e-12` of the current peak records the span since the
/// start; equity that jumps past the peak does not count as a recovery.
pub fn drawdown_recovery_ticks(pnls: &[f64]) -> usize {
    let mut peak = 0.0_f64;
    let mut max_depth = 0.0_f64;
    let mut in_drawdown = false;
    let mut start = 0usize;
    let mut longest = 0usize;

    for (k, eq) in cumulative(pnls).into_iter().enumerate() {
        if eq > peak {
            peak = eq;
            in_drawdown = false;
        }
        let depth = peak - eq;
        if depth > max_depth {
            max_depth = depth;
            in_drawdown = true;
            start = k;
        }
        if in_drawdown && eq >= peak - EPSILON {
            longest = longest.max(k - start);
            in_drawdown = false;
        }
    }
    longest
}

/// Largest peak-to-trough drop of an equity curve, as a positive pnl amount.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        max_dd = max_dd.max(peak - eq);
    }
    max_dd
}

// ─── Helpers ────────────────────────────────────────────────────────

fn cumulative(pnls: &[f64]) -> Vec<f64> {
    pnls.iter()
        .scan(0.0, |acc, &p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean_f64(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn trades(pnls: &[f64]) -> Vec<Trade> {
        pnls.iter()
            .enumerate()
            .map(|(i, &pnl)| Trade {
                signal_tick: i * 10,
                entry_tick: i * 10 + 1,
                exit_tick: i * 10 + 2,
                direction: Direction::Long,
                pnl,
            })
            .collect()
    }

    #[test]
    fn empty_list_is_neutral() {
        let r = SimulationResult::empty();
        assert_eq!(r.trade_count, 0);
        assert_eq!(r.total_pnl, 0.0);
        assert_eq!(r.false_signal_rate, 0.0);
        assert_eq!(r.sharpe_like, 0.0);
        assert_eq!(r.drawdown_recovery_ticks, 0);
        assert_eq!(r.max_drawdown, 0.0);
        assert_eq!(r.equity, vec![0.0]);
    }

    #[test]
    fn single_trade_reports_flat_equity() {
        let r = SimulationResult::from_trades(trades(&[1.5]));
        assert_eq!(r.trade_count, 1);
        assert_eq!(r.total_pnl, 1.5);
        assert_eq!(r.sharpe_like, 0.0);
        assert_eq!(r.equity, vec![0.0]);
    }

    #[test]
    fn false_signal_rate_counts_losers() {
        assert_eq!(false_signal_rate(&[1.0, -1.0, 0.0, -0.5]), 0.5);
    }

    #[test]
    fn sharpe_uses_population_std() {
        // mean 2, population std 1
        let s = sharpe_like(&[1.0, 3.0]);
        assert!((s - 2.0).abs() < 1e-9);
    }

    #[test]
    fn constant_pnls_do_not_divide_by_zero() {
        let s = sharpe_like(&[0.5, 0.5, 0.5]);
        assert!(s.is_finite());
        assert!(s > 1e9);
    }

    #[test]
    fn equity_is_cumulative() {
        assert_eq!(equity_curve(&[1.0, -2.0, 3.0]), vec![1.0, -1.0, 2.0]);
    }

    #[test]
    fn recovery_measured_from_deepest_point() {
        // cumulative: 1, 0, -1, 0.5, 1, 2
        // peak 1 at k=0, deepest at k=2, back to peak at k=4 → 2
        let pnls = [1.0, -1.0, -1.0, 1.5, 0.5, 1.0];
        assert_eq!(drawdown_recovery_ticks(&pnls), 2);
    }

    #[test]
    fn overshooting_the_peak_is_not_a_recovery() {
        // cumulative: 1, -1, 3; jumps straight past the old peak
        assert_eq!(drawdown_recovery_ticks(&[1.0, -2.0, 4.0]), 0);
        // cumulative: 0.3, -0.4, 0.01, 0.61
        assert_eq!(drawdown_recovery_ticks(&[0.3, -0.7, 0.41, 0.6]), 0);
    }

    #[test]
    fn exact_return_to_peak_is_a_recovery() {
        // cumulative: 1, 0, 1
        assert_eq!(drawdown_recovery_ticks(&[1.0, -1.0, 1.0]), 1);
    }

    #[test]
    fn unrecovered_drawdown_reports_zero() {
        assert_eq!(drawdown_recovery_ticks(&[1.0, -3.0, 0.5]), 0);
    }

    #[test]
    fn monotone_equity_never_draws_down() {
        assert_eq!(drawdown_recovery_ticks(&[0.1, 0.2, 0.3]), 0);
        assert_eq!(max_drawdown(&equity_curve(&[0.1, 0.2, 0.3])), 0.0);
    }

    #[test]
    fn max_drawdown_is_peak_to_trough() {
        assert!((max_drawdown(&[1.0, 3.0, 0.5, 2.0]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn artifact_field_names() {
        let r = SimulationResult::from_trades(trades(&[1.0, -0.5]));
        let json = serde_json::to_value(&r).unwrap();
        for key in [
            "total_pnl",
            "trades",
            "fsr",
            "sharpe_like",
            "dd_recovery_ticks",
            "equity",
            "trades_detail",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["trades"], 2);
    }
}
