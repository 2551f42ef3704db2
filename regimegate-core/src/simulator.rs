//! Trade execution simulator: turns a validator's trigger stream into trades.
//!
//! Per tick `i`:
//! 1. At the start of every 100-tick block the rolling trade counter resets.
//! 2. While spacing (`min_interval_ticks`) or the per-block cap
//!    (`max_trades_per_100`) forbids a trade, the validator is still stepped
//!    and its answer discarded.
//! 3. Otherwise a trigger places a trade: entry after `latency_ticks`, exit one
//!    tick after entry, both clamped to the last tick.
//!
//! Trade direction is read from the price move between the signal tick and the
//! entry tick. The trade only realizes the move between entry and exit, so the
//! direction is known one step before it would be causally available; this is
//! the simulated trading model and is kept as is.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::{Direction, Trade};
use crate::metrics::SimulationResult;
use crate::validator::Validator;

/// Length of the rate-limiting block, in ticks.
pub const BLOCK_TICKS: usize = 100;

/// Execution constraints for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    pub latency_ticks: usize,
    pub cost_bps: f64,
    pub slip_bps: f64,
    pub position: f64,
    pub min_interval_ticks: usize,
    pub max_trades_per_100: usize,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            latency_ticks: 1,
            cost_bps: 0.5,
            slip_bps: 0.3,
            position: 1.0,
            min_interval_ticks: 5,
            max_trades_per_100: 15,
        }
    }
}

impl SimParams {
    /// Round-trip cost and slippage as a fraction of notional.
    pub fn bps_factor(&self) -> f64 {
        (self.cost_bps + self.slip_bps) * 1e-4 * 2.0
    }
}

/// Run `validator` over `prices` and record the resulting trades.
///
/// The validator is stepped exactly once per tick regardless of rate limiting.
pub fn simulate<V: Validator + ?Sized>(
    prices: &[f64],
    validator: &mut V,
    params: &SimParams,
) -> SimulationResult {
    if prices.is_empty() {
        return SimulationResult::empty();
    }

    let last = prices.len() - 1;
    let bps_factor = params.bps_factor();
    let mut trades = Vec::new();
    let mut last_trade: Option<usize> = None;
    let mut block_trades = 0usize;

    for (i, &price) in prices.iter().enumerate() {
        if i % BLOCK_TICKS == 0 {
            block_trades = 0;
        }

        let too_soon = last_trade.is_some_and(|t| i - t < params.min_interval_ticks);
        if too_soon || block_trades >= params.max_trades_per_100 {
            validator.step(price);
            continue;
        }

        if !validator.step(price) {
            continue;
        }

        let entry = (i + params.latency_ticks).min(last);
        let direction = if prices[entry] >= price {
            Direction::Long
        } else {
            Direction::Short
        };
        let exit = (entry + 1).min(last);

        let gross = params.position * (prices[exit] - prices[entry]) * direction.sign();
        let cost = params.position * prices[entry] * bps_factor;
        let trade = Trade {
            signal_tick: i,
            entry_tick: entry,
            exit_tick: exit,
            direction,
            pnl: gross - cost,
        };
        trace!(signal = i, entry, exit, pnl = trade.pnl, "trade placed");

        trades.push(trade);
        last_trade = Some(i);
        block_trades += 1;
    }

    let result = SimulationResult::from_trades(trades);
    debug!(
        validator = validator.name(),
        ticks = prices.len(),
        trades = result.trade_count,
        total_pnl = result.total_pnl,
        "simulation finished"
    );
    result
}
