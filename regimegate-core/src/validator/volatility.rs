//! Volatility validator: trades only when recent return volatility is low.
//!
//! This is a calm-regime gate, not a danger alarm: it triggers when the
//! population standard deviation of the buffered returns is strictly *below*
//! `max_vol`.

use std::collections::VecDeque;

use super::Validator;
use crate::PRICE_FLOOR;

/// Returns needed in the buffer before the validator may trigger.
pub const MIN_RETURNS: usize = 5;

/// Largest buffer allocated up front; longer windows grow on demand.
const PREALLOC_RETURNS: usize = 1024;

#[derive(Debug, Clone)]
pub struct VolatilityValidator {
    window: usize,
    max_vol: f64,
    prev: Option<f64>,
    returns: VecDeque<f64>,
}

impl VolatilityValidator {
    pub fn new(window: usize, max_vol: f64) -> Self {
        assert!(window >= 1, "window must be >= 1");
        assert!(max_vol >= 0.0, "max_vol must be >= 0");
        Self {
            window,
            max_vol,
            prev: None,
            returns: VecDeque::with_capacity(window.min(PREALLOC_RETURNS) + 1),
        }
    }

    pub fn last_price(&self) -> Option<f64> {
        self.prev
    }

    pub fn buffered_returns(&self) -> usize {
        self.returns.len()
    }

    /// Population standard deviation of the buffered returns.
    pub fn current_vol(&self) -> f64 {
        let n = self.returns.len();
        if n == 0 {
            return 0.0;
        }
        let mean = self.returns.iter().sum::<f64>() / n as f64;
        let var = self.returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64;
        var.sqrt()
    }
}

impl Validator for VolatilityValidator {
    fn name(&self) -> &str {
        "Volatility"
    }

    fn step(&mut self, price: f64) -> bool {
        let Some(prev) = self.prev.replace(price) else {
            return false;
        };

        self.returns.push_back((price - prev) / prev.max(PRICE_FLOOR));
        if self.returns.len() > self.window {
            self.returns.pop_front();
        }

        if self.returns.len() < MIN_RETURNS {
            return false;
        }
        self.current_vol() < self.max_vol
    }
}
