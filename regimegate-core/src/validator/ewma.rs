//! EWMA z-score validator.
//!
//! Recursive update on each price `x` after the first:
//! `delta = x - mean; mean += alpha * delta; var = (1 - alpha) * (var + alpha * delta²)`.
//! Triggers when `|x - mean| / sqrt(var + 1e-12)` exceeds the enter threshold.
//! With hysteresis, an active signal stays on while the z-score exceeds the
//! (lower) exit threshold.

use super::Validator;
use crate::EPSILON;

#[derive(Debug, Clone)]
pub struct EwmaValidator {
    alpha: f64,
    z_enter: f64,
    z_exit: f64,
    mean: Option<f64>,
    var: f64,
    in_signal: bool,
}

impl EwmaValidator {
    /// Single-threshold variant: enter and exit at `threshold`.
    pub fn new(alpha: f64, threshold: f64) -> Self {
        Self::with_hysteresis(alpha, threshold, threshold)
    }

    pub fn with_hysteresis(alpha: f64, z_enter: f64, z_exit: f64) -> Self {
        assert!(alpha > 0.0 && alpha < 1.0, "alpha must be in (0, 1)");
        assert!(z_enter > 0.0, "z_enter must be > 0");
        assert!(z_exit > 0.0 && z_exit <= z_enter, "z_exit must be in (0, z_enter]");
        Self {
            alpha,
            z_enter,
            z_exit,
            mean: None,
            var: 1.0,
            in_signal: false,
        }
    }

    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.var
    }

    pub fn in_signal(&self) -> bool {
        self.in_signal
    }
}

impl Validator for EwmaValidator {
    fn name(&self) -> &str {
        "EWMA"
    }

    fn step(&mut self, price: f64) -> bool {
        let Some(prev_mean) = self.mean else {
            self.mean = Some(price);
            return false;
        };

        let delta = price - prev_mean;
        let mean = prev_mean + self.alpha * delta;
        self.var = (1.0 - self.alpha) * (self.var + self.alpha * delta * delta);
        self.mean = Some(mean);

        let std = (self.var + EPSILON).sqrt();
        let z = (price - mean).abs() / std;

        let threshold = if self.in_signal {
            self.z_exit
        } else {
            self.z_enter
        };
        self.in_signal = z > threshold;
        self.in_signal
    }
}
