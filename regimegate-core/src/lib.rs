//! RegimeGate Core: validators, trade simulation, metrics, synthetic market.
//!
//! This crate contains everything that runs inside a single regime segment:
//! - Domain types (labeled ticks, regime segments, trades)
//! - Streaming validators (EWMA z-score, volatility gate, persistence) and the
//!   confirmation wrapper
//! - The factory mapping a validator kind name plus parameters to a validator
//! - The latency/cost/rate-limited trade simulator
//! - Per-run metrics
//! - A seeded regime-labeled synthetic market

pub mod domain;
pub mod market;
pub mod metrics;
pub mod rng;
pub mod simulator;
pub mod validator;

/// Numerical floor added to variance and standard-deviation denominators.
pub const EPSILON: f64 = 1e-12;

/// Lower bound applied to a previous price before it is used as a divisor.
pub const PRICE_FLOOR: f64 = 1e-9;
