//! Validators: stateful gating rules over a price stream.
//!
//! Every validator implements one capability: observe the next price, report
//! whether trading is allowed now. State is owned by the instance, initialized
//! lazily on the first observed price and never shared between instances.
//!
//! - `EwmaValidator`: z-score of price against an exponentially weighted mean
//! - `VolatilityValidator`: calm-regime gate on rolling return volatility
//! - `PersistenceValidator`: price held above its running mean for N ticks
//! - `ConfirmWrapper`: requires N consecutive inner triggers

pub mod confirm;
pub mod ewma;
pub mod factory;
pub mod persistence;
pub mod volatility;

pub use confirm::ConfirmWrapper;
pub use ewma::EwmaValidator;
pub use factory::{
    build_confirmed, build_validator, default_params, FactoryError, ValidatorKind, MAX_COUNT,
};
pub use persistence::PersistenceValidator;
pub use volatility::VolatilityValidator;

/// A stateful gating rule.
///
/// `step` must be called exactly once per tick, in tick order, even when the
/// caller intends to ignore the result: validator state advances on every tick
/// it is shown.
pub trait Validator: Send {
    /// Human-readable name (e.g., "EWMA").
    fn name(&self) -> &str;

    /// Observe the next price and report whether the validator triggers.
    fn step(&mut self, price: f64) -> bool;
}

impl<V: Validator + ?Sized> Validator for Box<V> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn step(&mut self, price: f64) -> bool {
        (**self).step(price)
    }
}
