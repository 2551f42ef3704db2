//! Persistence validator: price must stay above its running mean.
//!
//! Keeps an exponentially smoothed mean (lazy-initialized to the first price)
//! and counts consecutive ticks where `price - mean > z`, measured against the
//! mean before this tick's update. Triggers once the count reaches `hold`.

use super::Validator;

#[derive(Debug, Clone)]
pub struct PersistenceValidator {
    hold: usize,
    mean_alpha: f64,
    z: f64,
    mean: Option<f64>,
    count: usize,
}

impl PersistenceValidator {
    pub fn new(hold: usize, mean_alpha: f64, z: f64) -> Self {
        assert!(hold >= 1, "hold must be >= 1");
        assert!(
            mean_alpha > 0.0 && mean_alpha <= 1.0,
            "mean_alpha must be in (0, 1]"
        );
        Self {
            hold,
            mean_alpha,
            z,
            mean: None,
            count: 0,
        }
    }

    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    pub fn consecutive(&self) -> usize {
        self.count
    }
}

impl Validator for PersistenceValidator {
    fn name(&self) -> &str {
        "Persistence"
    }

    fn step(&mut self, price: f64) -> bool {
        let Some(mean) = self.mean else {
            self.mean = Some(price);
            return false;
        };

        let delta = price - mean;
        self.mean = Some(mean + self.mean_alpha * delta);

        if delta > self.z {
            self.count += 1;
        } else {
            self.count = 0;
        }
        self.count >= self.hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_initializes_mean() {
        let mut v = PersistenceValidator::new(3, 0.05, 0.2);
        assert!(!v.step(99.5));
        assert_eq!(v.mean(), Some(99.5));
        assert_eq!(v.consecutive(), 0);
    }

    #[test]
    fn rising_prices_trigger_on_third_tick_after_warmup() {
        let mut v = PersistenceValidator::new(3, 0.05, 0.0);
        let out: Vec<bool> = (0..6).map(|i| v.step(100.0 + i as f64)).collect();
        assert_eq!(out, vec![false, false, false, true, true, true]);
    }

    #[test]
    fn dip_resets_counter() {
        let mut v = PersistenceValidator::new(2, 0.05, 0.0);
        v.step(100.0);
        assert!(!v.step(101.0));
        assert!(v.step(102.0));
        assert!(!v.step(90.0));
        assert_eq!(v.consecutive(), 0);
    }

    #[test]
    fn threshold_is_strict() {
        let mut v = PersistenceValidator::new(1, 0.05, 1.0);
        v.step(100.0);
        // delta == z is not enough
        assert!(!v.step(101.0));
    }
}
