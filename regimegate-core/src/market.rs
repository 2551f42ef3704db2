//! Synthetic market: regime-labeled price series for offline evaluation.
//!
//! Three regimes in sequence, each a geometric Brownian motion continuing from
//! the previous regime's last price:
//! - `calm_trend`: low volatility, upward drift
//! - `volatile`: sideways, high volatility
//! - `jumpy`: moderate volatility with rare discrete jumps
//!
//! Lengths are `n/3`, `n/3` and the remainder. Each regime draws from its own
//! stream of the seeded [`RngHierarchy`], so a run is a pure function of
//! `(n, seed)`. The generator makes no claim to statistical realism.

use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::domain::LabeledTick;
use crate::rng::RngHierarchy;

pub const CALM_TREND: &str = "calm_trend";
pub const VOLATILE: &str = "volatile";
pub const JUMPY: &str = "jumpy";

/// Starting price of the first regime.
pub const INITIAL_PRICE: f64 = 100.0;

const JUMP_SIZES: [f64; 5] = [0.0, 0.02, -0.02, 0.04, -0.04];
const JUMP_WEIGHTS: [f64; 5] = [0.94, 0.02, 0.02, 0.01, 0.01];

struct RegimeShape {
    label: &'static str,
    mu: f64,
    sigma: f64,
    jumps: bool,
}

const REGIMES: [RegimeShape; 3] = [
    RegimeShape {
        label: CALM_TREND,
        mu: 0.002,
        sigma: 0.005,
        jumps: false,
    },
    RegimeShape {
        label: VOLATILE,
        mu: 0.0,
        sigma: 0.02,
        jumps: false,
    },
    RegimeShape {
        label: JUMPY,
        mu: 0.0,
        sigma: 0.015,
        jumps: true,
    },
];

/// Generate `n` labeled ticks from `seed`.
pub fn labeled_scenarios(n: usize, seed: u64) -> Vec<LabeledTick> {
    let hierarchy = RngHierarchy::new(seed);
    let lengths = [n / 3, n / 3, n - 2 * (n / 3)];

    let mut ticks = Vec::with_capacity(n);
    let mut s0 = INITIAL_PRICE;

    for (shape, len) in REGIMES.iter().zip(lengths) {
        if len == 0 {
            continue;
        }
        let mut rng = hierarchy.rng_for(shape.label, 0);
        let mut path = gbm(&mut rng, len, s0, shape.mu, shape.sigma);
        if shape.jumps {
            apply_jumps(&mut rng, &mut path);
        }
        s0 = path[len - 1];
        ticks.extend(path.into_iter().map(|p| LabeledTick::new(p, shape.label)));
    }
    ticks
}

/// Geometric Brownian motion with unit time step: `s0 * exp(cumsum(r))`,
/// `r ~ N(mu - sigma²/2, sigma)`.
fn gbm<R: Rng>(rng: &mut R, n: usize, s0: f64, mu: f64, sigma: f64) -> Vec<f64> {
    let drift = mu - 0.5 * sigma * sigma;
    let mut log_price = 0.0_f64;
    (0..n)
        .map(|_| {
            let z: f64 = StandardNormal.sample(&mut *rng);
            log_price += drift + sigma * z;
            s0 * log_price.exp()
        })
        .collect()
}

/// Multiply the path by the cumulative product of `1 + jump`.
fn apply_jumps<R: Rng>(rng: &mut R, path: &mut [f64]) {
    let dist = WeightedIndex::new(JUMP_WEIGHTS).expect("static jump weights are valid");
    let mut factor = 1.0_f64;
    for price in path.iter_mut() {
        factor *= 1.0 + JUMP_SIZES[dist.sample(&mut *rng)];
        *price *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::split_segments;

    #[test]
    fn same_seed_same_series() {
        assert_eq!(labeled_scenarios(900, 123), labeled_scenarios(900, 123));
    }

    #[test]
    fn different_seed_different_series() {
        assert_ne!(labeled_scenarios(300, 1), labeled_scenarios(300, 2));
    }

    #[test]
    fn regimes_in_order_with_expected_lengths() {
        let ticks = labeled_scenarios(1000, 7);
        assert_eq!(ticks.len(), 1000);
        let segs = split_segments(&ticks);
        let shape: Vec<(&str, usize)> = segs.iter().map(|s| (s.regime.as_str(), s.len())).collect();
        assert_eq!(shape, vec![(CALM_TREND, 333), (VOLATILE, 333), (JUMPY, 334)]);
    }

    #[test]
    fn prices_stay_positive() {
        assert!(labeled_scenarios(3000, 99).iter().all(|t| t.price > 0.0));
    }

    #[test]
    fn tiny_series_skips_empty_regimes() {
        let ticks = labeled_scenarios(2, 5);
        assert_eq!(ticks.len(), 2);
        assert!(ticks.iter().all(|t| t.regime == JUMPY));
        assert!(labeled_scenarios(0, 5).is_empty());
    }

    #[test]
    fn first_price_near_initial() {
        let ticks = labeled_scenarios(30, 11);
        assert!((ticks[0].price / INITIAL_PRICE - 1.0).abs() < 0.05);
    }
}
