//! Confirmation wrapper: N consecutive inner triggers before acting.

use super::Validator;

/// Decorates any validator with its own consecutive-trigger counter.
///
/// The inner validator sees every tick. `confirm = 1` is behaviorally
/// identical to the bare inner validator.
#[derive(Debug, Clone)]
pub struct ConfirmWrapper<V> {
    inner: V,
    confirm: usize,
    count: usize,
}

impl<V: Validator> ConfirmWrapper<V> {
    pub fn new(inner: V, confirm: usize) -> Self {
        assert!(confirm >= 1, "confirm must be >= 1");
        Self {
            inner,
            confirm,
            count: 0,
        }
    }

    pub fn inner(&self) -> &V {
        &self.inner
    }

    pub fn confirm(&self) -> usize {
        self.confirm
    }

    pub fn into_inner(self) -> V {
        self.inner
    }
}

impl<V: Validator> Validator for ConfirmWrapper<V> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn step(&mut self, price: f64) -> bool {
        if self.inner.step(price) {
            self.count += 1;
        } else {
            self.count = 0;
        }
        self.count >= self.confirm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::PersistenceValidator;

    /// Replays a fixed trigger pattern.
    struct Scripted {
        pattern: Vec<bool>,
        pos: usize,
    }

    impl Validator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn step(&mut self, _price: f64) -> bool {
            let out = self.pattern[self.pos % self.pattern.len()];
            self.pos += 1;
            out
        }
    }

    fn scripted(pattern: &[bool]) -> Scripted {
        Scripted {
            pattern: pattern.to_vec(),
            pos: 0,
        }
    }

    #[test]
    fn requires_consecutive_triggers() {
        let pattern = [true, true, false, true, true, true, false];
        let mut w = ConfirmWrapper::new(scripted(&pattern), 2);
        let out: Vec<bool> = (0..pattern.len()).map(|_| w.step(1.0)).collect();
        assert_eq!(out, vec![false, true, false, false, true, true, false]);
    }

    #[test]
    fn confirm_one_is_transparent() {
        let prices: Vec<f64> = (0..200).map(|i| 100.0 + (i as f64 * 0.3).sin() * 2.0).collect();
        let mut bare = PersistenceValidator::new(2, 0.1, 0.1);
        let mut wrapped = ConfirmWrapper::new(PersistenceValidator::new(2, 0.1, 0.1), 1);
        for &p in &prices {
            assert_eq!(bare.step(p), wrapped.step(p));
        }
    }

    #[test]
    fn inner_sees_every_tick() {
        let mut w = ConfirmWrapper::new(scripted(&[false]), 3);
        for _ in 0..10 {
            w.step(1.0);
        }
        assert_eq!(w.into_inner().pos, 10);
    }

    #[test]
    fn name_comes_from_inner() {
        let w = ConfirmWrapper::new(PersistenceValidator::new(2, 0.1, 0.1), 2);
        assert_eq!(w.name(), "Persistence");
        assert_eq!(w.confirm(), 2);
    }
}
