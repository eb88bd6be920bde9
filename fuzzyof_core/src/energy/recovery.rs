//! Diffusion-limited battery model with charge recovery.
//!
//! Besides the charge actually drawn (`S`), a load leaves part of the
//! remaining capacity temporarily unavailable. That penalty is the sum of the
//! first `modes` diffusion terms `U_m`, each of which relaxes with rate
//! `β²m²`. Under constant current `q/Δ` over an interval of length `Δ`:
//!
//! ```text
//! U_m ← U_m·e^{−β²m²Δ} + 2q·(1 − e^{−β²m²Δ}) / (β²m²Δ)
//! ```
//!
//! so heavy bursts cost more than their drawn charge, and idle intervals
//! (`q = 0`) hand part of that cost back.

use super::DischargeModel;
use crate::util::MILLIS_PER_MIN;

#[derive(Debug, Clone)]
pub struct Recovery {
    beta_sq_per_min: f64,
    drawn: u64,
    unavailable: Vec<f64>,
}

impl Recovery {
    pub const DEFAULT_BETA_SQ_PER_MIN: f64 = 1.0;
    pub const DEFAULT_MODES: u8 = 10;

    pub fn new(beta_sq_per_min: f64, modes: u8) -> Self {
        let beta = if beta_sq_per_min.is_finite() && beta_sq_per_min > 0.0 {
            beta_sq_per_min
        } else {
            Self::DEFAULT_BETA_SQ_PER_MIN
        };
        Self {
            beta_sq_per_min: beta,
            drawn: 0,
            unavailable: vec![0.0; usize::from(modes.max(1))],
        }
    }

    pub fn drawn(&self) -> u64 {
        self.drawn
    }

    /// Transient penalty `Σ U_m`, rounded up to whole units.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn unavailable(&self) -> u64 {
        let u: f64 = self.unavailable.iter().sum();
        if u <= 0.0 {
            0
        } else if u >= u64::MAX as f64 {
            u64::MAX
        } else {
            u.ceil() as u64
        }
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BETA_SQ_PER_MIN, Self::DEFAULT_MODES)
    }
}

impl DischargeModel for Recovery {
    #[allow(clippy::cast_precision_loss)]
    fn consume(&mut self, drawn: u64, elapsed_ms: u64) {
        self.drawn = self.drawn.saturating_add(drawn);
        let q = drawn as f64;
        let delta_min = elapsed_ms as f64 / MILLIS_PER_MIN as f64;
        for (i, u) in self.unavailable.iter_mut().enumerate() {
            let m = (i + 1) as f64;
            let x = self.beta_sq_per_min * m * m * delta_min;
            if x <= f64::EPSILON {
                // zero-length interval: the whole draw lands as penalty
                *u += 2.0 * q;
                continue;
            }
            let decay = (-x).exp();
            *u = *u * decay + 2.0 * q * (1.0 - decay) / x;
        }
    }

    fn used(&self) -> u64 {
        self.drawn.saturating_add(self.unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_interval_recovers_capacity() {
        let mut m = Recovery::default();
        m.consume(1_000_000, 60_000);
        let after_burst = m.used();
        assert!(after_burst > 1_000_000);
        m.consume(0, 60_000);
        let after_rest = m.used();
        assert!(after_rest < after_burst);
        assert!(after_rest >= 1_000_000);
    }

    #[test]
    fn constant_load_never_gives_charge_back() {
        let mut m = Recovery::default();
        let mut prev = m.used();
        for _ in 0..50 {
            m.consume(10_000, 30_000);
            let now = m.used();
            assert!(now >= prev);
            prev = now;
        }
    }

    #[test]
    fn long_rest_converges_to_drawn_charge() {
        let mut m = Recovery::default();
        m.consume(5_000, 1_000);
        for _ in 0..100 {
            m.consume(0, 600_000);
        }
        assert_eq!(m.used(), 5_000);
    }

    #[test]
    fn invalid_beta_falls_back_to_default() {
        let m = Recovery::new(f64::NAN, 0);
        assert_eq!(m.beta_sq_per_min, Recovery::DEFAULT_BETA_SQ_PER_MIN);
        assert_eq!(m.unavailable.len(), 1);
    }
}
