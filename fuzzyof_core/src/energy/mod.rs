//! Battery discharge estimation from duty-cycle counters.
//!
//! `EnergyModel` reads the CPU/LPM/TX/LISTEN counters of a
//! `DutyCycleSource`, converts the per-interval residency into drawn charge
//! and hands it to a `DischargeModel`, which decides how much of the rated
//! capacity is still available. The result is published as a charge level on
//! the 0..=255 scale used by the energy metric object.
//!
//! Charge is counted in 1/10 000 mA·ms so that the per-state currents stay
//! integral.

mod linear;
mod recovery;

pub use linear::Linear;
pub use recovery::Recovery;

use fuzzyof_traits::{DutyCycleSource, DutyCycleTicks};

use crate::config::{CounterMode, CurrentDraw, DischargeKind, EnergyCfg};
use crate::fixed_point::scaled_split;
use crate::types::MAX_ENERGY;
use crate::util::ticks_to_ms;

/// Fractional resolution of the charge level.
pub const FRACTION_SCALE: u16 = 10_000;

/// Residency of one update interval, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Residency {
    pub cpu_ms: u64,
    pub lpm_ms: u64,
    pub transmit_ms: u64,
    pub listen_ms: u64,
}

impl Residency {
    /// Wall time covered by the interval (CPU active + CPU sleeping).
    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.cpu_ms.saturating_add(self.lpm_ms)
    }

    /// Charge drawn over the interval, in 1/10 000 mA·ms.
    pub fn drawn(&self, currents: &CurrentDraw) -> u64 {
        [
            (self.cpu_ms, currents.cpu),
            (self.lpm_ms, currents.lpm),
            (self.transmit_ms, currents.transmit),
            (self.listen_ms, currents.listen),
        ]
        .iter()
        .fold(0u64, |acc, &(ms, i)| {
            acc.saturating_add(ms.saturating_mul(u64::from(i)))
        })
    }
}

/// How drawn charge translates into charge that is no longer available.
pub trait DischargeModel {
    /// Account for `drawn` charge spread over `elapsed_ms`.
    fn consume(&mut self, drawn: u64, elapsed_ms: u64);

    /// Charge currently unavailable (drawn plus any transient penalty).
    fn used(&self) -> u64;
}

/// Strategy chosen at construction from `DischargeKind`.
#[derive(Debug, Clone)]
pub enum Discharge {
    Linear(Linear),
    Recovery(Recovery),
}

impl From<DischargeKind> for Discharge {
    fn from(kind: DischargeKind) -> Self {
        match kind {
            DischargeKind::Linear => Discharge::Linear(Linear::default()),
            DischargeKind::Recovery {
                beta_sq_per_min,
                modes,
            } => Discharge::Recovery(Recovery::new(beta_sq_per_min, modes)),
        }
    }
}

impl DischargeModel for Discharge {
    fn consume(&mut self, drawn: u64, elapsed_ms: u64) {
        match self {
            Discharge::Linear(m) => m.consume(drawn, elapsed_ms),
            Discharge::Recovery(m) => m.consume(drawn, elapsed_ms),
        }
    }

    fn used(&self) -> u64 {
        match self {
            Discharge::Linear(m) => m.used(),
            Discharge::Recovery(m) => m.used(),
        }
    }
}

pub struct EnergyModel<D: DutyCycleSource> {
    source: D,
    cfg: EnergyCfg,
    rated: u64,
    last: DutyCycleTicks,
    discharge: Discharge,
    charge: u8,
    fraction: u16,
    mains: bool,
}

impl<D: DutyCycleSource> core::fmt::Debug for EnergyModel<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EnergyModel")
            .field("charge", &self.charge)
            .field("fraction", &self.fraction)
            .field("mains", &self.mains)
            .field("discharge", &self.discharge)
            .finish_non_exhaustive()
    }
}

impl<D: DutyCycleSource> EnergyModel<D> {
    pub fn new(source: D, cfg: EnergyCfg) -> Self {
        let rated = cfg.rated_charge();
        let discharge = Discharge::from(cfg.discharge);
        let mains = cfg.mains_powered;
        Self {
            source,
            cfg,
            rated,
            last: DutyCycleTicks::default(),
            discharge,
            charge: MAX_ENERGY,
            fraction: 0,
            mains,
        }
    }

    /// Charge level, 0..=255.
    #[inline]
    pub fn charge(&self) -> u8 {
        self.charge
    }

    /// Sub-level remainder of the charge, 0..=9999.
    #[inline]
    pub fn fraction(&self) -> u16 {
        self.fraction
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        !self.mains && self.remaining() == 0
    }

    #[inline]
    pub fn is_mains_powered(&self) -> bool {
        self.mains
    }

    /// Remaining available charge in 1/10 000 mA·ms.
    pub fn remaining(&self) -> u64 {
        self.rated.saturating_sub(self.discharge.used())
    }

    pub fn rated(&self) -> u64 {
        self.rated
    }

    pub fn cfg(&self) -> &EnergyCfg {
        &self.cfg
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    /// Switch between mains and battery supply.
    ///
    /// On mains the level is pinned at 255. Going back to battery publishes
    /// the battery estimate again without reading the counters.
    pub fn set_mains_powered(&mut self, on: bool) {
        if self.mains == on {
            return;
        }
        self.mains = on;
        tracing::info!(mains = on, "power supply changed");
        if on {
            self.charge = MAX_ENERGY;
            self.fraction = 0;
        } else {
            self.publish();
        }
    }

    /// Read the counters and refresh the charge estimate.
    pub fn update(&mut self) {
        if self.mains {
            self.charge = MAX_ENERGY;
            self.fraction = 0;
            return;
        }
        let ticks = match self.source.read() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "duty-cycle counter read failed; keeping estimate");
                return;
            }
        };
        let delta = match self.cfg.counter_mode {
            CounterMode::Cumulative => {
                let d = DutyCycleTicks {
                    cpu: ticks.cpu.wrapping_sub(self.last.cpu),
                    lpm: ticks.lpm.wrapping_sub(self.last.lpm),
                    transmit: ticks.transmit.wrapping_sub(self.last.transmit),
                    listen: ticks.listen.wrapping_sub(self.last.listen),
                };
                self.last = ticks;
                d
            }
            CounterMode::ResetOnRead => ticks,
        };

        let residency = self.residency(delta);
        let drawn = residency.drawn(&self.cfg.currents);
        self.discharge.consume(drawn, residency.elapsed_ms());
        self.publish();
        tracing::debug!(
            cpu_ms = residency.cpu_ms,
            lpm_ms = residency.lpm_ms,
            tx_ms = residency.transmit_ms,
            listen_ms = residency.listen_ms,
            drawn,
            remaining = self.remaining(),
            charge = self.charge,
            fraction = self.fraction,
            "energy estimate updated"
        );
    }

    /// Convert a tick delta into milliseconds, clamping the LPM glitch.
    fn residency(&self, delta: DutyCycleTicks) -> Residency {
        let tps = self.source.ticks_per_second();
        let mut r = Residency {
            cpu_ms: ticks_to_ms(delta.cpu, tps),
            lpm_ms: ticks_to_ms(delta.lpm, tps),
            transmit_ms: ticks_to_ms(delta.transmit, tps),
            listen_ms: ticks_to_ms(delta.listen, tps),
        };
        let period = self.cfg.period_ms;
        if r.lpm_ms > period.saturating_add(period / 10) {
            let clamped = period
                .saturating_sub(r.cpu_ms)
                .saturating_sub(r.transmit_ms)
                .saturating_sub(r.listen_ms);
            tracing::debug!(lpm_ms = r.lpm_ms, clamped, period, "LPM counter glitch clamped");
            r.lpm_ms = clamped;
        }
        r
    }

    fn publish(&mut self) {
        let (charge, fraction) = scaled_split(
            self.remaining(),
            self.rated,
            u64::from(MAX_ENERGY),
            u64::from(FRACTION_SCALE),
        );
        self.charge = u8::try_from(charge).unwrap_or(MAX_ENERGY);
        self.fraction = u16::try_from(fraction).unwrap_or(0);
    }
}
