//! Configuration types for the objective-function engine.
//!
//! These are the runtime configuration structs used by `FuzzyOf` and `EtxOf`.
//! They are separate from the TOML-deserialized config in `fuzzyof_config`.

use crate::types::{ETX_DIVISOR, RPL_MIN_HOPRANKINC};

/// Link estimator configuration (ETX and delay EWMAs, pending pool).
#[derive(Debug, Clone)]
pub struct LinkCfg {
    /// Weight of the old value, out of `EWMA_SCALE`. Range: 0..=99.
    pub alpha: u8,
    /// Upper bound of a link ETX sample, in whole transmissions.
    pub max_link_metric: u16,
    /// Upper bound of delay samples and of the advertised latency (ms).
    pub max_delay_ms: u16,
    /// Delay sample fed to the EWMA when a frame is not acknowledged (ms).
    pub noack_delay_penalty_ms: u16,
    /// Number of in-flight send timestamps kept for delay matching.
    pub pending_capacity: usize,
    /// Age after which an unanswered send timestamp may be evicted (ms).
    pub pending_timeout_ms: u64,
}

impl LinkCfg {
    /// Denominator of `alpha`.
    pub const EWMA_SCALE: u8 = 100;

    /// Largest link ETX on the ×100 scale.
    #[inline]
    pub fn max_etx(&self) -> u16 {
        self.max_link_metric.saturating_mul(ETX_DIVISOR)
    }
}

impl Default for LinkCfg {
    fn default() -> Self {
        Self {
            alpha: 90,
            max_link_metric: 15,
            max_delay_ms: 1000,
            noack_delay_penalty_ms: 50,
            pending_capacity: 8,
            pending_timeout_ms: 10_000,
        }
    }
}

/// Semantics of the duty-cycle counters returned by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterMode {
    /// Counters grow monotonically (wrapping); the model keeps a snapshot.
    #[default]
    Cumulative,
    /// Each read already returns the delta since the previous read.
    ResetOnRead,
}

/// Battery discharge strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DischargeKind {
    /// Remaining charge is rated capacity minus everything drawn.
    #[default]
    Linear,
    /// Diffusion model with a rate-capacity penalty that recovers during idle.
    Recovery {
        /// β² in min⁻¹.
        beta_sq_per_min: f64,
        /// Number of diffusion modes summed (≥ 1).
        modes: u8,
    },
}

/// Current draw per duty-cycle state, in units of 1/10 000 mA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentDraw {
    pub cpu: u32,
    pub lpm: u32,
    pub transmit: u32,
    pub listen: u32,
}

impl Default for CurrentDraw {
    fn default() -> Self {
        Self {
            cpu: 18_000,
            lpm: 545,
            transmit: 177_000,
            listen: 200_000,
        }
    }
}

/// Energy model configuration.
#[derive(Debug, Clone)]
pub struct EnergyCfg {
    /// Battery capacity in mAh.
    pub capacity_mah: u32,
    /// Nominal update period (ms); used by the LPM glitch clamp.
    pub period_ms: u64,
    pub counter_mode: CounterMode,
    pub discharge: DischargeKind,
    pub currents: CurrentDraw,
    /// Run `update()` before the container reads the charge.
    pub refresh_on_read: bool,
    /// Start mains powered (charge pinned at 255).
    pub mains_powered: bool,
}

impl EnergyCfg {
    /// Charge units (1/10 000 mA·ms) per mAh.
    pub const UNITS_PER_MAH: u64 = 36_000_000_000;

    /// Rated battery charge in 1/10 000 mA·ms.
    #[inline]
    pub fn rated_charge(&self) -> u64 {
        u64::from(self.capacity_mah).saturating_mul(Self::UNITS_PER_MAH)
    }
}

impl Default for EnergyCfg {
    fn default() -> Self {
        Self {
            capacity_mah: 200,
            period_ms: 120_000,
            counter_mode: CounterMode::Cumulative,
            discharge: DischargeKind::Linear,
            currents: CurrentDraw::default(),
            refresh_on_read: false,
            mains_powered: false,
        }
    }
}

/// Rank computation configuration.
#[derive(Debug, Clone)]
pub struct RankCfg {
    /// Divides the quality shortfall when scaling the rank increase.
    pub quality_rank_divisor: u16,
}

impl Default for RankCfg {
    fn default() -> Self {
        Self {
            quality_rank_divisor: 10,
        }
    }
}

/// Which metric orders candidate parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentOrdering {
    /// Rank through the parent; lower wins.
    #[default]
    PathCost,
    /// Fuzzy quality of the parent; higher wins.
    Quality,
}

/// Parent selection configuration.
#[derive(Debug, Clone)]
pub struct SelectionCfg {
    pub ordering: ParentOrdering,
    /// Hysteresis for `PathCost`, in rank units.
    pub path_cost_threshold: u16,
    /// Hysteresis for `Quality`, in quality points.
    pub quality_threshold: u8,
}

impl SelectionCfg {
    /// Threshold matching the configured ordering.
    #[inline]
    pub fn threshold(&self) -> u32 {
        match self.ordering {
            ParentOrdering::PathCost => u32::from(self.path_cost_threshold),
            ParentOrdering::Quality => u32::from(self.quality_threshold),
        }
    }
}

impl Default for SelectionCfg {
    fn default() -> Self {
        Self {
            ordering: ParentOrdering::PathCost,
            path_cost_threshold: RPL_MIN_HOPRANKINC / 2,
            quality_threshold: 2,
        }
    }
}

/// Bounds applied when aggregating the outgoing metric container.
#[derive(Debug, Clone)]
pub struct ContainerCfg {
    pub hopcount_max: u16,
    pub max_delay_ms: u16,
}

impl Default for ContainerCfg {
    fn default() -> Self {
        Self {
            hopcount_max: 255,
            max_delay_ms: 1000,
        }
    }
}

/// Breakpoints and weights of the reference `RampScorer`.
///
/// Each input scores 100 at or below its "good" breakpoint and 0 at or above
/// its "bad" breakpoint, linearly in between.
#[derive(Debug, Clone)]
pub struct ScorerCfg {
    /// Path ETX breakpoints, whole transmissions.
    pub etx_good: u16,
    pub etx_bad: u16,
    pub latency_good_ms: u16,
    pub latency_bad_ms: u16,
    pub hop_good: u16,
    pub hop_bad: u16,
    pub etx_weight: u8,
    pub latency_weight: u8,
    pub hop_weight: u8,
    /// Share of the QoS score kept at zero energy (0..=100).
    pub energy_floor: u8,
}

impl Default for ScorerCfg {
    fn default() -> Self {
        Self {
            etx_good: 1,
            etx_bad: 10,
            latency_good_ms: 100,
            latency_bad_ms: 1000,
            hop_good: 1,
            hop_bad: 15,
            etx_weight: 50,
            latency_weight: 30,
            hop_weight: 20,
            energy_floor: 40,
        }
    }
}

/// Everything `FuzzyOf` needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct OfSettings {
    pub link: LinkCfg,
    pub energy: EnergyCfg,
    pub rank: RankCfg,
    pub selection: SelectionCfg,
    pub container: ContainerCfg,
}
