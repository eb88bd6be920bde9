//! Collaborator seams for the objective-function engine.
//!
//! The engine never talks to the clock subsystem, the energest counters or the
//! fuzzy rule base directly; it goes through these traits so that devices,
//! simulators and tests can plug in their own sources.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Cumulative (or reset-on-read) duty-cycle counters in device clock ticks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycleTicks {
    /// CPU active.
    pub cpu: u32,
    /// CPU in low-power mode.
    pub lpm: u32,
    /// Radio transmitting.
    pub transmit: u32,
    /// Radio listening.
    pub listen: u32,
}

pub trait DutyCycleSource {
    /// Resolution of the counters.
    fn ticks_per_second(&self) -> u32;

    /// Flush and read the four counters.
    fn read(&mut self) -> Result<DutyCycleTicks, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: DutyCycleSource + ?Sized> DutyCycleSource for Box<T> {
    fn ticks_per_second(&self) -> u32 {
        (**self).ticks_per_second()
    }

    fn read(&mut self) -> Result<DutyCycleTicks, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}

/// Input/output contract of the fuzzy inference system.
///
/// Both functions must be pure and deterministic and return a score in
/// `0..=100`.
pub trait FuzzyScorer {
    /// Aggregate path ETX (whole transmissions), latency (ms) and hop count
    /// into a QoS score. Non-increasing in every input past its acceptable range.
    fn qos(&self, etx_hops: u16, latency_ms: u16, hopcount: u16) -> u8;

    /// Fold the residual energy (`0..=255`) into a QoS score.
    /// Non-decreasing in `energy`.
    fn quality(&self, qos: u8, energy: u8) -> u8;
}

impl<T: FuzzyScorer + ?Sized> FuzzyScorer for Box<T> {
    fn qos(&self, etx_hops: u16, latency_ms: u16, hopcount: u16) -> u8 {
        (**self).qos(etx_hops, latency_ms, hopcount)
    }

    fn quality(&self, qos: u8, energy: u8) -> u8 {
        (**self).quality(qos, energy)
    }
}

impl<T: FuzzyScorer + ?Sized> FuzzyScorer for &T {
    fn qos(&self, etx_hops: u16, latency_ms: u16, hopcount: u16) -> u8 {
        (**self).qos(etx_hops, latency_ms, hopcount)
    }

    fn quality(&self, qos: u8, energy: u8) -> u8 {
        (**self).quality(qos, energy)
    }
}
