//! Test and helper mocks for fuzzyof_core

use fuzzyof_traits::{DutyCycleSource, DutyCycleTicks};

/// A duty-cycle source that always errors on read; useful for mains-powered
/// nodes and for `EtxOf`-style setups that never consult the energy model.
pub struct NoopDutyCycle;

impl DutyCycleSource for NoopDutyCycle {
    fn ticks_per_second(&self) -> u32 {
        1
    }

    fn read(&mut self) -> Result<DutyCycleTicks, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop duty-cycle source")))
    }
}
