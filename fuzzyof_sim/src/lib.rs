//! Simulated duty-cycle counters.
//!
//! `SimulatedDutyCycle` plays the part of the energest subsystem: time is
//! advanced explicitly through a `SimHandle`, and every read reports the
//! CPU/LPM/TX/LISTEN ticks accumulated for a fixed duty profile. Faults can be
//! injected (failed reads, stale LPM counters) to exercise the energy model's
//! degradation paths.

pub mod error;

use std::cell::RefCell;
use std::rc::Rc;

use fuzzyof_traits::{DutyCycleSource, DutyCycleTicks};

use crate::error::{Result, SimError};

/// Share of wall time per state, in permille.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyProfile {
    /// CPU active; LPM gets the remainder.
    pub cpu_permille: u16,
    pub transmit_permille: u16,
    pub listen_permille: u16,
}

impl DutyProfile {
    pub fn new(cpu_permille: u16, transmit_permille: u16, listen_permille: u16) -> Result<Self> {
        if cpu_permille > 1000 {
            return Err(SimError::InvalidProfile("cpu_permille must be <= 1000"));
        }
        if u32::from(transmit_permille) + u32::from(listen_permille) > 1000 {
            return Err(SimError::InvalidProfile(
                "transmit_permille + listen_permille must be <= 1000",
            ));
        }
        Ok(Self {
            cpu_permille,
            transmit_permille,
            listen_permille,
        })
    }

    #[inline]
    pub fn lpm_permille(&self) -> u16 {
        1000 - self.cpu_permille
    }

    /// Fully idle node: CPU asleep, radio off.
    pub const IDLE: DutyProfile = DutyProfile {
        cpu_permille: 0,
        transmit_permille: 0,
        listen_permille: 0,
    };
}

impl Default for DutyProfile {
    fn default() -> Self {
        Self {
            cpu_permille: 20,
            transmit_permille: 5,
            listen_permille: 15,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    cpu: u64,
    lpm: u64,
    transmit: u64,
    listen: u64,
}

#[derive(Debug)]
struct State {
    profile: DutyProfile,
    ticks_per_second: u32,
    /// Residency accumulated in tick·permille·ms units, converted on read.
    totals: Totals,
    /// Extra LPM ticks folded into the counter by injected glitches.
    lpm_skew: u64,
    last_read: DutyCycleTicks,
    reads: u64,
    glitch_every: u32,
    fail_next: bool,
    reset_on_read: bool,
    elapsed_ms: u64,
}

impl State {
    fn ticks(&self, permille_ms: u64) -> u64 {
        permille_ms * u64::from(self.ticks_per_second) / 1_000_000
    }

    #[allow(clippy::cast_possible_truncation)]
    fn counters(&self) -> DutyCycleTicks {
        // counters are u32 and wrap like the device's
        DutyCycleTicks {
            cpu: self.ticks(self.totals.cpu) as u32,
            lpm: self.ticks(self.totals.lpm).wrapping_add(self.lpm_skew) as u32,
            transmit: self.ticks(self.totals.transmit) as u32,
            listen: self.ticks(self.totals.listen) as u32,
        }
    }
}

/// The duty-cycle source handed to the energy model.
#[derive(Debug)]
pub struct SimulatedDutyCycle {
    state: Rc<RefCell<State>>,
}

/// Control side of a `SimulatedDutyCycle`; clones share the same counters.
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Rc<RefCell<State>>,
}

impl SimulatedDutyCycle {
    pub fn new(profile: DutyProfile, ticks_per_second: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                profile,
                ticks_per_second: ticks_per_second.max(1),
                totals: Totals::default(),
                lpm_skew: 0,
                last_read: DutyCycleTicks::default(),
                reads: 0,
                glitch_every: 0,
                fail_next: false,
                reset_on_read: false,
                elapsed_ms: 0,
            })),
        }
    }

    /// Report deltas since the previous read instead of cumulative counters.
    pub fn with_reset_on_read(self, on: bool) -> Self {
        self.state.borrow_mut().reset_on_read = on;
        self
    }

    /// Every `n`-th read reports an LPM counter inflated by ten times the
    /// LPM time since the previous read (0 disables).
    pub fn with_lpm_glitch_every(self, n: u32) -> Self {
        self.state.borrow_mut().glitch_every = n;
        self
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Rc::clone(&self.state),
        }
    }

    fn read_inner(&self) -> Result<DutyCycleTicks> {
        let mut s = self.state.try_borrow_mut().map_err(|_| SimError::Busy)?;
        if s.fail_next {
            s.fail_next = false;
            return Err(SimError::InjectedFailure);
        }
        s.reads += 1;
        if s.glitch_every > 0 && s.reads % u64::from(s.glitch_every) == 0 {
            let lpm_now = s.counters().lpm;
            let since = u64::from(lpm_now.wrapping_sub(s.last_read.lpm));
            s.lpm_skew = s.lpm_skew.wrapping_add(since.saturating_mul(10));
            tracing::debug!(read = s.reads, extra_ticks = since * 10, "injecting LPM glitch");
        }
        let now = s.counters();
        let out = if s.reset_on_read {
            DutyCycleTicks {
                cpu: now.cpu.wrapping_sub(s.last_read.cpu),
                lpm: now.lpm.wrapping_sub(s.last_read.lpm),
                transmit: now.transmit.wrapping_sub(s.last_read.transmit),
                listen: now.listen.wrapping_sub(s.last_read.listen),
            }
        } else {
            now
        };
        s.last_read = now;
        Ok(out)
    }
}

impl DutyCycleSource for SimulatedDutyCycle {
    fn ticks_per_second(&self) -> u32 {
        self.state.borrow().ticks_per_second
    }

    fn read(&mut self) -> std::result::Result<DutyCycleTicks, Box<dyn std::error::Error + Send + Sync>> {
        self.read_inner().map_err(Into::into)
    }
}

impl SimHandle {
    /// Let `ms` of wall time pass under the current profile.
    pub fn advance(&self, ms: u64) {
        let mut s = self.state.borrow_mut();
        let p = s.profile;
        s.totals.cpu += ms * u64::from(p.cpu_permille);
        s.totals.lpm += ms * u64::from(p.lpm_permille());
        s.totals.transmit += ms * u64::from(p.transmit_permille);
        s.totals.listen += ms * u64::from(p.listen_permille);
        s.elapsed_ms += ms;
    }

    pub fn set_profile(&self, profile: DutyProfile) {
        self.state.borrow_mut().profile = profile;
    }

    pub fn profile(&self) -> DutyProfile {
        self.state.borrow().profile
    }

    /// The next read fails once.
    pub fn fail_next_read(&self) {
        self.state.borrow_mut().fail_next = true;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.state.borrow().elapsed_ms
    }

    pub fn reads(&self) -> u64 {
        self.state.borrow().reads
    }
}
