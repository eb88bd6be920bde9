//! Per-neighbor link quality estimation.
//!
//! `LinkEstimator` folds MAC transmission outcomes into the ETX and delay
//! EWMAs of a parent's `LinkStats`. Delay samples come either from an explicit
//! measurement or from the send timestamp recorded in the pending pool when
//! the frame was queued.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fuzzyof_traits::clock::Clock;

use crate::config::LinkCfg;
use crate::fixed_point::ewma_u16;
use crate::pending::{PendingPool, PushOutcome};
use crate::types::{ETX_DIVISOR, INIT_LINK_METRIC, LinkAddr};
use crate::util::duration_ms;

/// Link metrics of one neighbor: ETX on the ×100 scale and delay in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub etx: u16,
    pub delay_ms: u16,
}

impl Default for LinkStats {
    fn default() -> Self {
        Self {
            etx: INIT_LINK_METRIC * ETX_DIVISOR,
            delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Ok,
    NoAck,
    /// Collision, deferral or any other failure that says nothing about the link.
    Other,
}

/// MAC-level timing of a completed transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacTiming {
    pub tx_start: Instant,
    pub ack_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub status: TxStatus,
    /// Transmissions spent on this frame, retries included.
    pub attempts: u8,
    pub mac_timing: Option<MacTiming>,
    pub measured_delay_ms: Option<u16>,
}

impl TxOutcome {
    pub fn ok(attempts: u8) -> Self {
        Self {
            status: TxStatus::Ok,
            attempts,
            mac_timing: None,
            measured_delay_ms: None,
        }
    }

    pub fn no_ack(attempts: u8) -> Self {
        Self {
            status: TxStatus::NoAck,
            ..Self::ok(attempts)
        }
    }

    pub fn other() -> Self {
        Self {
            status: TxStatus::Other,
            ..Self::ok(0)
        }
    }

    pub fn with_mac_timing(mut self, tx_start: Instant, ack_at: Instant) -> Self {
        self.mac_timing = Some(MacTiming { tx_start, ack_at });
        self
    }

    pub fn with_measured_delay(mut self, delay_ms: u16) -> Self {
        self.measured_delay_ms = Some(delay_ms);
        self
    }
}

pub struct LinkEstimator {
    cfg: LinkCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    pending: PendingPool,
}

impl core::fmt::Debug for LinkEstimator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LinkEstimator")
            .field("cfg", &self.cfg)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl LinkEstimator {
    pub fn new(cfg: LinkCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let pending = PendingPool::with_capacity(cfg.pending_capacity)
            .with_max_age(Duration::from_millis(cfg.pending_timeout_ms));
        Self {
            cfg,
            clock,
            pending,
        }
    }

    pub fn cfg(&self) -> &LinkCfg {
        &self.cfg
    }

    pub fn pending(&self) -> &PendingPool {
        &self.pending
    }

    /// Remember when a frame for `dest` was handed to the MAC.
    pub fn record_send(&mut self, dest: LinkAddr) -> PushOutcome {
        let out = self.pending.push(dest, self.clock.now());
        if out == PushOutcome::Dropped {
            tracing::debug!(%dest, capacity = self.pending.capacity(), "pending timestamp pool full");
        }
        out
    }

    /// Drop the in-flight timestamps of a neighbor that went away.
    pub fn forget(&mut self, addr: LinkAddr) -> usize {
        let n = self.pending.purge(addr);
        if n > 0 {
            tracing::debug!(%addr, dropped = n, "pending timestamps discarded");
        }
        n
    }

    /// Fold one transmission outcome into `link`.
    pub fn on_transmission(&mut self, addr: LinkAddr, link: &mut LinkStats, outcome: &TxOutcome) {
        let max_etx = self.cfg.max_etx();
        let (sample_etx, sample_delay) = match outcome.status {
            TxStatus::Other => {
                self.pending.pop_oldest(addr);
                tracing::debug!(%addr, "transmission failed, link metrics unchanged");
                return;
            }
            TxStatus::Ok => {
                let attempts = u16::from(outcome.attempts.max(1));
                let etx = attempts.saturating_mul(ETX_DIVISOR).min(max_etx);
                (etx, self.delay_sample(addr, outcome))
            }
            TxStatus::NoAck => {
                self.pending.pop_oldest(addr);
                (max_etx, Some(self.cfg.noack_delay_penalty_ms))
            }
        };

        let old = *link;
        link.etx = ewma_u16(
            link.etx,
            sample_etx,
            self.cfg.alpha,
            LinkCfg::EWMA_SCALE,
            max_etx,
        );
        if let Some(d) = sample_delay {
            let d = d.min(self.cfg.max_delay_ms);
            link.delay_ms = ewma_u16(
                link.delay_ms,
                d,
                self.cfg.alpha,
                LinkCfg::EWMA_SCALE,
                self.cfg.max_delay_ms,
            );
        }
        tracing::debug!(
            %addr,
            status = ?outcome.status,
            old_etx = old.etx,
            new_etx = link.etx,
            sample_etx,
            old_delay = old.delay_ms,
            new_delay = link.delay_ms,
            sample_delay = ?sample_delay,
            "link metrics updated"
        );
    }

    /// Explicit measurement first, then the pending timestamp of `addr`.
    fn delay_sample(&mut self, addr: LinkAddr, outcome: &TxOutcome) -> Option<u16> {
        if let Some(d) = outcome.measured_delay_ms {
            self.pending.pop_oldest(addr);
            return Some(d);
        }
        let queued_at = self.pending.pop_oldest(addr)?;
        let ms = match outcome.mac_timing {
            Some(t) => {
                let queueing = t.tx_start.saturating_duration_since(queued_at);
                let rtt = t.ack_at.saturating_duration_since(t.tx_start);
                duration_ms(queueing + rtt / 2)
            }
            None => duration_ms(self.clock.now().saturating_duration_since(queued_at)),
        };
        Some(u16::try_from(ms).unwrap_or(u16::MAX))
    }
}
