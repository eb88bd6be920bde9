//! Objective functions.
//!
//! `ObjectiveFunction` is the interface the RPL layer drives: link feedback
//! in, rank/parent/DAG decisions and the outgoing metric container out.
//! `FuzzyOf` combines ETX, latency, hop count and residual energy through a
//! `FuzzyScorer`; `EtxOf` ranks by ETX path cost alone.

use std::sync::Arc;

use fuzzyof_traits::clock::Clock;
use fuzzyof_traits::{DutyCycleSource, FuzzyScorer};

use crate::config::{LinkCfg, OfSettings};
use crate::container::{update_etx_container, update_fuzzy_container};
use crate::dag::{Dag, Instance, Parent, ParentPair, ParentRef};
use crate::energy::EnergyModel;
use crate::link_stats::{LinkEstimator, LinkStats, TxOutcome};
use crate::pending::PushOutcome;
use crate::rank::calculate_rank;
use crate::selection::{self, Better, prefer_with_hysteresis};
use crate::types::{DEFAULT_RANK_INCREMENT, ETX_DIVISOR, LinkAddr, Rank};

pub trait ObjectiveFunction {
    /// Objective code point advertised in the DODAG configuration.
    fn ocp(&self) -> u16;

    /// Called when the node (re)joins or resets `dag`.
    fn reset(&mut self, dag: &Dag);

    /// A frame for `dest` was handed to the MAC.
    fn record_send(&mut self, dest: LinkAddr) -> PushOutcome;

    /// The MAC reported the outcome of a transmission to `addr`.
    fn on_transmission(&mut self, addr: LinkAddr, link: &mut LinkStats, outcome: &TxOutcome);

    /// A neighbor left the parent set; drop any state kept for it.
    fn forget(&mut self, addr: LinkAddr);

    /// The better of two parents of one DAG, with switch hysteresis.
    fn best_parent<'d>(&self, pair: ParentPair<'d>) -> ParentRef<'d>;

    fn best_dag<'a>(&self, d1: &'a Dag, d2: &'a Dag) -> &'a Dag {
        selection::best_dag(d1, d2)
    }

    fn calculate_rank(&self, parent: Option<ParentRef<'_>>, base: Rank) -> Rank;

    fn update_metric_container(&mut self, instance: &mut Instance);

    /// Fold `best_parent` over every reachable parent of `dag`.
    fn select_parent<'d>(&self, dag: &'d Dag) -> Option<ParentRef<'d>> {
        dag.parents()
            .filter(|p| !p.rank.is_infinite())
            .reduce(|best, p| self.best_parent(ParentPair::from_same_dag(best, p)))
    }
}

/// Convenience for RPL glue: apply `outcome` to the parent `addr` of `dag`.
/// Returns `false` when `addr` is not a parent of `dag`.
pub fn on_parent_transmission<O: ObjectiveFunction + ?Sized>(
    of: &mut O,
    dag: &mut Dag,
    addr: LinkAddr,
    outcome: &TxOutcome,
) -> bool {
    match dag.parent_mut(addr) {
        Some(p) => {
            of.on_transmission(addr, &mut p.link, outcome);
            true
        }
        None => {
            tracing::debug!(%addr, "transmission outcome for unknown parent ignored");
            false
        }
    }
}

/// Remove `addr` from `dag` and release what `of` still holds for it.
pub fn remove_parent<O: ObjectiveFunction + ?Sized>(
    of: &mut O,
    dag: &mut Dag,
    addr: LinkAddr,
) -> Option<Parent> {
    of.forget(addr);
    dag.remove_parent(addr)
}

// ── FuzzyOf ──────────────────────────────────────────────────────────────────

pub struct FuzzyOf<D: DutyCycleSource, S: FuzzyScorer> {
    pub(crate) settings: OfSettings,
    pub(crate) link: LinkEstimator,
    pub(crate) energy: EnergyModel<D>,
    pub(crate) scorer: S,
}

impl<D: DutyCycleSource, S: FuzzyScorer> core::fmt::Debug for FuzzyOf<D, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FuzzyOf")
            .field("settings", &self.settings)
            .field("link", &self.link)
            .field("energy", &self.energy)
            .finish_non_exhaustive()
    }
}

impl<D: DutyCycleSource, S: FuzzyScorer> FuzzyOf<D, S> {
    pub const OCP: u16 = 4;

    pub fn settings(&self) -> &OfSettings {
        &self.settings
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn energy(&self) -> &EnergyModel<D> {
        &self.energy
    }

    pub fn energy_mut(&mut self) -> &mut EnergyModel<D> {
        &mut self.energy
    }

    pub fn link_estimator(&self) -> &LinkEstimator {
        &self.link
    }

    /// Periodic energy refresh.
    pub fn update_energy(&mut self) {
        self.energy.update();
    }

    pub fn set_mains_powered(&mut self, on: bool) {
        self.energy.set_mains_powered(on);
    }
}

impl<D: DutyCycleSource, S: FuzzyScorer> ObjectiveFunction for FuzzyOf<D, S> {
    fn ocp(&self) -> u16 {
        Self::OCP
    }

    fn reset(&mut self, dag: &Dag) {
        tracing::info!(rank = %dag.rank, joined = dag.joined, "fuzzy OF reset");
    }

    fn record_send(&mut self, dest: LinkAddr) -> PushOutcome {
        self.link.record_send(dest)
    }

    fn on_transmission(&mut self, addr: LinkAddr, link: &mut LinkStats, outcome: &TxOutcome) {
        self.link.on_transmission(addr, link, outcome);
    }

    fn forget(&mut self, addr: LinkAddr) {
        self.link.forget(addr);
    }

    fn best_parent<'d>(&self, pair: ParentPair<'d>) -> ParentRef<'d> {
        selection::best_parent(
            &self.scorer,
            &self.settings.rank,
            &self.settings.selection,
            pair,
        )
    }

    fn calculate_rank(&self, parent: Option<ParentRef<'_>>, base: Rank) -> Rank {
        calculate_rank(&self.scorer, &self.settings.rank, parent, base)
    }

    fn update_metric_container(&mut self, instance: &mut Instance) {
        if self.settings.energy.refresh_on_read && instance.dag().joined {
            self.energy.update();
        }
        let charge = self.energy.charge();
        update_fuzzy_container(instance, charge, &self.settings.container, &self.scorer);
    }
}

// ── EtxOf ────────────────────────────────────────────────────────────────────

/// Minimum-ETX objective function: one hop costs the link ETX.
pub struct EtxOf {
    link: LinkEstimator,
    switch_threshold: u16,
}

impl core::fmt::Debug for EtxOf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EtxOf")
            .field("link", &self.link)
            .field("switch_threshold", &self.switch_threshold)
            .finish()
    }
}

impl EtxOf {
    pub const OCP: u16 = 1;
    /// Half a transmission on the ×100 scale.
    pub const DEFAULT_SWITCH_THRESHOLD: u16 = ETX_DIVISOR / 2;

    pub fn new(link: LinkCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            link: LinkEstimator::new(link, clock),
            switch_threshold: Self::DEFAULT_SWITCH_THRESHOLD,
        }
    }

    pub fn with_switch_threshold(mut self, threshold: u16) -> Self {
        self.switch_threshold = threshold;
        self
    }

    pub fn link_estimator(&self) -> &LinkEstimator {
        &self.link
    }

    /// Advertised path ETX plus the link ETX to the parent.
    pub fn path_cost(p: &ParentRef<'_>) -> u32 {
        u32::from(p.mc.etx) + u32::from(p.link.etx)
    }
}

impl ObjectiveFunction for EtxOf {
    fn ocp(&self) -> u16 {
        Self::OCP
    }

    fn reset(&mut self, dag: &Dag) {
        tracing::info!(rank = %dag.rank, joined = dag.joined, "ETX OF reset");
    }

    fn record_send(&mut self, dest: LinkAddr) -> PushOutcome {
        self.link.record_send(dest)
    }

    fn on_transmission(&mut self, addr: LinkAddr, link: &mut LinkStats, outcome: &TxOutcome) {
        self.link.on_transmission(addr, link, outcome);
    }

    fn forget(&mut self, addr: LinkAddr) {
        self.link.forget(addr);
    }

    fn best_parent<'d>(&self, pair: ParentPair<'d>) -> ParentRef<'d> {
        prefer_with_hysteresis(
            pair,
            Self::path_cost(&pair.first()),
            Self::path_cost(&pair.second()),
            u32::from(self.switch_threshold),
            Better::Lower,
        )
    }

    fn calculate_rank(&self, parent: Option<ParentRef<'_>>, base: Rank) -> Rank {
        match parent {
            None if base == Rank::ZERO => Rank::INFINITE,
            None => base.saturating_increase(DEFAULT_RANK_INCREMENT),
            Some(p) => {
                let base = if base == Rank::ZERO { p.rank } else { base };
                base.saturating_increase(p.link.etx)
            }
        }
    }

    fn update_metric_container(&mut self, instance: &mut Instance) {
        update_etx_container(instance);
    }
}
