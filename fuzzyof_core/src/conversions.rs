//! `From` implementations bridging `fuzzyof_config` types to `fuzzyof_core` types.

use crate::config::{
    ContainerCfg, CounterMode, CurrentDraw, DischargeKind, EnergyCfg, LinkCfg, OfSettings,
    ParentOrdering, RankCfg, ScorerCfg, SelectionCfg,
};

// ── LinkCfg ──────────────────────────────────────────────────────────────────

impl From<&fuzzyof_config::LinkCfg> for LinkCfg {
    fn from(c: &fuzzyof_config::LinkCfg) -> Self {
        Self {
            alpha: c.alpha,
            max_link_metric: c.max_link_metric,
            max_delay_ms: c.max_delay_ms,
            noack_delay_penalty_ms: c.noack_delay_penalty_ms,
            pending_capacity: c.pending_capacity,
            pending_timeout_ms: c.pending_timeout_ms,
        }
    }
}

// ── EnergyCfg ────────────────────────────────────────────────────────────────

impl From<fuzzyof_config::CounterMode> for CounterMode {
    fn from(m: fuzzyof_config::CounterMode) -> Self {
        match m {
            fuzzyof_config::CounterMode::Cumulative => CounterMode::Cumulative,
            fuzzyof_config::CounterMode::ResetOnRead => CounterMode::ResetOnRead,
        }
    }
}

impl From<&fuzzyof_config::Currents> for CurrentDraw {
    fn from(c: &fuzzyof_config::Currents) -> Self {
        Self {
            cpu: c.cpu,
            lpm: c.lpm,
            transmit: c.transmit,
            listen: c.listen,
        }
    }
}

impl From<&fuzzyof_config::EnergyCfg> for EnergyCfg {
    fn from(c: &fuzzyof_config::EnergyCfg) -> Self {
        let discharge = match c.model {
            fuzzyof_config::BatteryModel::Linear => DischargeKind::Linear,
            fuzzyof_config::BatteryModel::Recovery => DischargeKind::Recovery {
                beta_sq_per_min: c.beta_sq_per_min,
                modes: c.modes,
            },
        };
        Self {
            capacity_mah: c.capacity_mah,
            period_ms: c.period_ms,
            counter_mode: c.counters.into(),
            discharge,
            currents: (&c.currents).into(),
            refresh_on_read: c.refresh_on_read,
            mains_powered: c.mains_powered,
        }
    }
}

// ── ScorerCfg ────────────────────────────────────────────────────────────────

impl From<&fuzzyof_config::ScorerCfg> for ScorerCfg {
    fn from(c: &fuzzyof_config::ScorerCfg) -> Self {
        Self {
            etx_good: c.etx_good,
            etx_bad: c.etx_bad,
            latency_good_ms: c.latency_good_ms,
            latency_bad_ms: c.latency_bad_ms,
            hop_good: c.hop_good,
            hop_bad: c.hop_bad,
            etx_weight: c.etx_weight,
            latency_weight: c.latency_weight,
            hop_weight: c.hop_weight,
            energy_floor: c.energy_floor,
        }
    }
}

// ── SelectionCfg / RankCfg ───────────────────────────────────────────────────

impl From<&fuzzyof_config::SelectionCfg> for SelectionCfg {
    fn from(c: &fuzzyof_config::SelectionCfg) -> Self {
        Self {
            ordering: match c.ordering {
                fuzzyof_config::ParentOrdering::PathCost => ParentOrdering::PathCost,
                fuzzyof_config::ParentOrdering::Quality => ParentOrdering::Quality,
            },
            path_cost_threshold: c.path_cost_threshold,
            quality_threshold: c.quality_threshold,
        }
    }
}

impl From<&fuzzyof_config::RankCfg> for RankCfg {
    fn from(c: &fuzzyof_config::RankCfg) -> Self {
        Self {
            quality_rank_divisor: c.quality_rank_divisor,
        }
    }
}

// ── ContainerCfg ─────────────────────────────────────────────────────────────

/// Needs the whole config: the latency bound lives under `[link]`.
impl From<&fuzzyof_config::Config> for ContainerCfg {
    fn from(c: &fuzzyof_config::Config) -> Self {
        Self {
            hopcount_max: c.container.hopcount_max,
            max_delay_ms: c.link.max_delay_ms,
        }
    }
}

// ── OfSettings ───────────────────────────────────────────────────────────────

impl From<&fuzzyof_config::Config> for OfSettings {
    fn from(c: &fuzzyof_config::Config) -> Self {
        Self {
            link: (&c.link).into(),
            energy: (&c.energy).into(),
            rank: (&c.rank).into(),
            selection: (&c.selection).into(),
            container: c.into(),
        }
    }
}
