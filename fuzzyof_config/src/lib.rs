#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and transmission-trace parsing for the objective function.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional and falls back to the engine defaults.
//! - The trace CSV loader enforces headers and time ordering.
use serde::Deserialize;

/// Transmission trace CSV schema.
///
/// Expected headers:
/// t_ms,neighbor,status,attempts,delay_ms
///
/// Example:
/// t_ms,neighbor,status,attempts,delay_ms
/// 0,2,ok,1,
/// 150,2,noack,3,
/// 300,3,ok,2,80
/// 420,3,other,0,
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TraceRow {
    pub t_ms: u64,
    /// Neighbor address: node id or eight colon-separated hex bytes.
    pub neighbor: String,
    pub status: TraceStatus,
    /// Transmissions spent, retries included.
    pub attempts: u8,
    /// Time from queueing to the MAC callback; empty when unknown.
    #[serde(default)]
    pub delay_ms: Option<u16>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Ok,
    #[serde(alias = "no_ack")]
    Noack,
    Other,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    #[default]
    Fuzzy,
    Etx,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InstanceCfg {
    pub objective: Objective,
    pub min_hoprankinc: u16,
    /// This node is the DODAG root.
    pub root: bool,
    pub grounded: bool,
    pub preference: u8,
}

impl Default for InstanceCfg {
    fn default() -> Self {
        Self {
            objective: Objective::Fuzzy,
            min_hoprankinc: 256,
            root: false,
            grounded: true,
            preference: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinkCfg {
    /// EWMA weight of the old value, percent.
    pub alpha: u8,
    pub max_link_metric: u16,
    pub max_delay_ms: u16,
    pub noack_delay_penalty_ms: u16,
    /// 0 disables delay tracking from send timestamps.
    pub pending_capacity: usize,
    /// Unanswered send timestamps older than this may be evicted (ms).
    pub pending_timeout_ms: u64,
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

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CounterMode {
    #[default]
    Cumulative,
    ResetOnRead,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatteryModel {
    #[default]
    Linear,
    Recovery,
}

/// Current draw per state, in 1/10 000 mA.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Currents {
    pub cpu: u32,
    pub lpm: u32,
    pub transmit: u32,
    pub listen: u32,
}

impl Default for Currents {
    fn default() -> Self {
        Self {
            cpu: 18_000,
            lpm: 545,
            transmit: 177_000,
            listen: 200_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EnergyCfg {
    pub capacity_mah: u32,
    pub period_ms: u64,
    pub counters: CounterMode,
    pub model: BatteryModel,
    /// Diffusion rate for the recovery model, min⁻¹.
    pub beta_sq_per_min: f64,
    /// Diffusion modes summed by the recovery model.
    pub modes: u8,
    pub refresh_on_read: bool,
    pub mains_powered: bool,
    pub currents: Currents,
}

impl Default for EnergyCfg {
    fn default() -> Self {
        Self {
            capacity_mah: 200,
            period_ms: 120_000,
            counters: CounterMode::Cumulative,
            model: BatteryModel::Linear,
            beta_sq_per_min: 1.0,
            modes: 10,
            refresh_on_read: false,
            mains_powered: false,
            currents: Currents::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScorerCfg {
    pub etx_good: u16,
    pub etx_bad: u16,
    pub latency_good_ms: u16,
    pub latency_bad_ms: u16,
    pub hop_good: u16,
    pub hop_bad: u16,
    pub etx_weight: u8,
    pub latency_weight: u8,
    pub hop_weight: u8,
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

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParentOrdering {
    #[default]
    PathCost,
    Quality,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SelectionCfg {
    pub ordering: ParentOrdering,
    pub path_cost_threshold: u16,
    pub quality_threshold: u8,
    /// Switch threshold of the ETX objective, ETX×100.
    pub etx_threshold: u16,
}

impl Default for SelectionCfg {
    fn default() -> Self {
        Self {
            ordering: ParentOrdering::PathCost,
            path_cost_threshold: 128,
            quality_threshold: 2,
            etx_threshold: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RankCfg {
    pub quality_rank_divisor: u16,
}

impl Default for RankCfg {
    fn default() -> Self {
        Self {
            quality_rank_divisor: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ContainerCfg {
    pub hopcount_max: u16,
}

impl Default for ContainerCfg {
    fn default() -> Self {
        Self { hopcount_max: 255 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Duty-cycle profile of the simulated node used by `replay` and `energy`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    pub ticks_per_second: u32,
    /// Share of time the CPU is active; the rest is LPM.
    pub cpu_permille: u16,
    pub transmit_permille: u16,
    pub listen_permille: u16,
    /// Every n-th read reports a stale LPM counter (0 disables).
    pub lpm_glitch_every: u32,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            ticks_per_second: 32_768,
            cpu_permille: 20,
            transmit_permille: 5,
            listen_permille: 15,
            lpm_glitch_every: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PowerSource {
    Mains,
    #[default]
    Battery,
    Scavenging,
}

/// A candidate parent and the metrics it advertises.
#[derive(Debug, Deserialize, Clone)]
pub struct NeighborCfg {
    pub addr: String,
    pub rank: u16,
    /// Advertised path ETX, ×100.
    #[serde(default)]
    pub etx: u16,
    #[serde(default)]
    pub hopcount: u16,
    #[serde(default)]
    pub latency_ms: u16,
    #[serde(default = "full_energy")]
    pub energy: u8,
    #[serde(default)]
    pub source: PowerSource,
}

const fn full_energy() -> u8 {
    255
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub instance: InstanceCfg,
    pub link: LinkCfg,
    pub energy: EnergyCfg,
    pub scorer: ScorerCfg,
    pub selection: SelectionCfg,
    pub rank: RankCfg,
    pub container: ContainerCfg,
    pub logging: Logging,
    pub simulation: SimulationCfg,
    /// `[[neighbor]]` tables.
    #[serde(rename = "neighbor")]
    pub neighbors: Vec<NeighborCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read a trace from any CSV source.
pub fn read_trace<R: std::io::Read>(src: R) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(src);

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers: {}", e))?
        .clone();
    let expected = ["t_ms", "neighbor", "status", "attempts", "delay_ms"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 't_ms,neighbor,status,attempts,delay_ms', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!(
                "trace rows must be ordered by t_ms: row {} goes back from {} to {}",
                idx + 2,
                prev.t_ms,
                row.t_ms
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let f = std::fs::File::open(path).map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
    read_trace(f)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Instance
        if self.instance.min_hoprankinc == 0 {
            eyre::bail!("instance.min_hoprankinc must be > 0");
        }

        // Link
        if self.link.alpha >= 100 {
            eyre::bail!("link.alpha must be in [0, 99]");
        }
        if self.link.max_link_metric == 0 || self.link.max_link_metric > 655 {
            eyre::bail!("link.max_link_metric must be in [1, 655]");
        }
        if self.link.max_delay_ms == 0 {
            eyre::bail!("link.max_delay_ms must be > 0");
        }
        if self.link.noack_delay_penalty_ms > self.link.max_delay_ms {
            eyre::bail!("link.noack_delay_penalty_ms must be <= link.max_delay_ms");
        }
        if self.link.pending_capacity > 1024 {
            eyre::bail!("link.pending_capacity is unreasonably large (>1024)");
        }
        if self.link.pending_timeout_ms == 0 {
            eyre::bail!("link.pending_timeout_ms must be > 0");
        }

        // Energy
        if self.energy.capacity_mah == 0 {
            eyre::bail!("energy.capacity_mah must be > 0");
        }
        if self.energy.period_ms == 0 {
            eyre::bail!("energy.period_ms must be >= 1");
        }
        if self.energy.model == BatteryModel::Recovery {
            if !(self.energy.beta_sq_per_min.is_finite() && self.energy.beta_sq_per_min > 0.0) {
                eyre::bail!("energy.beta_sq_per_min must be finite and > 0");
            }
            if self.energy.modes == 0 {
                eyre::bail!("energy.modes must be >= 1");
            }
        }

        // Scorer
        let s = &self.scorer;
        if s.etx_bad <= s.etx_good {
            eyre::bail!("scorer.etx_bad must be > scorer.etx_good");
        }
        if s.latency_bad_ms <= s.latency_good_ms {
            eyre::bail!("scorer.latency_bad_ms must be > scorer.latency_good_ms");
        }
        if s.hop_bad <= s.hop_good {
            eyre::bail!("scorer.hop_bad must be > scorer.hop_good");
        }
        if u16::from(s.etx_weight) + u16::from(s.latency_weight) + u16::from(s.hop_weight) == 0 {
            eyre::bail!("scorer weights must not all be 0");
        }
        if s.energy_floor > 100 {
            eyre::bail!("scorer.energy_floor must be in [0, 100]");
        }

        // Selection
        if self.selection.quality_threshold > 100 {
            eyre::bail!("selection.quality_threshold must be in [0, 100]");
        }

        // Rank
        if self.rank.quality_rank_divisor == 0 {
            eyre::bail!("rank.quality_rank_divisor must be > 0");
        }

        // Container
        if self.container.hopcount_max == 0 {
            eyre::bail!("container.hopcount_max must be > 0");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        // Simulation
        let sim = &self.simulation;
        if sim.ticks_per_second == 0 {
            eyre::bail!("simulation.ticks_per_second must be > 0");
        }
        if sim.cpu_permille > 1000 {
            eyre::bail!("simulation.cpu_permille must be in [0, 1000]");
        }
        if u32::from(sim.transmit_permille) + u32::from(sim.listen_permille) > 1000 {
            eyre::bail!("simulation.transmit_permille + listen_permille must be <= 1000");
        }

        // Neighbors
        for (i, n) in self.neighbors.iter().enumerate() {
            if n.addr.trim().is_empty() {
                eyre::bail!("neighbor[{}].addr must not be empty", i);
            }
            if self.neighbors[..i].iter().any(|m| m.addr == n.addr) {
                eyre::bail!("neighbor[{}].addr {:?} is listed twice", i, n.addr);
            }
            if n.rank == 0 {
                eyre::bail!("neighbor[{}].rank must be > 0", i);
            }
        }

        Ok(())
    }
}
