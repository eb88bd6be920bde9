//! Simulated node assembled from the config: DAG, neighbor set and the
//! objective function selected by `instance.objective`.

use eyre::{Result, WrapErr};
use fuzzyof_config::{Config, Objective, PowerSource};
use fuzzyof_core::{
    CounterMode, Dag, DynFuzzyOf, EnergyObject, EnergySource, EtxOf, Instance, LinkAddr,
    MetricObject, ObjectiveFunction, OfSettings, Parent, RampScorer, Rank, build_etx_of,
};
use fuzzyof_sim::{DutyProfile, SimHandle, SimulatedDutyCycle};
use fuzzyof_traits::ManualClock;

pub enum Engine {
    Fuzzy(Box<DynFuzzyOf>),
    Etx(EtxOf),
}

impl Engine {
    pub fn of(&self) -> &dyn ObjectiveFunction {
        match self {
            Engine::Fuzzy(of) => &**of,
            Engine::Etx(of) => of,
        }
    }

    pub fn of_mut(&mut self) -> &mut dyn ObjectiveFunction {
        match self {
            Engine::Fuzzy(of) => &mut **of,
            Engine::Etx(of) => of,
        }
    }

    /// Published charge level; `None` for objective functions without an
    /// energy model.
    pub fn charge(&self) -> Option<u8> {
        match self {
            Engine::Fuzzy(of) => Some(of.energy().charge()),
            Engine::Etx(_) => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Engine::Fuzzy(_) => "fuzzy",
            Engine::Etx(_) => "etx",
        }
    }
}

pub struct Node {
    pub engine: Engine,
    pub instance: Instance,
    pub clock: ManualClock,
    pub sim: SimHandle,
}

impl Node {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let clock = ManualClock::new();
        let (duty_cycle, sim) = sim_duty_cycle(cfg)?;
        let engine = match cfg.instance.objective {
            Objective::Fuzzy => {
                let of = DynFuzzyOf::builder()
                    .with_settings(OfSettings::from(cfg))
                    .with_scorer(RampScorer::new((&cfg.scorer).into()))
                    .with_clock(Box::new(clock.clone()))
                    .with_duty_cycle(duty_cycle)
                    .build()?;
                Engine::Fuzzy(Box::new(of))
            }
            Objective::Etx => Engine::Etx(
                build_etx_of((&cfg.link).into(), Some(Box::new(clock.clone())))?
                    .with_switch_threshold(cfg.selection.etx_threshold),
            ),
        };
        let instance = Instance::new(build_dag(cfg)?);
        tracing::info!(
            objective = engine.name(),
            ocp = engine.of().ocp(),
            parents = instance.dag().parent_count(),
            root = instance.dag().is_root(),
            "node assembled"
        );
        let mut node = Self {
            engine,
            instance,
            clock,
            sim,
        };
        node.engine.of_mut().reset(node.instance.dag());
        Ok(node)
    }

    /// Pick the preferred parent, recompute the rank and refresh the
    /// outgoing container. Returns the preferred parent, if any.
    pub fn refresh(&mut self) -> Option<LinkAddr> {
        let preferred = self
            .engine
            .of()
            .select_parent(self.instance.dag())
            .map(|p| p.addr);
        let before = self.instance.dag().preferred_parent().map(|p| p.addr);
        if before != preferred && self.instance.dag_mut().set_preferred_parent(preferred) {
            tracing::info!(from = ?before, to = ?preferred, "preferred parent changed");
        }
        if !self.instance.dag().is_root() {
            let rank = self
                .engine
                .of()
                .calculate_rank(self.instance.dag().preferred_parent(), Rank::ZERO);
            self.instance.dag_mut().rank = rank;
        }
        self.engine.of_mut().update_metric_container(&mut self.instance);
        preferred
    }
}

/// Simulated energest counters configured from `[simulation]` and `[energy]`.
pub fn sim_duty_cycle(cfg: &Config) -> Result<(SimulatedDutyCycle, SimHandle)> {
    let s = &cfg.simulation;
    let profile = DutyProfile::new(s.cpu_permille, s.transmit_permille, s.listen_permille)
        .wrap_err("invalid simulation profile")?;
    let reset = CounterMode::from(cfg.energy.counters) == CounterMode::ResetOnRead;
    let sim = SimulatedDutyCycle::new(profile, s.ticks_per_second)
        .with_reset_on_read(reset)
        .with_lpm_glitch_every(s.lpm_glitch_every);
    let handle = sim.handle();
    Ok((sim, handle))
}

fn build_dag(cfg: &Config) -> Result<Dag> {
    let inst = &cfg.instance;
    let mut dag = if inst.root {
        Dag::root(inst.min_hoprankinc)
    } else {
        let mut d = Dag::new(inst.min_hoprankinc);
        d.joined = true;
        d.grounded = inst.grounded;
        d
    };
    dag.preference = inst.preference;

    for (i, n) in cfg.neighbors.iter().enumerate() {
        let addr: LinkAddr = n
            .addr
            .parse()
            .map_err(|e| eyre::eyre!("neighbor[{i}].addr: {e}"))?;
        if dag.parent(addr).is_some() {
            eyre::bail!(
                "neighbor[{i}].addr {:?} is the same node as an earlier neighbor ({addr})",
                n.addr
            );
        }
        let source = match n.source {
            PowerSource::Mains => EnergySource::Mains,
            PowerSource::Battery => EnergySource::Battery,
            PowerSource::Scavenging => EnergySource::Scavenging,
        };
        let mc = MetricObject {
            etx: n.etx,
            latency: n.latency_ms,
            hopcount: n.hopcount,
            energy: EnergyObject::new(source, n.energy),
        };
        dag.add_parent(Parent::new(addr, Rank(n.rank)).with_metrics(mc));
    }
    Ok(dag)
}
