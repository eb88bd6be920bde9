//! End-to-end: link feedback in, parent choice, rank and container out.

use std::time::Duration;

use fuzzyof_core::{
    Dag, DischargeKind, DynFuzzyOf, EnergyCfg, EnergyObject, EnergySource, Instance, LinkAddr,
    LinkCfg, MetricObject, ObjectiveFunction, OfSettings, Parent, Rank, TxOutcome, build_etx_of,
    on_parent_transmission, remove_parent,
};
use fuzzyof_sim::{DutyProfile, SimHandle, SimulatedDutyCycle};
use fuzzyof_traits::ManualClock;

const A: LinkAddr = LinkAddr::from_node_id(1);
const B: LinkAddr = LinkAddr::from_node_id(2);
const STRANGER: LinkAddr = LinkAddr::from_node_id(99);

fn battery(est: u8) -> EnergyObject {
    EnergyObject::new(EnergySource::Battery, est)
}

/// A sits right under the root, B one hop further down on batteries.
fn two_parent_instance() -> Instance {
    let mut dag = Dag::new(256);
    dag.joined = true;
    dag.grounded = true;
    dag.add_parent(Parent::new(A, Rank(256)).with_metrics(MetricObject::ROOT));
    dag.add_parent(Parent::new(B, Rank(512)).with_metrics(MetricObject {
        etx: 150,
        latency: 40,
        hopcount: 1,
        energy: battery(200),
    }));
    Instance::new(dag)
}

fn fuzzy_node(clock: &ManualClock) -> (DynFuzzyOf, SimHandle) {
    let sim = SimulatedDutyCycle::new(DutyProfile::new(1000, 0, 1000).unwrap(), 1000);
    let handle = sim.handle();
    let settings = OfSettings {
        energy: EnergyCfg {
            capacity_mah: 1,
            discharge: DischargeKind::Linear,
            ..EnergyCfg::default()
        },
        ..OfSettings::default()
    };
    let of = DynFuzzyOf::builder()
        .with_settings(settings)
        .with_clock(Box::new(clock.clone()))
        .with_duty_cycle(sim)
        .build()
        .unwrap();
    (of, handle)
}

/// What the RPL layer does after each DIO or transmission batch.
fn refresh<O: ObjectiveFunction + ?Sized>(of: &mut O, inst: &mut Instance) -> Option<LinkAddr> {
    let best = of.select_parent(inst.dag()).map(|p| p.addr);
    let dag = inst.dag_mut();
    assert!(dag.set_preferred_parent(best));
    let rank = of.calculate_rank(dag.preferred_parent(), Rank::ZERO);
    dag.rank = rank;
    of.update_metric_container(inst);
    best
}

#[test]
fn fuzzy_node_follows_the_better_advertisement() {
    let clock = ManualClock::new();
    let (mut of, _sim) = fuzzy_node(&clock);
    let mut inst = two_parent_instance();

    // via A: 256 + 256, via B: 512 + 588
    assert_eq!(refresh(&mut of, &mut inst), Some(A));
    assert_eq!(inst.dag().rank, Rank(512));

    assert!(of.record_send(A).is_queued());
    clock.advance(Duration::from_millis(40));
    assert!(on_parent_transmission(
        &mut of,
        inst.dag_mut(),
        A,
        &TxOutcome::ok(2)
    ));
    refresh(&mut of, &mut inst);
    assert_eq!(
        inst.container().obj,
        MetricObject {
            etx: 470,
            latency: 4,
            hopcount: 1,
            energy: battery(255),
        }
    );

    // A now advertises a long, lossy path: quality 62, rank 1484 > 1100 + threshold
    if let Some(a) = inst.dag_mut().parent_mut(A) {
        a.mc = MetricObject {
            etx: 600,
            latency: 300,
            hopcount: 3,
            energy: battery(255),
        };
    }
    assert_eq!(refresh(&mut of, &mut inst), Some(B));
    assert_eq!(inst.dag().rank, Rank(1100));
    assert_eq!(
        inst.container().obj,
        MetricObject {
            etx: 650,
            latency: 40,
            hopcount: 2,
            energy: battery(200),
        }
    );
}

#[test]
fn draining_battery_lowers_the_advertised_energy() {
    let clock = ManualClock::new();
    let (mut of, sim) = fuzzy_node(&clock);
    let mut inst = two_parent_instance();
    refresh(&mut of, &mut inst);
    assert_eq!(inst.container().obj.energy.est, 255);

    // 2 min at full CPU and radio: 2.616e10 of 3.6e10 units drawn
    sim.advance(120_000);
    of.update_energy();
    assert_eq!(of.energy().charge(), 69);
    assert_eq!(of.energy().fraction(), 7000);

    refresh(&mut of, &mut inst);
    assert_eq!(inst.container().obj.energy, battery(69));

    of.set_mains_powered(true);
    assert_eq!(of.energy().charge(), 255);
}

#[test]
fn feedback_for_unknown_neighbors_is_ignored() {
    let clock = ManualClock::new();
    let (mut of, _sim) = fuzzy_node(&clock);
    let mut inst = two_parent_instance();
    let before = inst.dag().parent(A).map(|p| p.link);
    assert!(!on_parent_transmission(
        &mut of,
        inst.dag_mut(),
        STRANGER,
        &TxOutcome::no_ack(3)
    ));
    assert_eq!(inst.dag().parent(A).map(|p| p.link), before);
}

#[test]
fn losing_every_parent_advertises_the_worst_case() {
    let clock = ManualClock::new();
    let (mut of, _sim) = fuzzy_node(&clock);
    let mut inst = two_parent_instance();
    refresh(&mut of, &mut inst);
    for _ in 0..3 {
        of.record_send(A);
    }
    of.record_send(B);

    for addr in [A, B] {
        assert!(remove_parent(&mut of, inst.dag_mut(), addr).is_some());
    }
    // in-flight timestamps of the departed parents are released
    assert!(of.link_estimator().pending().is_empty());
    assert_eq!(refresh(&mut of, &mut inst), None);
    assert_eq!(inst.dag().rank, Rank::INFINITE);
    assert_eq!(inst.container().obj.etx, 10_000);
    assert_eq!(inst.container().obj.energy.est, 0);
}

#[test]
fn etx_node_switches_after_losses_exceed_the_threshold() {
    let clock = ManualClock::new();
    let mut of = build_etx_of(LinkCfg::default(), Some(Box::new(clock.clone()))).unwrap();

    let mut dag = Dag::new(256);
    dag.joined = true;
    dag.add_parent(Parent::new(A, Rank(256)));
    dag.add_parent(Parent::new(B, Rank(256)).with_metrics(MetricObject {
        etx: 100,
        ..MetricObject::default()
    }));
    let mut inst = Instance::new(dag);

    // A: 0 + 500, B: 100 + 500
    assert_eq!(refresh(&mut of, &mut inst), Some(A));
    assert_eq!(inst.dag().rank, Rank(756));

    // 0.9·500 + 0.1·1500 = 600: level with B, A is kept
    on_parent_transmission(&mut of, inst.dag_mut(), A, &TxOutcome::no_ack(3));
    assert_eq!(refresh(&mut of, &mut inst), Some(A));

    // 0.9·600 + 0.1·1500 = 690: 90 above B
    on_parent_transmission(&mut of, inst.dag_mut(), A, &TxOutcome::no_ack(3));
    assert_eq!(refresh(&mut of, &mut inst), Some(B));
    assert_eq!(inst.dag().rank, Rank(756));
    assert_eq!(inst.container().obj.etx, 600);
}
