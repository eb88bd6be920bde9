use fuzzyof_core::energy::Recovery;
use fuzzyof_core::{DischargeKind, EnergyCfg, EnergyModel};
use fuzzyof_sim::{DutyProfile, SimHandle, SimulatedDutyCycle};

const MINUTE_MS: u64 = 60_000;

fn burst() -> DutyProfile {
    DutyProfile::new(1000, 0, 1000).unwrap()
}

fn model(discharge: DischargeKind, capacity_mah: u32) -> (EnergyModel<SimulatedDutyCycle>, SimHandle) {
    let sim = SimulatedDutyCycle::new(burst(), 1000);
    let handle = sim.handle();
    let cfg = EnergyCfg {
        capacity_mah,
        period_ms: MINUTE_MS,
        discharge,
        ..EnergyCfg::default()
    };
    (EnergyModel::new(sim, cfg), handle)
}

fn recovery() -> DischargeKind {
    DischargeKind::Recovery {
        beta_sq_per_min: Recovery::DEFAULT_BETA_SQ_PER_MIN,
        modes: Recovery::DEFAULT_MODES,
    }
}

fn step(m: &mut EnergyModel<SimulatedDutyCycle>, h: &SimHandle, profile: DutyProfile) -> u8 {
    h.set_profile(profile);
    h.advance(MINUTE_MS);
    m.update();
    m.charge()
}

#[test]
fn recovery_gives_charge_back_after_idle() {
    let (mut lin, hl) = model(DischargeKind::Linear, 10);
    let (mut rec, hr) = model(recovery(), 10);

    let lin_burst = step(&mut lin, &hl, burst());
    let rec_burst = step(&mut rec, &hr, burst());
    // the rate-capacity penalty makes the same burst cost more
    assert!(rec_burst < lin_burst, "{rec_burst} !< {lin_burst}");

    let lin_idle = step(&mut lin, &hl, DutyProfile::IDLE);
    let rec_idle = step(&mut rec, &hr, DutyProfile::IDLE);
    assert!(lin_idle <= lin_burst);
    assert!(rec_idle > rec_burst, "{rec_idle} !> {rec_burst}");
    assert!(rec_idle <= lin_idle);
}

#[test]
fn linear_charge_never_rises() {
    let (mut m, h) = model(DischargeKind::Linear, 1);
    let mut prev = (m.charge(), m.fraction());
    for i in 0..6 {
        let profile = if i % 2 == 0 { burst() } else { DutyProfile::IDLE };
        step(&mut m, &h, profile);
        let now = (m.charge(), m.fraction());
        assert!(now <= prev, "{now:?} > {prev:?}");
        prev = now;
    }
}

#[test]
fn full_load_drains_a_small_battery() {
    // 1 mAh at 218 000 units/ms empties in ~165 s
    let (mut m, h) = model(DischargeKind::Linear, 1);
    for _ in 0..3 {
        step(&mut m, &h, burst());
    }
    assert_eq!(m.charge(), 0);
    assert_eq!(m.fraction(), 0);
    assert_eq!(m.remaining(), 0);
    assert!(m.is_exhausted());
}

#[test]
fn mains_supply_pins_charge_and_skips_counters() {
    let (mut m, h) = model(DischargeKind::Linear, 1);
    let on_battery = step(&mut m, &h, burst());
    assert!(on_battery < 255);

    m.set_mains_powered(true);
    let reads = h.reads();
    assert_eq!(step(&mut m, &h, burst()), 255);
    assert_eq!(m.fraction(), 0);
    assert_eq!(h.reads(), reads);
    assert!(!m.is_exhausted());

    // the counters kept running while on mains; that minute is billed on the next read
    m.set_mains_powered(false);
    assert_eq!(m.charge(), on_battery);
    m.update();
    assert!(m.charge() < on_battery);
}

#[test]
fn failed_read_keeps_the_previous_estimate() {
    let (mut m, h) = model(DischargeKind::Linear, 1);
    step(&mut m, &h, burst());
    let before = (m.charge(), m.fraction());
    h.fail_next_read();
    step(&mut m, &h, burst());
    assert_eq!((m.charge(), m.fraction()), before);
}

#[test]
fn lpm_glitch_costs_no_more_than_a_normal_period() {
    let cfg = EnergyCfg {
        capacity_mah: 1,
        period_ms: 1000,
        ..EnergyCfg::default()
    };
    let clean = SimulatedDutyCycle::new(DutyProfile::IDLE, 1000);
    let glitchy = SimulatedDutyCycle::new(DutyProfile::IDLE, 1000).with_lpm_glitch_every(2);
    let (hc, hg) = (clean.handle(), glitchy.handle());
    let mut mc = EnergyModel::new(clean, cfg.clone());
    let mut mg = EnergyModel::new(glitchy, cfg);

    for _ in 0..4 {
        hc.advance(1000);
        hg.advance(1000);
        mc.update();
        mg.update();
        assert_eq!(mg.remaining(), mc.remaining());
        assert_eq!((mg.charge(), mg.fraction()), (mc.charge(), mc.fraction()));
    }
    assert!(mc.remaining() < mc.rated());
}
