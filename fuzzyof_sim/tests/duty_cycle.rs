use fuzzyof_sim::{DutyProfile, SimulatedDutyCycle};
use fuzzyof_traits::DutyCycleSource;
use rstest::rstest;

#[rstest]
#[case(1000, 10_000)]
#[case(32_768, 1_000)]
#[case(128, 60_000)]
fn cumulative_counters_follow_profile(#[case] tps: u32, #[case] ms: u64) {
    let profile = DutyProfile::new(100, 50, 200).unwrap();
    let mut sim = SimulatedDutyCycle::new(profile, tps);
    sim.handle().advance(ms);
    let t = sim.read().unwrap();

    let expect = |permille: u64| (ms * permille * u64::from(tps) / 1_000_000) as u32;
    assert_eq!(t.cpu, expect(100));
    assert_eq!(t.lpm, expect(900));
    assert_eq!(t.transmit, expect(50));
    assert_eq!(t.listen, expect(200));
}

#[test]
fn reset_on_read_reports_deltas() {
    let mut sim = SimulatedDutyCycle::new(DutyProfile::new(0, 0, 1000).unwrap(), 1000)
        .with_reset_on_read(true);
    let h = sim.handle();
    h.advance(500);
    assert_eq!(sim.read().unwrap().listen, 500);
    h.advance(200);
    assert_eq!(sim.read().unwrap().listen, 200);
    assert_eq!(sim.read().unwrap().listen, 0);
}

#[test]
fn lpm_glitch_inflates_only_the_glitched_read() {
    let mut sim = SimulatedDutyCycle::new(DutyProfile::IDLE, 1000)
        .with_reset_on_read(true)
        .with_lpm_glitch_every(2);
    let h = sim.handle();

    h.advance(1000);
    assert_eq!(sim.read().unwrap().lpm, 1000);
    h.advance(1000);
    // second read: 1000 real + 10·1000 stale
    assert_eq!(sim.read().unwrap().lpm, 11_000);
    h.advance(1000);
    assert_eq!(sim.read().unwrap().lpm, 1000);
    assert_eq!(h.reads(), 3);
}

#[test]
fn profile_change_applies_to_later_time_only() {
    let mut sim = SimulatedDutyCycle::new(DutyProfile::IDLE, 1000);
    let h = sim.handle();
    h.advance(1000);
    h.set_profile(DutyProfile::new(1000, 0, 0).unwrap());
    h.advance(1000);
    let t = sim.read().unwrap();
    assert_eq!(t.cpu, 1000);
    assert_eq!(t.lpm, 1000);
    assert_eq!(h.elapsed_ms(), 2000);
}

#[test]
fn failed_read_does_not_consume_a_read_slot() {
    let mut sim = SimulatedDutyCycle::new(DutyProfile::default(), 1000);
    let h = sim.handle();
    h.fail_next_read();
    let err = sim.read().unwrap_err();
    assert!(err.to_string().contains("injected"));
    assert_eq!(h.reads(), 0);
}
