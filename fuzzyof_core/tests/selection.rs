use fuzzyof_core::mocks::NoopDutyCycle;
use fuzzyof_core::types::DEFAULT_RANK_INCREMENT;
use fuzzyof_core::{
    Dag, EtxOf, FuzzyOf, LinkAddr, LinkCfg, LinkStats, MetricObject, ObjectiveFunction,
    OfSettings, Parent, ParentOrdering, Rank, SelectionCfg, build_etx_of, build_fuzzy_of,
};
use fuzzyof_traits::FuzzyScorer;
use rstest::rstest;

/// Quality is 100 minus the advertised hop count; energy is ignored.
struct HopScorer;

impl FuzzyScorer for HopScorer {
    fn qos(&self, _etx_hops: u16, _latency_ms: u16, hopcount: u16) -> u8 {
        u8::try_from(100u16.saturating_sub(hopcount)).unwrap_or(0)
    }

    fn quality(&self, qos: u8, _energy: u8) -> u8 {
        qos
    }
}

const P: LinkAddr = LinkAddr::from_node_id(1);
const Q: LinkAddr = LinkAddr::from_node_id(2);

fn fuzzy(ordering: ParentOrdering) -> FuzzyOf<NoopDutyCycle, HopScorer> {
    let settings = OfSettings {
        selection: SelectionCfg {
            ordering,
            ..SelectionCfg::default()
        },
        ..OfSettings::default()
    };
    build_fuzzy_of(NoopDutyCycle, HopScorer, settings, None).unwrap()
}

fn parent(addr: LinkAddr, rank: u16, hopcount: u16) -> Parent {
    Parent::new(addr, Rank(rank)).with_metrics(MetricObject {
        hopcount,
        ..MetricObject::default()
    })
}

fn two_parents(p: Parent, q: Parent, preferred: Option<LinkAddr>) -> Dag {
    let mut dag = Dag::new(256);
    dag.joined = true;
    dag.add_parent(p);
    dag.add_parent(q);
    assert!(dag.set_preferred_parent(preferred));
    dag
}

// ── Rank ─────────────────────────────────────────────────────────────────────

#[test]
fn no_parent_and_zero_base_is_infinite() {
    let of = fuzzy(ParentOrdering::PathCost);
    assert_eq!(of.calculate_rank(None, Rank::ZERO), Rank::INFINITE);
    let etx = build_etx_of(LinkCfg::default(), None).unwrap();
    assert_eq!(etx.calculate_rank(None, Rank::ZERO), Rank::INFINITE);
}

#[test]
fn no_parent_with_base_adds_default_increment() {
    let of = fuzzy(ParentOrdering::PathCost);
    assert_eq!(
        of.calculate_rank(None, Rank(1000)),
        Rank(1000 + DEFAULT_RANK_INCREMENT)
    );
    assert_eq!(of.calculate_rank(None, Rank(0xFFF0)), Rank::INFINITE);
}

#[rstest]
// quality 100: one minimum hop
#[case(512, 0, 768)]
// quality 90: 256 + 10·256/10
#[case(512, 10, 1024)]
// quality 0: 256 + 100·256/10
#[case(512, 100, 512 + 256 + 2560)]
#[case(0xF000, 100, 0xFFFF)]
fn rank_through_parent(#[case] rank: u16, #[case] hops: u16, #[case] want: u16) {
    let of = fuzzy(ParentOrdering::PathCost);
    let mut dag = Dag::new(256);
    dag.add_parent(parent(P, rank, hops));
    let p = dag.parent(P).unwrap();
    assert_eq!(of.calculate_rank(Some(p), Rank::ZERO), Rank(want));
}

#[test]
fn explicit_base_overrides_parent_rank() {
    let of = fuzzy(ParentOrdering::PathCost);
    let mut dag = Dag::new(256);
    dag.add_parent(parent(P, 4000, 0));
    let p = dag.parent(P).unwrap();
    assert_eq!(of.calculate_rank(Some(p), Rank(300)), Rank(556));
}

// ── Parent selection ─────────────────────────────────────────────────────────

#[rstest]
// path cost threshold 128: Q must be at least 128 rank units cheaper
#[case(127, P)]
#[case(128, Q)]
fn path_cost_hysteresis(#[case] eps: u16, #[case] want: LinkAddr) {
    let of = fuzzy(ParentOrdering::PathCost);
    let dag = two_parents(parent(P, 1024, 0), parent(Q, 1024 - eps, 0), Some(P));
    assert_eq!(of.best_parent(dag.pair(P, Q).unwrap()).addr, want);
    assert_eq!(of.best_parent(dag.pair(Q, P).unwrap()).addr, want);
}

#[rstest]
// quality threshold 2: Q must score at least 2 points higher
#[case(9, P)]
#[case(8, Q)]
fn quality_hysteresis(#[case] q_hops: u16, #[case] want: LinkAddr) {
    let of = fuzzy(ParentOrdering::Quality);
    let dag = two_parents(parent(P, 512, 10), parent(Q, 512, q_hops), Some(P));
    assert_eq!(of.best_parent(dag.pair(P, Q).unwrap()).addr, want);
}

#[test]
fn without_preferred_parent_the_better_metric_wins() {
    let of = fuzzy(ParentOrdering::PathCost);
    let dag = two_parents(parent(P, 1024, 0), parent(Q, 1023, 0), None);
    assert_eq!(of.best_parent(dag.pair(P, Q).unwrap()).addr, Q);

    // ties go to the first of the pair
    let dag = two_parents(parent(P, 1024, 0), parent(Q, 1024, 0), None);
    assert_eq!(of.best_parent(dag.pair(P, Q).unwrap()).addr, P);
    assert_eq!(of.best_parent(dag.pair(Q, P).unwrap()).addr, Q);
}

#[test]
fn pairs_are_only_formed_within_one_dag() {
    let mut own = Dag::new(256);
    own.add_parent(parent(P, 512, 0));
    let mut other = Dag::new(256);
    other.add_parent(parent(Q, 512, 0));
    // Q is not a member of `own`, so there is nothing to compare
    assert!(own.pair(P, Q).is_none());
    assert!(other.pair(P, Q).is_none());
    own.add_parent(parent(Q, 768, 0));
    let pair = own.pair(P, Q).unwrap();
    assert!(pair.first().same_dag(&pair.second()));
}

#[test]
fn select_parent_skips_unreachable_parents() {
    let of = fuzzy(ParentOrdering::PathCost);
    let mut dag = Dag::new(256);
    assert!(of.select_parent(&dag).is_none());

    dag.add_parent(parent(P, Rank::INFINITE.get(), 0));
    assert!(of.select_parent(&dag).is_none());

    dag.add_parent(parent(Q, 4096, 50));
    assert_eq!(of.select_parent(&dag).map(|p| p.addr), Some(Q));
}

#[test]
fn best_dag_prefers_grounded_over_preference_and_rank() {
    let of = fuzzy(ParentOrdering::PathCost);
    let mut a = Dag::new(256);
    a.grounded = true;
    a.preference = 0;
    a.rank = Rank(500);
    let mut b = Dag::new(256);
    b.grounded = false;
    b.preference = 100;
    b.rank = Rank(10);
    assert!(std::ptr::eq(of.best_dag(&a, &b), &a));
    assert!(std::ptr::eq(of.best_dag(&b, &a), &a));
}

// ── ETX objective ────────────────────────────────────────────────────────────

fn etx_parent(addr: LinkAddr, mc_etx: u16, link_etx: u16) -> Parent {
    Parent::new(addr, Rank(512))
        .with_metrics(MetricObject {
            etx: mc_etx,
            ..MetricObject::default()
        })
        .with_link(LinkStats {
            etx: link_etx,
            delay_ms: 0,
        })
}

#[rstest]
#[case(251, P)]
#[case(250, Q)]
fn etx_path_cost_hysteresis(#[case] q_link: u16, #[case] want: LinkAddr) {
    let of = build_etx_of(LinkCfg::default(), None).unwrap();
    let dag = two_parents(etx_parent(P, 100, 200), etx_parent(Q, 0, q_link), Some(P));
    let pair = dag.pair(P, Q).unwrap();
    assert_eq!(EtxOf::path_cost(&pair.first()), 300);
    assert_eq!(of.best_parent(pair).addr, want);
}

#[test]
fn etx_rank_adds_link_etx() {
    let of = build_etx_of(LinkCfg::default(), None)
        .unwrap()
        .with_switch_threshold(0);
    let mut dag = Dag::new(256);
    dag.add_parent(etx_parent(P, 0, 180));
    let p = dag.parent(P).unwrap();
    assert_eq!(of.calculate_rank(Some(p), Rank::ZERO), Rank(692));
    assert_eq!(of.calculate_rank(Some(p), Rank(1000)), Rank(1180));
}
