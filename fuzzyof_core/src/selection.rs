//! Preferred DAG and preferred parent comparison.

use fuzzyof_traits::FuzzyScorer;

use crate::config::{ParentOrdering, RankCfg, SelectionCfg};
use crate::dag::{Dag, ParentPair, ParentRef};
use crate::rank::calculate_rank;
use crate::scorer::quality_of;
use crate::types::Rank;

/// Grounded beats floating, then higher preference, then lower rank.
/// A full tie goes to `d2`.
pub fn best_dag<'a>(d1: &'a Dag, d2: &'a Dag) -> &'a Dag {
    if d1.grounded != d2.grounded {
        return if d1.grounded { d1 } else { d2 };
    }
    if d1.preference != d2.preference {
        return if d1.preference > d2.preference {
            d1
        } else {
            d2
        };
    }
    if d1.rank < d2.rank { d1 } else { d2 }
}

/// Direction in which a parent metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Better {
    Lower,
    Higher,
}

/// Pick between two candidates with hysteresis around the preferred parent.
///
/// When either candidate is the DAG's preferred parent and the metrics differ
/// by less than `threshold`, the preferred parent is kept. Otherwise the
/// better metric wins and the first of the pair wins ties.
pub fn prefer_with_hysteresis<'d>(
    pair: ParentPair<'d>,
    m1: u32,
    m2: u32,
    threshold: u32,
    better: Better,
) -> ParentRef<'d> {
    let (p1, p2) = (pair.first(), pair.second());
    if (p1.is_preferred() || p2.is_preferred()) && m1.abs_diff(m2) < threshold {
        let keep = if p1.is_preferred() { p1 } else { p2 };
        tracing::trace!(
            addr = %keep.addr,
            m1,
            m2,
            threshold,
            "difference below switch threshold, keeping preferred parent"
        );
        return keep;
    }
    let p1_wins = match better {
        Better::Lower => m1 <= m2,
        Better::Higher => m1 >= m2,
    };
    if p1_wins { p1 } else { p2 }
}

/// Metric `best_parent` orders by.
pub fn parent_metric<S: FuzzyScorer + ?Sized>(
    scorer: &S,
    rank: &RankCfg,
    ordering: ParentOrdering,
    p: ParentRef<'_>,
) -> u32 {
    match ordering {
        ParentOrdering::PathCost => u32::from(calculate_rank(scorer, rank, Some(p), Rank::ZERO).get()),
        ParentOrdering::Quality => u32::from(quality_of(scorer, &p.mc)),
    }
}

pub fn best_parent<'d, S: FuzzyScorer + ?Sized>(
    scorer: &S,
    rank: &RankCfg,
    sel: &SelectionCfg,
    pair: ParentPair<'d>,
) -> ParentRef<'d> {
    let m1 = parent_metric(scorer, rank, sel.ordering, pair.first());
    let m2 = parent_metric(scorer, rank, sel.ordering, pair.second());
    let better = match sel.ordering {
        ParentOrdering::PathCost => Better::Lower,
        ParentOrdering::Quality => Better::Higher,
    };
    prefer_with_hysteresis(pair, m1, m2, sel.threshold(), better)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dag(grounded: bool, preference: u8, rank: u16) -> Dag {
        let mut d = Dag::new(256);
        d.grounded = grounded;
        d.preference = preference;
        d.rank = Rank(rank);
        d
    }

    #[test]
    fn grounded_then_preference_then_rank() {
        let (a, b) = (dag(true, 0, 900), dag(false, 7, 256));
        assert!(std::ptr::eq(best_dag(&a, &b), &a));
        let (a, b) = (dag(true, 1, 256), dag(true, 2, 900));
        assert!(std::ptr::eq(best_dag(&a, &b), &b));
        let (a, b) = (dag(true, 2, 256), dag(true, 2, 512));
        assert!(std::ptr::eq(best_dag(&a, &b), &a));
    }

    #[test]
    fn full_tie_returns_second() {
        let (a, b) = (dag(false, 3, 512), dag(false, 3, 512));
        assert!(std::ptr::eq(best_dag(&a, &b), &b));
    }
}
