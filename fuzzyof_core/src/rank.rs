//! Rank through a parent.
//!
//! One hop costs at least `min_hoprankinc`; every quality point the parent's
//! path falls short of 100 adds `min_hoprankinc / divisor` on top.

use fuzzyof_traits::FuzzyScorer;

use crate::config::RankCfg;
use crate::dag::ParentRef;
use crate::scorer::quality_of;
use crate::types::{DEFAULT_RANK_INCREMENT, QUALITY_MAX, Rank};

/// `h + (100 − quality)·h / divisor`, in `u32`, clamped to `u16`.
#[inline]
pub fn rank_increase(min_hoprankinc: u16, quality: u8, divisor: u16) -> u16 {
    let h = u32::from(min_hoprankinc);
    let shortfall = u32::from(QUALITY_MAX - quality.min(QUALITY_MAX));
    let inc = h + shortfall * h / u32::from(divisor.max(1));
    u16::try_from(inc).unwrap_or(u16::MAX)
}

/// Rank of this node through `parent`, starting from `base`.
///
/// `base == Rank::ZERO` means "use the parent's advertised rank". Without a
/// parent a zero base is unreachable and any other base is advanced by the
/// default increment.
pub fn calculate_rank<S: FuzzyScorer + ?Sized>(
    scorer: &S,
    cfg: &RankCfg,
    parent: Option<ParentRef<'_>>,
    base: Rank,
) -> Rank {
    let (base, inc) = match parent {
        None if base == Rank::ZERO => return Rank::INFINITE,
        None => (base, DEFAULT_RANK_INCREMENT),
        Some(p) => {
            let base = if base == Rank::ZERO { p.rank } else { base };
            let q = quality_of(scorer, &p.mc);
            (
                base,
                rank_increase(p.dag().min_hoprankinc(), q, cfg.quality_rank_divisor),
            )
        }
    };
    let rank = base.saturating_increase(inc);
    tracing::trace!(%base, inc, %rank, "rank computed");
    rank
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(256, 100, 10, 256)]
    #[case(256, 0, 10, 256 + 2560)]
    #[case(256, 90, 10, 256 + 256)]
    #[case(256, 200, 10, 256)]
    #[case(0xFFFF, 0, 1, 0xFFFF)]
    #[case(256, 50, 0, 256 + 50 * 256)]
    fn increase_table(#[case] h: u16, #[case] q: u8, #[case] div: u16, #[case] want: u32) {
        let want = u16::try_from(want).unwrap_or(u16::MAX);
        assert_eq!(rank_increase(h, q, div), want);
    }
}
