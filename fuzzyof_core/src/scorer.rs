//! Reference fuzzy scorer and the helpers that feed it a metric object.

use fuzzyof_traits::FuzzyScorer;

use crate::config::ScorerCfg;
use crate::container::MetricObject;
use crate::types::{ETX_DIVISOR, MAX_ENERGY, QUALITY_MAX};

/// QoS of an advertised path.
pub fn qos_of<S: FuzzyScorer + ?Sized>(scorer: &S, mc: &MetricObject) -> u8 {
    scorer
        .qos(mc.etx / ETX_DIVISOR, mc.latency, mc.hopcount)
        .min(QUALITY_MAX)
}

/// Quality of an advertised path: QoS folded with the advertised energy.
pub fn quality_of<S: FuzzyScorer + ?Sized>(scorer: &S, mc: &MetricObject) -> u8 {
    scorer
        .quality(qos_of(scorer, mc), mc.energy.est)
        .min(QUALITY_MAX)
}

/// Piecewise-linear stand-in for a fuzzy rule base.
///
/// Each input maps to 100 at or below its good breakpoint and 0 at or above
/// its bad breakpoint; QoS is the weighted mean. Quality scales QoS between
/// `energy_floor` percent (empty battery) and 100 percent (full).
#[derive(Debug, Clone, Default)]
pub struct RampScorer {
    cfg: ScorerCfg,
}

impl RampScorer {
    pub fn new(cfg: ScorerCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &ScorerCfg {
        &self.cfg
    }
}

/// 100 at `v <= good`, 0 at `v >= bad`, linear in between.
#[inline]
fn ramp_down(v: u16, good: u16, bad: u16) -> u32 {
    if v <= good {
        100
    } else if v >= bad {
        0
    } else {
        100 * u32::from(bad - v) / u32::from(bad - good)
    }
}

impl FuzzyScorer for RampScorer {
    fn qos(&self, etx_hops: u16, latency_ms: u16, hopcount: u16) -> u8 {
        let c = &self.cfg;
        let weights = [c.etx_weight, c.latency_weight, c.hop_weight].map(u32::from);
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return 0;
        }
        let scores = [
            ramp_down(etx_hops, c.etx_good, c.etx_bad),
            ramp_down(latency_ms, c.latency_good_ms, c.latency_bad_ms),
            ramp_down(hopcount, c.hop_good, c.hop_bad),
        ];
        let sum: u32 = scores.iter().zip(weights).map(|(s, w)| s * w).sum();
        u8::try_from(sum / total).unwrap_or(QUALITY_MAX)
    }

    fn quality(&self, qos: u8, energy: u8) -> u8 {
        let floor = u32::from(self.cfg.energy_floor.min(QUALITY_MAX));
        let factor = floor + (100 - floor) * u32::from(energy) / u32::from(MAX_ENERGY);
        let q = u32::from(qos.min(QUALITY_MAX)) * factor / 100;
        u8::try_from(q).unwrap_or(QUALITY_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 100, 1, 100)]
    #[case(10, 1000, 15, 0)]
    #[case(0, 0, 0, 100)]
    #[case(u16::MAX, u16::MAX, u16::MAX, 0)]
    // etx 5 ramps to 55: 55·50 + 100·30 + 100·20 = 7750
    #[case(5, 100, 1, 77)]
    fn qos_table(#[case] etx: u16, #[case] lat: u16, #[case] hops: u16, #[case] want: u8) {
        assert_eq!(RampScorer::default().qos(etx, lat, hops), want);
    }

    #[test]
    fn quality_spans_floor_to_full() {
        let s = RampScorer::default();
        assert_eq!(s.quality(100, 255), 100);
        assert_eq!(s.quality(100, 0), 40);
        assert_eq!(s.quality(0, 255), 0);
    }

    #[test]
    fn quality_is_monotone_in_energy() {
        let s = RampScorer::default();
        let mut prev = 0;
        for e in 0..=255u8 {
            let q = s.quality(80, e);
            assert!(q >= prev);
            prev = q;
        }
    }

    #[test]
    fn zero_weights_score_zero() {
        let s = RampScorer::new(ScorerCfg {
            etx_weight: 0,
            latency_weight: 0,
            hop_weight: 0,
            ..ScorerCfg::default()
        });
        assert_eq!(s.qos(1, 1, 1), 0);
    }
}
