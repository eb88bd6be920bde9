//! Integer arithmetic helpers for the fixed-point metric scales.
//!
//! Every metric the engine publishes is an integer on a documented scale
//! (ETX ×100, milliseconds, 0..=255 charge, 0..=100 quality), so all averaging
//! and scaling happens here in widened integer types.

/// Exponentially weighted moving average in `u32`:
/// `(old·alpha + sample·(scale − alpha)) / scale`.
///
/// The quotient is rounded toward the sample (up when the sample is above the
/// old value, down otherwise). A constant sample is therefore reached exactly
/// and never overshot. `alpha` is clamped to `scale`.
#[inline]
pub fn ewma_u32(old: u32, sample: u32, alpha: u32, scale: u32) -> u32 {
    let scale = scale.max(1);
    let alpha = alpha.min(scale);
    let num = u64::from(old) * u64::from(alpha) + u64::from(sample) * u64::from(scale - alpha);
    let scale = u64::from(scale);
    let avg = if sample > old {
        num.div_ceil(scale)
    } else {
        num / scale
    };
    // avg lies between old and sample, both u32
    u32::try_from(avg).unwrap_or(u32::MAX)
}

/// `ewma_u32` narrowed to `u16` and clamped to `max`.
#[inline]
pub fn ewma_u16(old: u16, sample: u16, alpha: u8, scale: u8, max: u16) -> u16 {
    let avg = ewma_u32(
        u32::from(old),
        u32::from(sample),
        u32::from(alpha),
        u32::from(scale),
    );
    u16::try_from(avg).unwrap_or(u16::MAX).min(max)
}

/// Split `part/whole` on a `0..=full` scale into an integer part and a
/// remainder in units of `1/resolution`.
///
/// Computed in `u128`; `whole == 0` yields `(0, 0)` and `part > whole` is
/// treated as `whole`.
#[inline]
pub fn scaled_split(part: u64, whole: u64, full: u64, resolution: u64) -> (u64, u64) {
    if whole == 0 || resolution == 0 {
        return (0, 0);
    }
    let part = part.min(whole);
    let rest = u128::from(part) * u128::from(full) * u128::from(resolution) / u128::from(whole);
    let res = u128::from(resolution);
    let int = u64::try_from(rest / res).unwrap_or(u64::MAX);
    let frac = u64::try_from(rest % res).unwrap_or(0);
    (int, frac)
}

/// Saturating `u16` add widened through `u32`.
#[inline]
pub fn sat_add_u16(a: u16, b: u16) -> u16 {
    u16::try_from(u32::from(a) + u32::from(b)).unwrap_or(u16::MAX)
}
