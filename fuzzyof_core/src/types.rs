//! Identity and rank types shared by every component, plus the protocol
//! constants whose scale is fixed by the metric container format.

use std::fmt;
use std::str::FromStr;

use crate::error::AddrParseError;

/// Fixed-point scale of every ETX quantity (link and path): 1 transmission = 100.
pub const ETX_DIVISOR: u16 = 100;
/// Initial link ETX of a freshly discovered parent, in whole transmissions.
pub const INIT_LINK_METRIC: u16 = 5;
/// Path cost reported when no parent is known, in whole transmissions.
pub const MAX_PATH_COST: u16 = 100;
/// Upper end of the battery charge scale.
pub const MAX_ENERGY: u8 = 255;
/// Upper end of the fuzzy score scale.
pub const QUALITY_MAX: u8 = 100;
/// Minimum rank increase of one hop (RFC 6550 default).
pub const RPL_MIN_HOPRANKINC: u16 = 256;
/// Rank increase used when a rank is validated without a specific parent.
pub const DEFAULT_RANK_INCREMENT: u16 = RPL_MIN_HOPRANKINC;

/// 8-byte link-layer address. All zeroes is the unspecified address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LinkAddr(pub [u8; 8]);

impl LinkAddr {
    pub const UNSPECIFIED: LinkAddr = LinkAddr([0; 8]);

    /// Address whose last two bytes carry a node id, as in simulated networks.
    pub const fn from_node_id(id: u16) -> Self {
        let [hi, lo] = id.to_be_bytes();
        LinkAddr([0, 0, 0, 0, 0, 0, hi, lo])
    }

    #[inline]
    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkAddr({self})")
    }
}

/// Accepts either eight colon-separated hex bytes or a decimal node id.
impl FromStr for LinkAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.contains(':') {
            return s
                .parse::<u16>()
                .map(Self::from_node_id)
                .map_err(|_| AddrParseError(s.to_string()));
        }
        let mut out = [0u8; 8];
        let mut n = 0usize;
        for part in s.split(':') {
            if n >= out.len() {
                return Err(AddrParseError(s.to_string()));
            }
            out[n] = u8::from_str_radix(part, 16).map_err(|_| AddrParseError(s.to_string()))?;
            n += 1;
        }
        if n != out.len() {
            return Err(AddrParseError(s.to_string()));
        }
        Ok(LinkAddr(out))
    }
}

/// RPL rank in device rank units. `INFINITE` is the only "unreachable" value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Rank(pub u16);

impl Rank {
    pub const INFINITE: Rank = Rank(0xFFFF);
    /// "No rank known yet"; callers pass it as base rank to mean "use the parent's".
    pub const ZERO: Rank = Rank(0);

    #[inline]
    pub fn get(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn is_infinite(self) -> bool {
        self == Self::INFINITE
    }

    /// `self + increase`, or `INFINITE` when the sum would reach past it.
    /// The comparison happens before the addition, so nothing can wrap.
    #[inline]
    pub fn saturating_increase(self, increase: u16) -> Rank {
        if Self::INFINITE.0 - self.0 < increase {
            Self::INFINITE
        } else {
            Rank(self.0 + increase)
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.write_str("inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_round_trips_through_display_and_parse() {
        let a = LinkAddr::from_node_id(0x0102);
        assert_eq!(a.to_string(), "00:00:00:00:00:00:01:02");
        assert_eq!(a.to_string().parse::<LinkAddr>().unwrap(), a);
        assert_eq!("258".parse::<LinkAddr>().unwrap(), a);
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        assert!("1:2:3".parse::<LinkAddr>().is_err());
        assert!("zz:00:00:00:00:00:00:01".parse::<LinkAddr>().is_err());
        assert!("0:0:0:0:0:0:0:0:1".parse::<LinkAddr>().is_err());
        assert!("-4".parse::<LinkAddr>().is_err());
    }

    #[test]
    fn saturating_increase_stops_at_infinite() {
        assert_eq!(Rank(100).saturating_increase(156), Rank(256));
        assert_eq!(Rank(0xFF00).saturating_increase(0x00FF), Rank::INFINITE);
        assert_eq!(Rank(0xFF00).saturating_increase(0x0100), Rank::INFINITE);
        assert_eq!(Rank::INFINITE.saturating_increase(0), Rank::INFINITE);
        assert_eq!(Rank::INFINITE.saturating_increase(1), Rank::INFINITE);
    }
}
