//! DAG metric container: data model, RFC 6551 wire codec and the aggregation
//! step that derives the outgoing container from the preferred parent.
//!
//! Wire layout (header then object):
//!
//! ```text
//! byte 0      type
//! byte 1      flags >> 1
//! byte 2      (flags & 1) << 7 | aggregation << 4 | precedence
//! byte 3      object length
//! Fuzzy obj   etx u16 | latency u16 | hopcount u16 | energy flags u8 | energy est u8   (big endian)
//! ETX obj     etx u16
//! ```

use fuzzyof_traits::FuzzyScorer;

use crate::config::ContainerCfg;
use crate::dag::{Dag, Instance};
use crate::error::ContainerError;
use crate::fixed_point::sat_add_u16;
use crate::scorer::{quality_of, qos_of};
use crate::types::{ETX_DIVISOR, LinkAddr, MAX_ENERGY, MAX_PATH_COST};

pub const HEADER_LEN: usize = 4;
pub const FUZZY_OBJECT_LEN: u8 = 8;
pub const ETX_OBJECT_LEN: u8 = 2;

/// The P (path) flag: the object describes a whole path, not a single link.
pub const FLAG_P: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum McType {
    #[default]
    None = 0,
    Etx = 7,
    /// Combined ETX/latency/hopcount/energy object.
    Fuzzy = 9,
}

impl McType {
    /// Object length carried by this container type.
    pub const fn object_len(self) -> u8 {
        match self {
            McType::None => 0,
            McType::Etx => ETX_OBJECT_LEN,
            McType::Fuzzy => FUZZY_OBJECT_LEN,
        }
    }
}

impl TryFrom<u8> for McType {
    type Error = ContainerError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(McType::None),
            7 => Ok(McType::Etx),
            9 => Ok(McType::Fuzzy),
            other => Err(ContainerError::UnknownType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Aggregation {
    #[default]
    Additive = 0,
    Maximum = 1,
    Minimum = 2,
    Multiplicative = 3,
}

impl TryFrom<u8> for Aggregation {
    type Error = ContainerError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Aggregation::Additive),
            1 => Ok(Aggregation::Maximum),
            2 => Ok(Aggregation::Minimum),
            3 => Ok(Aggregation::Multiplicative),
            other => Err(ContainerError::UnknownAggregation(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EnergySource {
    #[default]
    Mains = 0,
    Battery = 1,
    Scavenging = 2,
}

/// Energy part of the metric object: node-type flags and a 0..=255 estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnergyObject {
    pub flags: u8,
    pub est: u8,
}

impl EnergyObject {
    pub const fn new(source: EnergySource, est: u8) -> Self {
        Self {
            flags: (source as u8) << 1,
            est,
        }
    }

    /// Source encoded in `flags`, if it is one of the known kinds.
    pub fn source(&self) -> Option<EnergySource> {
        match (self.flags >> 1) & 0x03 {
            0 => Some(EnergySource::Mains),
            1 => Some(EnergySource::Battery),
            2 => Some(EnergySource::Scavenging),
            _ => None,
        }
    }
}

/// Path metrics advertised by a node. ETX on the ×100 scale, latency in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricObject {
    pub etx: u16,
    pub latency: u16,
    pub hopcount: u16,
    pub energy: EnergyObject,
}

impl MetricObject {
    /// What a DODAG root advertises.
    pub const ROOT: MetricObject = MetricObject {
        etx: 0,
        latency: 0,
        hopcount: 0,
        energy: EnergyObject::new(EnergySource::Mains, MAX_ENERGY),
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricContainer {
    pub mc_type: McType,
    pub flags: u8,
    pub aggregation: Aggregation,
    pub precedence: u8,
    pub length: u8,
    pub obj: MetricObject,
}

impl MetricContainer {
    /// Bytes `encode` writes.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + usize::from(self.length)
    }

    /// Serialize into `buf`, returning the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, ContainerError> {
        let need = self.encoded_len();
        if buf.len() < need {
            return Err(ContainerError::BufferTooSmall {
                need,
                got: buf.len(),
            });
        }
        if self.length != self.mc_type.object_len() {
            return Err(ContainerError::BadLength(self.length));
        }
        buf[0] = self.mc_type as u8;
        buf[1] = self.flags >> 1;
        buf[2] = ((self.flags & 1) << 7)
            | (((self.aggregation as u8) & 0x07) << 4)
            | (self.precedence & 0x0F);
        buf[3] = self.length;
        let body = &mut buf[HEADER_LEN..need];
        match self.mc_type {
            McType::None => {}
            McType::Etx => body.copy_from_slice(&self.obj.etx.to_be_bytes()),
            McType::Fuzzy => {
                body[0..2].copy_from_slice(&self.obj.etx.to_be_bytes());
                body[2..4].copy_from_slice(&self.obj.latency.to_be_bytes());
                body[4..6].copy_from_slice(&self.obj.hopcount.to_be_bytes());
                body[6] = self.obj.energy.flags;
                body[7] = self.obj.energy.est;
            }
        }
        Ok(need)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        let mut buf = vec![0u8; self.encoded_len()];
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Parse one container from the front of `buf`; trailing bytes are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, ContainerError> {
        if buf.len() < HEADER_LEN {
            return Err(ContainerError::Truncated {
                need: HEADER_LEN,
                got: buf.len(),
            });
        }
        let mc_type = McType::try_from(buf[0])?;
        let flags = (buf[1] << 1) | (buf[2] >> 7);
        let aggregation = Aggregation::try_from((buf[2] >> 4) & 0x07)?;
        let precedence = buf[2] & 0x0F;
        let length = buf[3];
        if length != mc_type.object_len() {
            return Err(ContainerError::BadLength(length));
        }
        let need = HEADER_LEN + usize::from(length);
        if buf.len() < need {
            return Err(ContainerError::Truncated {
                need,
                got: buf.len(),
            });
        }
        let body = &buf[HEADER_LEN..need];
        let be16 = |i: usize| u16::from_be_bytes([body[i], body[i + 1]]);
        let obj = match mc_type {
            McType::None => MetricObject::default(),
            McType::Etx => MetricObject {
                etx: be16(0),
                ..MetricObject::default()
            },
            McType::Fuzzy => MetricObject {
                etx: be16(0),
                latency: be16(2),
                hopcount: be16(4),
                energy: EnergyObject {
                    flags: body[6],
                    est: body[7],
                },
            },
        };
        Ok(Self {
            mc_type,
            flags,
            aggregation,
            precedence,
            length,
            obj,
        })
    }
}

// ── Aggregation ──────────────────────────────────────────────────────────────

/// Metric object of a joined, non-root node without a usable parent.
pub fn worst_case_object(cfg: &ContainerCfg) -> MetricObject {
    MetricObject {
        etx: MAX_PATH_COST * ETX_DIVISOR,
        latency: cfg.max_delay_ms,
        hopcount: cfg.hopcount_max,
        energy: EnergyObject::new(EnergySource::Battery, 0),
    }
}

/// Object a joined node advertises, with the parent it was derived from.
/// `None` while the DAG is not joined.
pub fn derive_fuzzy_object(
    dag: &Dag,
    own_charge: u8,
    cfg: &ContainerCfg,
) -> Option<(MetricObject, Option<LinkAddr>)> {
    if !dag.joined {
        return None;
    }
    if dag.is_root() {
        return Some((MetricObject::ROOT, None));
    }
    let Some(p) = dag.preferred_parent() else {
        return Some((worst_case_object(cfg), None));
    };
    let obj = MetricObject {
        etx: sat_add_u16(p.mc.etx, p.link.etx),
        latency: sat_add_u16(p.mc.latency, p.link.delay_ms).min(cfg.max_delay_ms),
        hopcount: p.mc.hopcount.saturating_add(1).min(cfg.hopcount_max),
        energy: EnergyObject::new(EnergySource::Battery, own_charge.min(p.mc.energy.est)),
    };
    Some((obj, Some(p.addr)))
}

/// Refresh the fuzzy container of `instance` from its current DAG.
///
/// Nothing is written while the DAG is not joined. Otherwise the header is
/// reset and the root advertises `MetricObject::ROOT`, while other nodes
/// extend the preferred parent's advertisement by their link to it.
pub fn update_fuzzy_container<S: FuzzyScorer + ?Sized>(
    instance: &mut Instance,
    own_charge: u8,
    cfg: &ContainerCfg,
    scorer: &S,
) {
    let next = derive_fuzzy_object(instance.dag(), own_charge, cfg);

    let Some((obj, via)) = next else {
        tracing::debug!("DAG not joined; metric container left unchanged");
        return;
    };
    let mc = instance.container_mut();
    mc.mc_type = McType::Fuzzy;
    mc.flags = FLAG_P;
    mc.aggregation = Aggregation::Additive;
    mc.precedence = 0;
    mc.length = FUZZY_OBJECT_LEN;
    mc.obj = obj;
    log_object(&obj, via, scorer);
}

/// ETX-only counterpart of `update_fuzzy_container`.
pub fn update_etx_container(instance: &mut Instance) {
    let next = {
        let dag = instance.dag();
        if !dag.joined {
            None
        } else if dag.is_root() {
            Some(0)
        } else {
            Some(dag.preferred_parent().map_or(MAX_PATH_COST * ETX_DIVISOR, |p| {
                sat_add_u16(p.mc.etx, p.link.etx)
            }))
        }
    };

    let Some(etx) = next else {
        tracing::debug!("DAG not joined; metric container left unchanged");
        return;
    };
    let mc = instance.container_mut();
    mc.mc_type = McType::Etx;
    mc.flags = FLAG_P;
    mc.aggregation = Aggregation::Additive;
    mc.precedence = 0;
    mc.length = ETX_OBJECT_LEN;
    mc.obj = MetricObject {
        etx,
        ..MetricObject::default()
    };
    tracing::debug!(etx, "ETX metric container updated");
}

fn log_object<S: FuzzyScorer + ?Sized>(obj: &MetricObject, via: Option<LinkAddr>, scorer: &S) {
    tracing::debug!(
        via = ?via,
        etx = obj.etx,
        latency = obj.latency,
        hopcount = obj.hopcount,
        energy = obj.energy.est,
        qos = qos_of(scorer, obj),
        quality = quality_of(scorer, obj),
        "metric container updated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_header_layout() {
        let mc = MetricContainer {
            mc_type: McType::Fuzzy,
            flags: FLAG_P,
            aggregation: Aggregation::Additive,
            precedence: 0,
            length: FUZZY_OBJECT_LEN,
            obj: MetricObject {
                etx: 0x0102,
                latency: 0x0304,
                hopcount: 0x0506,
                energy: EnergyObject::new(EnergySource::Battery, 0x7F),
            },
        };
        let bytes = mc.to_bytes().unwrap();
        assert_eq!(
            bytes,
            vec![9, 0x04, 0x00, 8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x02, 0x7F]
        );
        assert_eq!(MetricContainer::decode(&bytes).unwrap(), mc);
    }

    #[test]
    fn low_flag_bit_and_aggregation_share_byte_two() {
        let mc = MetricContainer {
            mc_type: McType::Etx,
            flags: 0x09,
            aggregation: Aggregation::Minimum,
            precedence: 5,
            length: ETX_OBJECT_LEN,
            obj: MetricObject {
                etx: 256,
                ..MetricObject::default()
            },
        };
        let bytes = mc.to_bytes().unwrap();
        assert_eq!(bytes, vec![7, 0x04, 0x80 | 0x20 | 0x05, 2, 0x01, 0x00]);
        assert_eq!(MetricContainer::decode(&bytes).unwrap(), mc);
    }

    #[test]
    fn energy_source_round_trips_through_flags() {
        for s in [
            EnergySource::Mains,
            EnergySource::Battery,
            EnergySource::Scavenging,
        ] {
            assert_eq!(EnergyObject::new(s, 1).source(), Some(s));
        }
        assert_eq!(EnergyObject { flags: 0x06, est: 0 }.source(), None);
    }
}
