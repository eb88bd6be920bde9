#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Fuzzy multi-metric RPL objective function (radio-agnostic).
//!
//! This crate turns link observations into RPL routing decisions. The clock,
//! the duty-cycle counters and the fuzzy rule base are reached through the
//! `fuzzyof_traits` seams.
//!
//! ## Architecture
//!
//! - **Link estimation**: ETX and delay EWMAs per parent (`link_stats`, `pending`)
//! - **Energy**: Battery charge from duty-cycle counters, linear or with recovery (`energy`)
//! - **Scoring**: Reference `RampScorer` for the `FuzzyScorer` contract (`scorer`)
//! - **Rank**: Quality-scaled rank increase with saturation (`rank`)
//! - **Selection**: Preferred DAG and parent with hysteresis (`selection`)
//! - **Container**: Outgoing metric container and its RFC 6551 encoding (`container`)
//! - **Objective functions**: `FuzzyOf` and `EtxOf` behind `ObjectiveFunction` (`of`)
//!
//! ## Fixed-Point Scales
//!
//! ETX is carried ×100 (`ETX_DIVISOR`), latency in milliseconds, residual
//! energy on `0..=255` and fuzzy scores on `0..=100`. All arithmetic is
//! integer and saturating; `Rank::INFINITE` is the only unreachable rank.

pub mod builder;
pub mod config;
pub mod container;
pub mod conversions;
pub mod dag;
pub mod energy;
pub mod error;
pub mod fixed_point;
pub mod link_stats;
pub mod mocks;
pub mod of;
pub mod pending;
pub mod rank;
pub mod scorer;
pub mod selection;
pub mod types;
pub mod util;

pub use builder::{DynFuzzyOf, FuzzyOfBuilder, build_etx_of, build_fuzzy_of};
pub use config::{
    ContainerCfg, CounterMode, CurrentDraw, DischargeKind, EnergyCfg, LinkCfg, OfSettings,
    ParentOrdering, RankCfg, ScorerCfg, SelectionCfg,
};
pub use container::{
    Aggregation, EnergyObject, EnergySource, McType, MetricContainer, MetricObject,
};
pub use dag::{Dag, Instance, Parent, ParentPair, ParentRef};
pub use energy::EnergyModel;
pub use error::{BuildError, ContainerError, Result};
pub use link_stats::{LinkEstimator, LinkStats, MacTiming, TxOutcome, TxStatus};
pub use of::{EtxOf, FuzzyOf, ObjectiveFunction, on_parent_transmission, remove_parent};
pub use pending::{PendingHandle, PushOutcome};
pub use scorer::RampScorer;
pub use types::{LinkAddr, Rank};
