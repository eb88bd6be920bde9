//! Type-state builder for `FuzzyOf` and generic `build_fuzzy_of` constructor.
//!
//! The builder enforces at compile time that a duty-cycle source is provided
//! before `build()` is available. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use fuzzyof_traits::clock::{Clock, MonotonicClock};
use fuzzyof_traits::{DutyCycleSource, FuzzyScorer};

use crate::config::*;
use crate::energy::EnergyModel;
use crate::error::{BuildError, Result};
use crate::link_stats::LinkEstimator;
use crate::of::{EtxOf, FuzzyOf};
use crate::scorer::RampScorer;

/// Dynamically dispatched `FuzzyOf`, as produced by the builder.
pub type DynFuzzyOf = FuzzyOf<Box<dyn DutyCycleSource>, Box<dyn FuzzyScorer>>;

impl DynFuzzyOf {
    /// Start building a FuzzyOf.
    pub fn builder() -> FuzzyOfBuilder<Missing> {
        FuzzyOfBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `FuzzyOf`. All settings are validated on `build()`.
pub struct FuzzyOfBuilder<D> {
    duty_cycle: Option<Box<dyn DutyCycleSource>>,
    scorer: Option<Box<dyn FuzzyScorer>>,
    settings: OfSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _d: PhantomData<D>,
}

impl Default for FuzzyOfBuilder<Missing> {
    fn default() -> Self {
        Self {
            duty_cycle: None,
            scorer: None,
            settings: OfSettings::default(),
            clock: None,
            _d: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate_link(link: &LinkCfg) -> Result<()> {
    if link.alpha >= LinkCfg::EWMA_SCALE {
        return Err(invalid("link.alpha must be < 100"));
    }
    if link.max_link_metric == 0 {
        return Err(invalid("link.max_link_metric must be > 0"));
    }
    if link.max_link_metric.checked_mul(crate::types::ETX_DIVISOR).is_none() {
        return Err(invalid("link.max_link_metric too large for the ETX scale"));
    }
    if link.max_delay_ms == 0 {
        return Err(invalid("link.max_delay_ms must be > 0"));
    }
    if link.noack_delay_penalty_ms > link.max_delay_ms {
        return Err(invalid("link.noack_delay_penalty_ms must be <= link.max_delay_ms"));
    }
    if link.pending_timeout_ms == 0 {
        return Err(invalid("link.pending_timeout_ms must be > 0"));
    }
    Ok(())
}

/// Validate settings and construct a `FuzzyOf`.
///
/// This is the single source of truth for validation and construction,
/// used by both `FuzzyOfBuilder::try_build()` and `build_fuzzy_of()`.
fn validate_and_build<D: DutyCycleSource, S: FuzzyScorer>(
    duty_cycle: D,
    scorer: S,
    settings: OfSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<FuzzyOf<D, S>> {
    // ── Validation ───────────────────────────────────────────────────────────
    validate_link(&settings.link)?;
    if settings.energy.capacity_mah == 0 {
        return Err(invalid("energy.capacity_mah must be > 0"));
    }
    if settings.energy.period_ms == 0 {
        return Err(invalid("energy.period_ms must be > 0"));
    }
    if let DischargeKind::Recovery {
        beta_sq_per_min,
        modes,
    } = settings.energy.discharge
    {
        if !beta_sq_per_min.is_finite() || beta_sq_per_min <= 0.0 {
            return Err(invalid("energy.beta_sq_per_min must be finite and > 0"));
        }
        if modes == 0 {
            return Err(invalid("energy.modes must be >= 1"));
        }
    }
    if settings.rank.quality_rank_divisor == 0 {
        return Err(invalid("rank.quality_rank_divisor must be > 0"));
    }
    if settings.container.hopcount_max == 0 {
        return Err(invalid("container.hopcount_max must be > 0"));
    }
    // latency is aggregated on the same scale the link estimator clamps to
    if settings.container.max_delay_ms != settings.link.max_delay_ms {
        return Err(invalid("container.max_delay_ms must equal link.max_delay_ms"));
    }

    // ── Assemble ─────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let link = LinkEstimator::new(settings.link.clone(), clock);
    let energy = EnergyModel::new(duty_cycle, settings.energy.clone());

    tracing::debug!(?settings, "fuzzy objective function built");
    Ok(FuzzyOf {
        settings,
        link,
        energy,
        scorer,
    })
}

impl<D> FuzzyOfBuilder<D> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<DynFuzzyOf> {
        let duty_cycle = self
            .duty_cycle
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDutyCycle))?;
        let scorer = self
            .scorer
            .unwrap_or_else(|| Box::new(RampScorer::default()));
        validate_and_build(duty_cycle, scorer, self.settings, self.clock)
    }
}

/// Chainable setters that do not affect type-state.
impl<D> FuzzyOfBuilder<D> {
    pub fn with_settings(mut self, settings: OfSettings) -> Self {
        self.settings = settings;
        self
    }
    pub fn with_link(mut self, link: LinkCfg) -> Self {
        self.settings.link = link;
        self
    }
    pub fn with_energy(mut self, energy: EnergyCfg) -> Self {
        self.settings.energy = energy;
        self
    }
    pub fn with_rank(mut self, rank: RankCfg) -> Self {
        self.settings.rank = rank;
        self
    }
    pub fn with_selection(mut self, selection: SelectionCfg) -> Self {
        self.settings.selection = selection;
        self
    }
    pub fn with_container(mut self, container: ContainerCfg) -> Self {
        self.settings.container = container;
        self
    }
    /// Replace the default `RampScorer`.
    pub fn with_scorer(mut self, scorer: impl FuzzyScorer + 'static) -> Self {
        self.scorer = Some(Box::new(scorer));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl FuzzyOfBuilder<Missing> {
    pub fn with_duty_cycle(
        self,
        source: impl DutyCycleSource + 'static,
    ) -> FuzzyOfBuilder<Set> {
        FuzzyOfBuilder {
            duty_cycle: Some(Box::new(source)),
            scorer: self.scorer,
            settings: self.settings,
            clock: self.clock,
            _d: PhantomData,
        }
    }
}

impl FuzzyOfBuilder<Set> {
    /// Validate and build. Only available once the duty-cycle source is set.
    pub fn build(self) -> Result<DynFuzzyOf> {
        self.try_build()
    }
}

/// Build a statically dispatched `FuzzyOf` from a concrete source and scorer.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_fuzzy_of<D, S>(
    duty_cycle: D,
    scorer: S,
    settings: OfSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<FuzzyOf<D, S>>
where
    D: DutyCycleSource,
    S: FuzzyScorer,
{
    validate_and_build(duty_cycle, scorer, settings, clock)
}

/// Build an `EtxOf` after validating its link settings.
pub fn build_etx_of(link: LinkCfg, clock: Option<Box<dyn Clock + Send + Sync>>) -> Result<EtxOf> {
    validate_link(&link)?;
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    Ok(EtxOf::new(link, clock))
}
