//! Battery model run over the simulated duty cycle, one line per period.

use std::io::Write;

use eyre::Result;
use fuzzyof_config::Config;
use fuzzyof_core::{EnergyCfg, EnergyModel};
use serde_json::json;

use crate::node::sim_duty_cycle;

pub fn run_energy(cfg: &Config, periods: u32, mains_from: Option<u32>, json_out: bool) -> Result<()> {
    let (duty_cycle, sim) = sim_duty_cycle(cfg)?;
    let ecfg = EnergyCfg::from(&cfg.energy);
    let period_ms = ecfg.period_ms;
    let mut model = EnergyModel::new(duty_cycle, ecfg);
    tracing::info!(
        periods,
        period_ms,
        rated = model.rated(),
        "energy simulation start"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for n in 1..=periods {
        if mains_from == Some(n) {
            model.set_mains_powered(true);
        }
        sim.advance(period_ms);
        model.update();
        let t_ms = u64::from(n) * period_ms;
        if json_out {
            let line = json!({
                "period": n,
                "t_ms": t_ms,
                "charge": model.charge(),
                "fraction": model.fraction(),
                "remaining": model.remaining(),
                "mains": model.is_mains_powered(),
                "exhausted": model.is_exhausted(),
            });
            writeln!(out, "{line}")?;
        } else {
            writeln!(
                out,
                "period={n} t={t_ms}ms charge={}.{:04} remaining={}{}",
                model.charge(),
                model.fraction(),
                model.remaining(),
                if model.is_mains_powered() { " (mains)" } else { "" }
            )?;
        }
    }
    tracing::info!(charge = model.charge(), "energy simulation complete");
    Ok(())
}
