//! Trace replay: feed recorded MAC outcomes through the objective function and
//! report link metrics, parent choice, rank and the advertised container.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use eyre::{Result, WrapErr};
use fuzzyof_config::{Config, TraceRow, TraceStatus};
use fuzzyof_core::{LinkAddr, Rank, TxOutcome, on_parent_transmission};
use serde_json::{Value, json};

use crate::node::{Engine, Node};

/// Walks simulated time forward, refreshing the energy estimate once per
/// `period_ms` on the way.
struct Replayer {
    node: Node,
    now_ms: u64,
    next_energy_ms: u64,
    period_ms: u64,
}

impl Replayer {
    fn new(node: Node, period_ms: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            node,
            now_ms: 0,
            next_energy_ms: period_ms,
            period_ms,
        }
    }

    fn advance_to(&mut self, t_ms: u64) {
        while self.next_energy_ms <= t_ms {
            self.step_sim(self.next_energy_ms);
            if let Engine::Fuzzy(of) = &mut self.node.engine {
                of.update_energy();
            }
            self.next_energy_ms += self.period_ms;
        }
        self.step_sim(t_ms);
    }

    fn step_sim(&mut self, t_ms: u64) {
        if t_ms <= self.now_ms {
            return;
        }
        self.node.sim.advance(t_ms - self.now_ms);
        self.now_ms = t_ms;
        self.node.clock.set_offset(Duration::from_millis(t_ms));
    }

    /// Apply one trace row. Returns `false` if the neighbor is not a parent.
    fn apply(&mut self, addr: LinkAddr, row: &TraceRow) -> bool {
        self.advance_to(row.t_ms);
        if self.node.instance.dag().parent(addr).is_none() {
            tracing::warn!(%addr, t_ms = row.t_ms, "trace row for unknown neighbor skipped");
            return false;
        }
        let outcome = match row.status {
            TraceStatus::Ok => TxOutcome::ok(row.attempts),
            TraceStatus::Noack => TxOutcome::no_ack(row.attempts),
            TraceStatus::Other => TxOutcome::other(),
        };
        // Without a delay the send time is unknown and no delay sample is taken.
        if let Some(d) = row.delay_ms {
            let queued = self.node.engine.of_mut().record_send(addr);
            if !queued.is_queued() {
                tracing::debug!(%addr, ?queued, "send not tracked");
            }
            self.advance_to(row.t_ms + u64::from(d));
        }
        on_parent_transmission(
            self.node.engine.of_mut(),
            self.node.instance.dag_mut(),
            addr,
            &outcome,
        )
    }
}

pub fn run_replay(cfg: &Config, trace: &Path, summary: bool, json_out: bool) -> Result<()> {
    let rows = fuzzyof_config::load_trace_csv(trace)?;
    let node = Node::from_config(cfg)?;
    let mut rp = Replayer::new(node, cfg.energy.period_ms);
    rp.node.refresh();
    tracing::info!(rows = rows.len(), trace = %trace.display(), "replay start");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (i, row) in rows.iter().enumerate() {
        let addr: LinkAddr = row
            .neighbor
            .parse()
            .map_err(|e| eyre::eyre!("trace row {}: {e}", i + 1))?;
        let known = rp.apply(addr, row);
        let preferred = rp.node.refresh();
        if summary {
            continue;
        }
        let line = row_line(&rp.node, addr, row, known, preferred)?;
        if json_out {
            writeln!(out, "{line}")?;
        } else {
            writeln!(out, "{}", row_text(&line))?;
        }
    }

    let fin = final_line(&rp.node, rows.len())?;
    if json_out {
        writeln!(out, "{fin}")?;
    } else {
        writeln!(
            out,
            "replay complete: {} rows, preferred={}, rank={}, container={}",
            rows.len(),
            fin["preferred"].as_str().unwrap_or("none"),
            rank_text(&fin["rank"]),
            fin["container"].as_str().unwrap_or("")
        )?;
    }
    tracing::info!(rows = rows.len(), "replay complete");
    Ok(())
}

fn status_name(s: TraceStatus) -> &'static str {
    match s {
        TraceStatus::Ok => "ok",
        TraceStatus::Noack => "noack",
        TraceStatus::Other => "other",
    }
}

fn rank_json(rank: Rank) -> Value {
    if rank.is_infinite() {
        Value::Null
    } else {
        json!(rank.get())
    }
}

fn rank_text(v: &Value) -> String {
    v.as_u64().map_or_else(|| "inf".to_string(), |r| r.to_string())
}

fn container_hex(node: &Node) -> Result<String> {
    let bytes = node
        .instance
        .container()
        .to_bytes()
        .wrap_err("encode metric container")?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

fn row_line(
    node: &Node,
    addr: LinkAddr,
    row: &TraceRow,
    known: bool,
    preferred: Option<LinkAddr>,
) -> Result<Value> {
    let link = node.instance.dag().parent(addr).map(|p| p.link);
    Ok(json!({
        "t_ms": row.t_ms,
        "neighbor": addr.to_string(),
        "status": status_name(row.status),
        "attempts": row.attempts,
        "known": known,
        "etx": link.map(|l| l.etx),
        "delay_ms": link.map(|l| l.delay_ms),
        "preferred": preferred.map(|a| a.to_string()),
        "rank": rank_json(node.instance.dag().rank),
        "charge": node.engine.charge(),
        "container": container_hex(node)?,
    }))
}

fn row_text(v: &Value) -> String {
    let num = |k: &str| v[k].as_u64().map_or_else(|| "-".to_string(), |n| n.to_string());
    format!(
        "t={}ms {} {} etx={} delay={} preferred={} rank={}",
        num("t_ms"),
        v["neighbor"].as_str().unwrap_or("?"),
        v["status"].as_str().unwrap_or("?"),
        num("etx"),
        num("delay_ms"),
        v["preferred"].as_str().unwrap_or("none"),
        rank_text(&v["rank"]),
    )
}

fn final_line(node: &Node, rows: usize) -> Result<Value> {
    let dag = node.instance.dag();
    let parents: Vec<Value> = dag
        .parents()
        .map(|p| {
            json!({
                "addr": p.addr.to_string(),
                "rank": rank_json(p.rank),
                "etx": p.link.etx,
                "delay_ms": p.link.delay_ms,
            })
        })
        .collect();
    Ok(json!({
        "summary": true,
        "objective": node.engine.name(),
        "ocp": node.engine.of().ocp(),
        "rows": rows,
        "preferred": dag.preferred_parent().map(|p| p.addr.to_string()),
        "rank": rank_json(dag.rank),
        "charge": node.engine.charge(),
        "container": container_hex(node)?,
        "parents": parents,
    }))
}
