//! Human-readable error descriptions and structured JSON error formatting.

use fuzzyof_core::{BuildError, ContainerError};

/// Coarse error class; drives the exit code and the JSON `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Trace,
    Container,
    Other,
}

impl ErrorKind {
    pub const fn reason(self) -> &'static str {
        match self {
            ErrorKind::Config => "InvalidConfig",
            ErrorKind::Trace => "InvalidTrace",
            ErrorKind::Container => "Container",
            ErrorKind::Other => "Error",
        }
    }
}

pub fn classify(err: &eyre::Report) -> ErrorKind {
    if err.downcast_ref::<BuildError>().is_some() {
        return ErrorKind::Config;
    }
    if err.downcast_ref::<ContainerError>().is_some() {
        return ErrorKind::Container;
    }
    let chain: Vec<String> = err
        .chain()
        .map(|c| c.to_string().to_ascii_lowercase())
        .collect();
    let any = |needle: &str| chain.iter().any(|m| m.contains(needle));
    if any("trace csv") || any("trace row") || any("invalid csv row") || any("trace rows") {
        ErrorKind::Trace
    } else if any("config") || any("neighbor[") || any("simulation profile") {
        ErrorKind::Config
    } else {
        ErrorKind::Other
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDutyCycle => {
                "What happened: No duty-cycle source was provided to the objective function.\nLikely causes: The builder was used without with_duty_cycle(...).\nHow to fix: Pass the energest counters (or a simulated source) to the builder.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `fuzzyof check-config`."
            ),
        };
    }
    if let Some(ce) = err.downcast_ref::<ContainerError>() {
        return format!(
            "What happened: Metric container could not be encoded ({ce}).\nLikely causes: Inconsistent container header.\nHow to fix: Re-run with --log-level=debug and report the trace."
        );
    }

    let msg = err.to_string();
    let root = err.root_cause().to_string();
    let lower = format!("{msg} {root}").to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 't_ms,neighbor,status,attempts,delay_ms'."
            .to_string();
    }
    if lower.contains("trace rows must be ordered") {
        return format!(
            "What happened: Trace rows go back in time ({root}).\nHow to fix: Sort the trace by t_ms."
        );
    }

    match classify(err) {
        ErrorKind::Config => format!(
            "What happened: Configuration is invalid or unreadable: {root}.\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Edit the TOML config (see --config) and try again."
        ),
        ErrorKind::Trace => format!(
            "What happened: The transmission trace could not be used: {root}.\nHow to fix: Check the trace CSV (t_ms,neighbor,status,attempts,delay_ms)."
        ),
        _ => {
            let cause = if root == msg {
                String::new()
            } else {
                format!(" Cause: {root}")
            };
            format!(
                "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
            )
        }
    }
}

/// Stable exit codes: 2 config, 3 trace, 4 container, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match classify(err) {
        ErrorKind::Config => 2,
        ErrorKind::Trace => 3,
        ErrorKind::Container => 4,
        ErrorKind::Other => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": classify(err).reason(),
        "message": humanize(err),
        "cause": err.root_cause().to_string(),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn build_errors_are_config_errors() {
        let err = eyre::Report::new(BuildError::InvalidConfig("link.alpha must be < 100"));
        assert_eq!(exit_code_for_error(&err), 2);
        assert!(humanize(&err).contains("link.alpha must be < 100"));
    }

    #[test]
    fn trace_context_wins_over_generic() {
        let err: eyre::Result<()> = Err(eyre::eyre!("trace rows must be ordered by t_ms: row 3"));
        let err = err.wrap_err("replay").unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Trace);
        assert!(humanize(&err).contains("Sort the trace"));
    }

    #[test]
    fn json_carries_reason_and_cause() {
        let err = eyre::eyre!("disk on fire");
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Error");
        assert_eq!(v["cause"], "disk on fire");
    }
}
