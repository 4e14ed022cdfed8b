//! Human-readable error descriptions and structured JSON error formatting.

use totalizer_core::{BuildError, TotalizerError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => {
                "What happened: No weight source was provided to the totalizer.\nLikely causes: The source was not wired into the builder.\nHow to fix: Pass a source via with_source(...).".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No totals store was provided to the totalizer.\nLikely causes: The store was not wired into the builder.\nHow to fix: Pass a store via with_store(...).".to_string()
            }
            BuildError::NoChannels => {
                "What happened: No channels are configured.\nLikely causes: The config has no [[channel]] tables.\nHow to fix: Add at least one [[channel]] with a capacity and a mode.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid channel configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the [[channel]] tables in the config, then rerun."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TotalizerError>() {
        return match te {
            TotalizerError::Persistence(msg) => format!(
                "What happened: Totals could not be saved ({msg}).\nLikely causes: The store directory does not exist or is not writable.\nHow to fix: Check store.path in the config and the permissions of its directory."
            ),
            TotalizerError::Timeout => {
                "What happened: Weight read timed out.\nLikely causes: The front end stopped answering.\nHow to fix: Check the sensor link and rerun.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config or trace loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 't_ms,channel,weight,motion,overload,command'.".to_string();
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path.\nHow to fix: Point --config at a readable TOML file. Original: {msg}"
        );
    }

    if lower.contains("parse config") || lower.contains("channel[") || lower.contains("at least one [[channel]]") {
        return format!(
            "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Missing [[channel]] tables or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("unknown total mode") {
        return format!(
            "What happened: {msg}.\nHow to fix: Use one of disabled, auto-load, auto-normal, auto-peak, on-command, on-accept, load-drop."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable short name for the error class, used as the JSON `reason`.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<TotalizerError>() {
        Some(TotalizerError::Persistence(_)) => "Persistence",
        Some(TotalizerError::Sensor(_) | TotalizerError::SensorFault(_)) => "Sensor",
        Some(TotalizerError::Timeout) => "Timeout",
        Some(TotalizerError::State(_)) => "State",
        None => "Error",
    }
}

/// Map typed errors to stable exit codes; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<TotalizerError>() {
        Some(TotalizerError::Persistence(_)) => 4,
        Some(
            TotalizerError::Sensor(_) | TotalizerError::SensorFault(_) | TotalizerError::Timeout,
        ) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
