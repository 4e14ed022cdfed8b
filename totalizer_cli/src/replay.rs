//! Trace replay: drive the engine from a recorded CSV through the simulated source.

use std::path::Path;
use std::time::Duration;

use serde_json::json;
use totalizer_config::{Config, TraceCommand, TraceRow};
use totalizer_core::{
    ChannelConfig, CommandOutcome, CommitOutcome, FileStore, MemoryStore, TotalStatus,
    TotalizerCore, TotalsStore, build_totalizer,
};
use totalizer_hardware::SimulatedSource;
use totalizer_traits::{Countby, ManualClock, WeightSnapshot, WeightSource};

pub fn commit_outcome_name(c: &CommitOutcome) -> &'static str {
    match c {
        CommitOutcome::Counted(_) => "counted",
        CommitOutcome::Saturated(_) => "saturated",
        CommitOutcome::Vetoed(_) => "vetoed",
    }
}

pub fn command_outcome_name(c: &CommandOutcome) -> &'static str {
    match c {
        CommandOutcome::Ignored => "ignored",
        CommandOutcome::AutoPaused => "auto-paused",
        CommandOutcome::AutoResumed => "auto-resumed",
        CommandOutcome::LoadDropArmed => "load-drop-armed",
        CommandOutcome::Committed(_) => "committed",
        CommandOutcome::Pending { .. } => "pending",
    }
}

fn command_name(c: TraceCommand) -> &'static str {
    match c {
        TraceCommand::Total => "total",
        TraceCommand::Clear => "clear",
        TraceCommand::Remove => "remove",
        TraceCommand::Skip => "skip",
    }
}

/// Replay `trace` against the configured channels.
///
/// With `persist` the totals go to `cfg.store.path`; otherwise they live in
/// memory for the duration of the run.
pub fn run_replay(cfg: &Config, trace: &Path, persist: bool, json: bool) -> eyre::Result<()> {
    let rows = totalizer_config::load_trace_csv(trace)?;
    for (i, row) in rows.iter().enumerate() {
        if row.channel >= cfg.channels.len() {
            eyre::bail!(
                "trace row {} references channel {} but only {} configured",
                i + 2,
                row.channel,
                cfg.channels.len()
            );
        }
    }

    let mut source = SimulatedSource::new();
    for ch in &cfg.channels {
        let countby = Countby {
            decimals: ch.sensor.decimals,
            increment: ch.sensor.increment,
        };
        source.add_channel(countby, ch.sensor.interval_ms());
    }
    let channels: Vec<ChannelConfig> = cfg.channels.iter().map(ChannelConfig::from).collect();
    let clock = ManualClock::new();

    tracing::info!(
        rows = rows.len(),
        channels = channels.len(),
        persist,
        "replay start"
    );
    if persist {
        let store = FileStore::open(&cfg.store.path)?;
        let t = build_totalizer(source, store, channels, Some(Box::new(clock.clone())))?;
        drive(t, &rows, &clock, json)
    } else {
        let t = build_totalizer(
            source,
            MemoryStore::new(),
            channels,
            Some(Box::new(clock.clone())),
        )?;
        drive(t, &rows, &clock, json)
    }
}

fn drive<P: TotalsStore>(
    mut t: TotalizerCore<SimulatedSource, P>,
    rows: &[TraceRow],
    clock: &ManualClock,
    json: bool,
) -> eyre::Result<()> {
    let sim = t.source().handle();
    for row in rows {
        clock.set_offset(Duration::from_millis(row.t_ms));
        sim.set(
            row.channel,
            WeightSnapshot {
                weight: row.weight,
                in_motion: row.motion,
                overloaded: row.overload,
                active: true,
            },
        );

        if let Some(TotalStatus::Committed(c)) = t.evaluate(row.channel) {
            print_commit(&t, row, &c, json);
        }
        if let Some(cmd) = row.command {
            apply_command(&mut t, row, cmd, json);
        }
    }

    for ch in 0..t.channel_count() {
        print_summary(&t, ch, json);
    }
    tracing::info!(rows = rows.len(), "replay complete");
    Ok(())
}

fn apply_command<W: WeightSource, P: TotalsStore>(
    t: &mut TotalizerCore<W, P>,
    row: &TraceRow,
    cmd: TraceCommand,
    json: bool,
) {
    let ch = row.channel;
    match cmd {
        TraceCommand::Total => {
            let Some(outcome) = t.handle_command(ch) else {
                return;
            };
            let window_ms = match outcome {
                CommandOutcome::Pending { window_ms } => Some(window_ms),
                _ => None,
            };
            let not_allow = t.take_not_allow_event(ch);
            if json {
                println!(
                    "{}",
                    json!({
                        "t_ms": row.t_ms,
                        "channel": ch,
                        "event": "command",
                        "command": command_name(cmd),
                        "outcome": command_outcome_name(&outcome),
                        "window_ms": window_ms,
                        "not_allow": not_allow,
                    })
                );
            } else {
                let mut line = format!(
                    "t={}ms ch{ch} total -> {}",
                    row.t_ms,
                    command_outcome_name(&outcome)
                );
                if let Some(w) = window_ms {
                    line.push_str(&format!(" ({w}ms window)"));
                }
                if not_allow {
                    line.push_str(" [already totaled]");
                }
                println!("{line}");
            }
            if let Some(c) = outcome.commit() {
                print_commit(t, row, &c, json);
            }
        }
        TraceCommand::Clear | TraceCommand::Remove | TraceCommand::Skip => {
            let applied = match cmd {
                TraceCommand::Clear => t.clear_total(ch),
                TraceCommand::Remove => t.remove_last_total(ch),
                _ => {
                    t.skip_next_total(ch);
                    true
                }
            };
            if json {
                println!(
                    "{}",
                    json!({
                        "t_ms": row.t_ms,
                        "channel": ch,
                        "event": "command",
                        "command": command_name(cmd),
                        "applied": applied,
                    })
                );
            } else {
                let state = if applied { "applied" } else { "nothing to do" };
                println!("t={}ms ch{ch} {} -> {state}", row.t_ms, command_name(cmd));
            }
        }
    }
}

fn print_commit<W: WeightSource, P: TotalsStore>(
    t: &TotalizerCore<W, P>,
    row: &TraceRow,
    c: &CommitOutcome,
    json: bool,
) {
    let ch = row.channel;
    let num_total = t.num_total(ch).unwrap_or_default();
    let total_wt = t.total_wt(ch).unwrap_or_default();
    if json {
        println!(
            "{}",
            json!({
                "t_ms": row.t_ms,
                "channel": ch,
                "event": "commit",
                "outcome": commit_outcome_name(c),
                "weight": c.weight(),
                "num_total": num_total,
                "total_wt": total_wt,
            })
        );
    } else {
        println!(
            "t={}ms ch{ch} commit {} {:.3} (count {num_total}, total {total_wt:.3})",
            row.t_ms,
            commit_outcome_name(c),
            c.weight()
        );
    }
}

fn print_summary<W: WeightSource, P: TotalsStore>(t: &TotalizerCore<W, P>, ch: usize, json: bool) {
    let Some(totals) = t.totals(ch) else {
        return;
    };
    if json {
        println!(
            "{}",
            json!({
                "channel": ch,
                "event": "summary",
                "mode": totals.mode.as_str(),
                "num_total": totals.num_total,
                "total_wt": totals.total_wt,
                "mean_wt": totals.mean(),
                "std_dev_wt": totals.std_dev(),
                "max_wt": totals.max_total_wt,
                "min_wt": totals.min_total_wt,
            })
        );
    } else {
        println!("{}", crate::show::render_totals(ch, &totals));
    }
}
