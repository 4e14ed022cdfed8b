//! Offline maintenance of the persisted totals: show, clear, set-mode, reset.

use serde_json::json;
use totalizer_config::{Config, TotalMode};
use totalizer_core::{ChannelConfig, ChannelTotals, FileStore, TotalizerCore, build_totalizer};
use totalizer_hardware::SimulatedSource;
use totalizer_traits::Countby;

type OfflineTotalizer = TotalizerCore<SimulatedSource, FileStore>;

/// Offline operations on the store.
#[derive(Debug, Clone, Copy)]
pub enum Maintenance {
    Show,
    Clear(usize),
    SetMode(usize, TotalMode),
    Reset,
}

pub fn render_totals(channel: usize, t: &ChannelTotals) -> String {
    let mean = t.mean().map_or_else(|| "-".to_string(), |m| format!("{m:.3}"));
    let sd = t.std_dev().map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
    format!(
        "ch{channel} mode={} count={} total={:.3} mean={mean} sd={sd} max={:.3} min={:.3}",
        t.mode, t.num_total, t.total_wt, t.max_total_wt, t.min_total_wt
    )
}

/// Bring the engine up over the file store, with no live readings.
fn open(cfg: &Config) -> eyre::Result<OfflineTotalizer> {
    let mut source = SimulatedSource::new();
    for ch in &cfg.channels {
        source.add_channel(
            Countby {
                decimals: ch.sensor.decimals,
                increment: ch.sensor.increment,
            },
            ch.sensor.interval_ms(),
        );
    }
    let store = FileStore::open(&cfg.store.path)?;
    let channels = cfg.channels.iter().map(ChannelConfig::from).collect();
    build_totalizer(source, store, channels, None)
}

fn check_channel(t: &OfflineTotalizer, channel: usize) -> eyre::Result<()> {
    if channel >= t.channel_count() {
        eyre::bail!(
            "channel {channel} is not configured ({} channels)",
            t.channel_count()
        );
    }
    Ok(())
}

pub fn run_maintenance(cfg: &Config, op: Maintenance, json: bool) -> eyre::Result<()> {
    let mut t = open(cfg)?;
    match op {
        Maintenance::Show => {}
        Maintenance::Clear(ch) => {
            check_channel(&t, ch)?;
            let changed = t.clear_total(ch);
            tracing::info!(channel = ch, changed, "clear");
        }
        Maintenance::SetMode(ch, mode) => {
            check_channel(&t, ch)?;
            if !t.set_total_mode(ch, mode) {
                eyre::bail!(
                    "channel {ch} cannot switch to {mode}: accept window must satisfy drop threshold < accept_lower <= accept_upper"
                );
            }
            tracing::info!(channel = ch, mode = %mode, "set mode");
        }
        Maintenance::Reset => {
            t.master_reset();
            tracing::info!(channels = t.channel_count(), "master reset");
        }
    }

    // The engine logs and swallows store failures; writing once more here
    // turns a failed write into an exit code.
    if !matches!(op, Maintenance::Show) {
        t.store().flush().map_err(eyre::Report::new)?;
    }

    for ch in 0..t.channel_count() {
        let Some(totals) = t.totals(ch) else {
            continue;
        };
        if json {
            println!(
                "{}",
                json!({
                    "channel": ch,
                    "mode": totals.mode.as_str(),
                    "num_total": totals.num_total,
                    "total_wt": totals.total_wt,
                    "sum_sq_total_wt": totals.sum_sq_total_wt,
                    "mean_wt": totals.mean(),
                    "std_dev_wt": totals.std_dev(),
                    "max_wt": totals.max_total_wt,
                    "min_wt": totals.min_total_wt,
                })
            );
        } else {
            println!("{}", render_totals(ch, &totals));
        }
    }
    Ok(())
}
