#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, persisted-totals file format and trace parsing for the totalizer.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `TotalsFile` is the durable form of per-channel statistics.
//! - The trace CSV loader enforces headers before any row is parsed.
use serde::{Deserialize, Serialize};

/// Threshold percentage substituted for a configured 0 %.
pub const DEFAULT_THRESHOLD_PCT: f32 = 0.5;

/// Totalizing policy of a channel.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TotalMode {
    #[default]
    Disabled,
    AutoLoad,
    AutoNormal,
    AutoPeak,
    OnCommand,
    OnAccept,
    LoadDrop,
}

impl TotalMode {
    pub const ALL: [TotalMode; 7] = [
        TotalMode::Disabled,
        TotalMode::AutoLoad,
        TotalMode::AutoNormal,
        TotalMode::AutoPeak,
        TotalMode::OnCommand,
        TotalMode::OnAccept,
        TotalMode::LoadDrop,
    ];

    /// Stable kebab-case name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            TotalMode::Disabled => "disabled",
            TotalMode::AutoLoad => "auto-load",
            TotalMode::AutoNormal => "auto-normal",
            TotalMode::AutoPeak => "auto-peak",
            TotalMode::OnCommand => "on-command",
            TotalMode::OnAccept => "on-accept",
            TotalMode::LoadDrop => "load-drop",
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(
            self,
            TotalMode::AutoLoad | TotalMode::AutoNormal | TotalMode::AutoPeak
        )
    }
}

impl std::fmt::Display for TotalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TotalMode {
    type Err = eyre::Report;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TotalMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| eyre::eyre!("unknown total mode '{s}'"))
    }
}

/// Display/filter parameters of the weighing front end for one channel.
///
/// The engine reads these through `WeightSource`; they live here so the
/// simulated source used by the CLI can be configured from the same file.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SensorCfg {
    pub decimals: u8,
    pub increment: f32,
    pub sample_rate_hz: u32,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            decimals: 0,
            increment: 1.0,
            sample_rate_hz: 10,
        }
    }
}

impl SensorCfg {
    /// Filter sampling interval in milliseconds (at least 1).
    pub fn interval_ms(&self) -> u32 {
        (1000 / self.sample_rate_hz.max(1)).max(1)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChannelCfg {
    /// Channel capacity in display units; thresholds are derived from it.
    pub capacity: f32,
    pub mode: TotalMode,
    /// Rise threshold in % of capacity (0 = 0.5 %).
    pub rise_pct: f32,
    /// Drop threshold in % of capacity (0 = 0.5 %).
    pub drop_pct: f32,
    /// Weight must be free of motion this long before it qualifies.
    pub min_stable_ms: u32,
    /// Debounce window armed by a manual command.
    pub pending_ms: u32,
    /// On-accept window bounds (inclusive).
    pub accept_lower: f32,
    pub accept_upper: f32,
    pub sensor: SensorCfg,
}

impl Default for ChannelCfg {
    fn default() -> Self {
        Self {
            capacity: 0.0,
            mode: TotalMode::Disabled,
            rise_pct: 0.0,
            drop_pct: 0.0,
            min_stable_ms: 500,
            pending_ms: 1000,
            accept_lower: 0.0,
            accept_upper: 0.0,
            sensor: SensorCfg::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreCfg {
    /// Where the persisted totals live.
    pub path: String,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            path: "totals.toml".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub store: StoreCfg,
    #[serde(rename = "channel", default)]
    pub channels: Vec<ChannelCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn healed_pct(pct: f32) -> f32 {
    if pct == 0.0 {
        DEFAULT_THRESHOLD_PCT
    } else {
        pct
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.channels.is_empty() {
            eyre::bail!("at least one [[channel]] must be configured");
        }
        for (i, ch) in self.channels.iter().enumerate() {
            ch.validate().map_err(|e| eyre::eyre!("channel[{i}].{e}"))?;
        }

        // Store
        if self.store.path.trim().is_empty() {
            eyre::bail!("store.path must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got '{rot}'");
        }

        Ok(())
    }
}

impl ChannelCfg {
    /// Field-level checks; messages are relative to the channel table.
    pub fn validate(&self) -> eyre::Result<()> {
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            eyre::bail!("capacity must be > 0");
        }
        for (name, pct) in [("rise_pct", self.rise_pct), ("drop_pct", self.drop_pct)] {
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                eyre::bail!("{name} must be in [0.0, 100.0]");
            }
        }
        if healed_pct(self.drop_pct) > healed_pct(self.rise_pct) {
            eyre::bail!("drop_pct must not exceed rise_pct");
        }
        if self.min_stable_ms > 5 * 60 * 1000 {
            eyre::bail!("min_stable_ms is unreasonably large (>5min)");
        }
        if self.pending_ms > 60 * 1000 {
            eyre::bail!("pending_ms is unreasonably large (>60s)");
        }
        if self.mode == TotalMode::OnAccept {
            if !self.accept_lower.is_finite() || !self.accept_upper.is_finite() {
                eyre::bail!("accept window bounds must be finite");
            }
            let drop = self.capacity * (healed_pct(self.drop_pct) / 100.0);
            if self.accept_lower <= drop {
                eyre::bail!("accept_lower must exceed the drop threshold ({drop}) in on-accept mode");
            }
            if self.accept_upper < self.accept_lower {
                eyre::bail!("accept_upper must be >= accept_lower");
            }
        }

        // Sensor
        if self.sensor.sample_rate_hz == 0 {
            eyre::bail!("sensor.sample_rate_hz must be > 0");
        }
        if !self.sensor.increment.is_finite() || self.sensor.increment <= 0.0 {
            eyre::bail!("sensor.increment must be > 0");
        }
        if self.sensor.decimals > 6 {
            eyre::bail!("sensor.decimals must be <= 6");
        }
        Ok(())
    }
}

/// Durable statistics of one channel.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub struct PersistedTotals {
    pub channel: usize,
    pub total_wt: f64,
    pub sum_sq_total_wt: f64,
    pub max_total_wt: f32,
    pub min_total_wt: f32,
    pub num_total: u16,
    #[serde(default)]
    pub mode: TotalMode,
}

/// On-disk layout of the totals store: one `[[channel]]` table per channel.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct TotalsFile {
    #[serde(rename = "channel", default)]
    pub channels: Vec<PersistedTotals>,
}

impl TotalsFile {
    pub fn get(&self, channel: usize) -> Option<&PersistedTotals> {
        self.channels.iter().find(|t| t.channel == channel)
    }

    /// Insert or replace the record for `totals.channel`, keeping channel order.
    pub fn upsert(&mut self, totals: PersistedTotals) {
        match self.channels.iter_mut().find(|t| t.channel == totals.channel) {
            Some(slot) => *slot = totals,
            None => {
                self.channels.push(totals);
                self.channels.sort_by_key(|t| t.channel);
            }
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// Read a totals file; a missing file is an empty store.
pub fn load_totals_file(path: &std::path::Path) -> eyre::Result<TotalsFile> {
    match std::fs::read_to_string(path) {
        Ok(s) => TotalsFile::from_toml(&s)
            .map_err(|e| eyre::eyre!("parse totals file {:?}: {}", path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TotalsFile::default()),
        Err(e) => Err(eyre::eyre!("read totals file {:?}: {}", path, e)),
    }
}

/// Command column of a replay trace.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TraceCommand {
    /// User "total" key / host totalize command.
    Total,
    Clear,
    Remove,
    /// Veto the next totalization.
    Skip,
}

/// Trace CSV schema.
///
/// Expected headers:
/// t_ms,channel,weight,motion,overload,command
///
/// Example:
/// t_ms,channel,weight,motion,overload,command
/// 0,0,0.0,false,false,
/// 100,0,25.0,true,false,
/// 700,0,25.0,false,false,total
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub channel: usize,
    pub weight: f32,
    pub motion: bool,
    pub overload: bool,
    pub command: Option<TraceCommand>,
}

pub const TRACE_HEADERS: [&str; 6] = ["t_ms", "channel", "weight", "motion", "overload", "command"];

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != TRACE_HEADERS {
        eyre::bail!(
            "trace CSV must have headers '{}', got: {}",
            TRACE_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        match rec {
            Ok(row) => {
                if let Some(prev) = rows.last()
                    && row.t_ms < prev.t_ms
                {
                    eyre::bail!(
                        "trace timestamps must be non-decreasing (row {}: {} < {})",
                        idx + 2,
                        row.t_ms,
                        prev.t_ms
                    );
                }
                if !row.weight.is_finite() {
                    eyre::bail!("invalid CSV row {}: weight must be finite", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}
