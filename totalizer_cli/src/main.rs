#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod logging;
mod replay;
mod show;

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::show::Maintenance;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: &std::path::Path) -> eyre::Result<totalizer_config::Config> {
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("read config {path:?}"))?;
    let cfg = totalizer_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("parse config {path:?}: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    logging::init_tracing(cli.json, level, &cfg.logging)?;

    match cli.cmd {
        Commands::Replay { trace, persist } => replay::run_replay(&cfg, &trace, persist, cli.json),
        Commands::Show => show::run_maintenance(&cfg, Maintenance::Show, cli.json),
        Commands::Clear { channel } => {
            show::run_maintenance(&cfg, Maintenance::Clear(channel), cli.json)
        }
        Commands::SetMode { channel, mode } => {
            let mode = mode.parse()?;
            show::run_maintenance(&cfg, Maintenance::SetMode(channel, mode), cli.json)
        }
        Commands::Reset => show::run_maintenance(&cfg, Maintenance::Reset, cli.json),
    }
}
