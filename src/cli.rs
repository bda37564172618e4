//! Command-line interface

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use crate::config::{MarketDataProvider, SettlementMode};

#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(version)]
#[command(about = "Multi-agent paper trading arena", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default.toml, <ARENA_ENV>.toml)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: PathBuf,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the competition
    Run {
        /// Number of cycles (overrides competition.cycles)
        #[arg(long)]
        cycles: Option<u32>,
        /// Seconds between cycles (overrides competition.cycle_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
        /// Snapshot file (overrides snapshot.path)
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Settlement ledger layout
        #[arg(long, value_enum)]
        settlement: Option<SettlementArg>,
        /// Use the simulated quote feed only
        #[arg(long)]
        simulated: bool,
    },
    /// Validate the configuration and exit
    Validate,
    /// List strategy kinds and the configured agents
    Agents,
    /// Fetch and print one quote set
    Quotes,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementArg {
    Isolated,
    Shared,
}

impl From<SettlementArg> for SettlementMode {
    fn from(arg: SettlementArg) -> Self {
        match arg {
            SettlementArg::Isolated => SettlementMode::Isolated,
            SettlementArg::Shared => SettlementMode::Shared,
        }
    }
}

/// Overrides collected from `arena run`
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub cycles: Option<u32>,
    pub interval: Option<u64>,
    pub snapshot: Option<PathBuf>,
    pub settlement: Option<SettlementMode>,
    pub provider: Option<MarketDataProvider>,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut crate::config::AppConfig) {
        if let Some(cycles) = self.cycles {
            config.competition.cycles = cycles;
        }
        if let Some(interval) = self.interval {
            config.competition.cycle_interval_secs = interval;
        }
        if let Some(path) = &self.snapshot {
            config.snapshot.path = path.display().to_string();
        }
        if let Some(mode) = self.settlement {
            config.arena.settlement_mode = mode;
        }
        if let Some(provider) = self.provider {
            config.market_data.provider = provider;
        }
    }
}

/// Print rows as a table, or as JSON with `--json`
pub fn print_rows<T: Tabled + Serialize>(rows: &[T], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
    } else if rows.is_empty() {
        println!("(no results)");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("\x1b[32m{msg}\x1b[0m");
}

pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m{msg}\x1b[0m");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::parse_from([
            "arena",
            "run",
            "--cycles",
            "3",
            "--interval",
            "0",
            "--settlement",
            "shared",
            "--simulated",
        ]);
        match cli.command {
            Commands::Run {
                cycles,
                interval,
                settlement,
                simulated,
                ..
            } => {
                assert_eq!(cycles, Some(3));
                assert_eq!(interval, Some(0));
                assert_eq!(settlement, Some(SettlementArg::Shared));
                assert!(simulated);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("config"));
    }

    #[test]
    fn overrides_apply_to_config() {
        let mut config = AppConfig::default_config();
        RunOverrides {
            cycles: Some(7),
            interval: Some(1),
            snapshot: Some(PathBuf::from("out/state.json")),
            settlement: Some(SettlementMode::Shared),
            provider: Some(MarketDataProvider::Simulated),
        }
        .apply(&mut config);

        assert_eq!(config.competition.cycles, 7);
        assert_eq!(config.competition.cycle_interval_secs, 1);
        assert_eq!(config.snapshot.path, "out/state.json");
        assert_eq!(config.arena.settlement_mode, SettlementMode::Shared);
        assert_eq!(config.market_data.provider, MarketDataProvider::Simulated);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["arena", "quotes", "--json", "--config", "/tmp/cfg"]);
        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from("/tmp/cfg"));
        assert!(matches!(cli.command, Commands::Quotes));
    }
}
