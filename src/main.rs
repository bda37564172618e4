use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;
use tracing::info;

use arena::agents::AGENT_KINDS;
use arena::arena::{install_signal_handlers, render_leaderboard, AgentOutcome, CycleReport};
use arena::cli::{self, Cli, Commands, RunOverrides};
use arena::config::{AppConfig, MarketDataProvider};
use arena::error::Result;
use arena::logging::{init_logging, init_logging_simple};
use arena::{
    build_market_data, AgentRegistry, Arena, JsonFileSink, SettlementFactory, SnapshotSink,
    StopHandle,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            cycles,
            interval,
            snapshot,
            settlement,
            simulated,
        } => {
            let mut config = load_config(&cli.config)?;
            RunOverrides {
                cycles: *cycles,
                interval: *interval,
                snapshot: snapshot.clone(),
                settlement: settlement.map(Into::into),
                provider: simulated.then_some(MarketDataProvider::Simulated),
            }
            .apply(&mut config);
            init_logging(&config.logging);
            config.validate()?;
            run_arena(config).await?;
        }
        Commands::Validate => {
            init_logging_simple();
            let config = load_config(&cli.config)?;
            match config.validate() {
                Ok(()) => cli::print_success(&format!(
                    "Configuration OK: {} agents, {} cycles, {} pairs, {} settlement",
                    config.agents.iter().filter(|a| a.enabled).map(|a| a.count).sum::<usize>(),
                    config.competition.cycles,
                    config.trading.trading_pairs.len(),
                    config.arena.settlement_mode
                )),
                Err(e) => {
                    cli::print_error(&format!("Invalid configuration: {}", e));
                    return Err(e);
                }
            }
        }
        Commands::Agents => {
            init_logging_simple();
            let config = load_config(&cli.config)?;
            show_agents(&config, cli.json)?;
        }
        Commands::Quotes => {
            init_logging_simple();
            let config = load_config(&cli.config)?;
            show_quotes(&config, cli.json).await?;
        }
    }

    Ok(())
}

fn load_config(dir: &Path) -> Result<AppConfig> {
    if !dir.is_dir() {
        eprintln!(
            "Config directory {} not found, using built-in defaults",
            dir.display()
        );
    }
    Ok(AppConfig::load_from(dir)?)
}

async fn run_arena(config: AppConfig) -> Result<()> {
    let config = Arc::new(config);

    let market_data = build_market_data(&config)?;
    let settlement = SettlementFactory::new(&config)?;
    let sink: Arc<dyn SnapshotSink> = Arc::new(JsonFileSink::new(&config.snapshot.path));
    let mut arena = Arena::new(Arc::clone(&config), market_data, settlement, sink);

    for provider in AgentRegistry::from_env().build_all(&config.agents)? {
        arena.register_agent(provider).await?;
    }

    let stop = StopHandle::new();
    install_signal_handlers(stop.clone());

    println!("\n{}", "=".repeat(60));
    println!("AI TRADING ARENA");
    println!("{}", "=".repeat(60));
    println!("Mode: {}", config.trading_mode_str());
    println!("Agents: {}", arena.agent_count());
    println!(
        "Cycles: {} every {}s",
        config.competition.cycles, config.competition.cycle_interval_secs
    );
    println!("Starting capital: ${}", config.trading.starting_capital);
    println!("Settlement: {}", config.arena.settlement_mode);
    println!("Snapshot: {}", config.snapshot.path);
    println!("{}\n", "=".repeat(60));

    let summary = arena
        .run_with(&stop, |report, arena| {
            print_cycle(report, u64::from(config.competition.cycles));
            println!("{}\n", render_leaderboard(&arena.leaderboard()));
        })
        .await?;

    println!("\n{}", "=".repeat(60));
    match summary.stop_reason {
        Some(reason) => println!(
            "STOPPED ({}) after {} cycles",
            reason, summary.cycles_completed
        ),
        None => println!("COMPETITION COMPLETE: {} cycles", summary.cycles_completed),
    }
    println!("{}", "=".repeat(60));
    println!("{}", render_leaderboard(&arena.leaderboard()));
    info!(snapshot = %config.snapshot.path, "final state written");
    Ok(())
}

fn print_cycle(report: &CycleReport, total: u64) {
    println!(
        "Cycle {}/{}: {} decisions, {} executed, {} failed, {} rejected, {} timeouts, {} errors ({} ms)",
        report.cycle,
        total,
        report.decisions(),
        report.executed(),
        report.failed(),
        report.rejected(),
        report.timeouts(),
        report.errors(),
        report.elapsed.as_millis()
    );
    for entry in &report.outcomes {
        let line = match &entry.outcome {
            AgentOutcome::Held => continue,
            AgentOutcome::Executed {
                direction, symbol, ..
            } => format!("{} {} - {}", direction, symbol, entry.reasoning),
            AgentOutcome::SettlementFailed {
                direction, symbol, ..
            } => format!("FAILED {} {}", direction, symbol),
            AgentOutcome::Rejected(rejection) => format!("rejected: {}", rejection),
            AgentOutcome::TimedOut => "timed out".to_string(),
            AgentOutcome::ProviderError(reason) => format!("error: {}", reason),
            AgentOutcome::SettlementError(reason) => format!("settlement error: {}", reason),
        };
        println!("  {}: {}", entry.agent_name, line);
    }
}

#[derive(Serialize, Tabled)]
struct KindRow {
    kind: &'static str,
    description: &'static str,
}

#[derive(Serialize, Tabled)]
struct ConfiguredAgentRow {
    name: String,
    kind: String,
    enabled: bool,
    count: usize,
    api_key: String,
}

fn show_agents(config: &AppConfig, json: bool) -> Result<()> {
    let kinds: Vec<KindRow> = AGENT_KINDS
        .iter()
        .map(|&(kind, description)| KindRow { kind, description })
        .collect();
    cli::print_rows(&kinds, json)?;

    let configured: Vec<ConfiguredAgentRow> = config
        .agents
        .iter()
        .map(|spec| {
            let api_key = match &spec.api_key_env {
                Some(var) if std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false) => {
                    format!("{} (set)", var)
                }
                Some(var) => format!("{} (missing)", var),
                None => "-".to_string(),
            };
            ConfiguredAgentRow {
                name: spec.name.clone(),
                kind: spec.kind.clone(),
                enabled: spec.enabled,
                count: spec.count,
                api_key,
            }
        })
        .collect();
    cli::print_rows(&configured, json)?;
    Ok(())
}

#[derive(Serialize, Tabled)]
struct QuoteRow {
    symbol: String,
    price: Decimal,
    bid: Decimal,
    ask: Decimal,
    #[tabled(rename = "24h %")]
    change_percent_24h: Decimal,
    source: String,
}

async fn show_quotes(config: &AppConfig, json: bool) -> Result<()> {
    let source = build_market_data(config)?;
    let quotes = source.fetch_quotes(&config.trading.trading_pairs).await?;

    let mut rows: Vec<QuoteRow> = quotes
        .into_values()
        .map(|q| QuoteRow {
            symbol: q.symbol,
            price: q.price,
            bid: q.bid,
            ask: q.ask,
            change_percent_24h: q.change_percent_24h,
            source: q.source.to_string(),
        })
        .collect();
    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    cli::print_rows(&rows, json)?;
    Ok(())
}
