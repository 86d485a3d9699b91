use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tradedesk_core::{BrokerAdapter, BrokerConfig, OrderKind, OrderSide, QuoteCallback, TradingMode};
use tradedesk_manager::{all_templates, BrokerManager};

#[derive(Parser)]
#[command(name = "tradedesk")]
#[command(about = "Broker adapter core: manage simulated brokerage connections")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported broker types and their config templates
    Brokers,

    /// Run a scripted paper-trading session against one broker
    Demo {
        /// Broker type tag (e.g. "futu", "tiger")
        #[arg(short, long, default_value = "futu")]
        broker: String,
    },

    /// Connect every broker defined in a TOML file and report status
    Status {
        /// Path to the broker definition file
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// `[[brokers]]` entries of the definition file.
#[derive(Debug, Deserialize)]
struct BrokerFile {
    brokers: Vec<BrokerEntry>,
}

#[derive(Debug, Deserialize)]
struct BrokerEntry {
    id: String,
    #[serde(rename = "type")]
    broker_type: String,
    #[serde(default = "default_mode")]
    mode: TradingMode,
    config: BrokerConfig,
}

fn default_mode() -> TradingMode {
    TradingMode::Paper
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Brokers => list_brokers(),
        Commands::Demo { broker } => run_demo(&broker).await?,
        Commands::Status { config } => run_status(&config).await?,
    }

    Ok(())
}

fn list_brokers() {
    for template in all_templates() {
        println!("{} ({})", template.display_name, template.name);
        println!("  {}", template.description);
        println!(
            "  markets: {}",
            template
                .markets
                .iter()
                .map(|m| format!("{m:?}").to_uppercase())
                .collect::<Vec<_>>()
                .join(", ")
        );
        for field in &template.config_fields {
            let required = if field.required { "required" } else { "optional" };
            println!(
                "  - {:<10} {:?}, {}{}",
                field.key,
                field.field_type,
                required,
                field
                    .default
                    .as_ref()
                    .map(|v| format!(", default {v}"))
                    .unwrap_or_default()
            );
        }
        println!();
    }
}

fn demo_entry(broker: &str) -> Result<(BrokerConfig, &'static str)> {
    match broker {
        "futu" => Ok((
            BrokerConfig::new()
                .with("apiKey", "ft_demo_key")
                .with("host", "openapi.futunn.com")
                .with("port", 11111)
                .with("account", "DU1234567"),
            "AAPL",
        )),
        "tiger" => Ok((
            BrokerConfig::new()
                .with("apiKey", "tiger_demo_key")
                .with("apiSecret", "tiger_demo_secret")
                .with("host", "openapi.tigerbrokers.com")
                .with("account", "TG123456789"),
            "NVDA",
        )),
        other => bail!("no demo credentials for broker type '{other}'"),
    }
}

async fn run_demo(broker: &str) -> Result<()> {
    let (config, symbol) = demo_entry(broker)?;

    let mut manager = BrokerManager::with_default_adapters();
    manager.add_broker("demo", broker, config, TradingMode::Paper)?;

    info!(broker, "connecting paper session");
    let results = manager.connect_all().await;
    if let Some(failed) = results.iter().find(|r| !r.success) {
        bail!(
            "connect failed: {}",
            failed.error.as_deref().unwrap_or("unknown")
        );
    }

    let adapter = manager
        .instance_mut("demo")
        .context("demo instance missing")?;

    let account = adapter.account().await?;
    println!(
        "{}: {} {} available, {} total",
        account.name, account.available_cash, account.currency, account.total_value
    );
    for position in &account.positions {
        println!(
            "  {:<8} {:>10} @ {:<10} unrealized {}",
            position.symbol, position.quantity, position.avg_cost, position.unrealized_pnl
        );
    }

    let order = adapter
        .place_order(
            symbol,
            OrderSide::Buy,
            OrderKind::Market,
            rust_decimal::Decimal::ONE,
            None,
            None,
        )
        .await?;
    println!(
        "placed {} {} x1 → {:?} at {:?}, commission {}",
        symbol, order.id, order.status, order.avg_fill_price, order.commission
    );

    let callback: QuoteCallback = Arc::new(|quotes| {
        for quote in quotes {
            println!(
                "  tick {:<8} {:>10} ({}%)",
                quote.symbol, quote.price, quote.change_percent
            );
        }
    });
    let symbols = vec![symbol.to_string()];
    adapter.subscribe_quotes(&symbols, callback).await?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    adapter.unsubscribe_quotes(&symbols).await?;

    manager.disconnect_all().await;
    println!("session closed");
    Ok(())
}

async fn run_status(path: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file: BrokerFile = toml::from_str(&raw).context("parsing broker definition file")?;

    let mut manager = BrokerManager::with_default_adapters();
    for entry in file.brokers {
        manager
            .add_broker(&entry.id, &entry.broker_type, entry.config, entry.mode)
            .with_context(|| format!("adding broker '{}'", entry.id))?;
    }

    let results = manager.connect_all().await;
    for result in &results {
        match &result.error {
            None => println!("{:<12} connected", result.id),
            Some(error) => println!("{:<12} FAILED: {error}", result.id),
        }
    }

    println!();
    for status in manager.all_broker_status() {
        println!(
            "{:<12} {:<6} {:<5?} {:?}{}",
            status.id,
            status.broker_type,
            status.mode,
            status.state,
            status
                .last_error
                .map(|e| format!(" ({e})"))
                .unwrap_or_default()
        );
    }

    manager.disconnect_all().await;
    Ok(())
}
