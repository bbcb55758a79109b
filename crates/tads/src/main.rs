use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tads_models::TadsConfig;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tads", about = "Trading Agents Debate System")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/tads.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full orchestration for one symbol and as-of date
    Decide {
        /// Instrument symbol, e.g. AAPL
        symbol: String,
        /// As-of date, YYYY-MM-DD
        as_of_date: String,
        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Reflect on a stored decision and append one memory record
    Reflect {
        /// Run id to reflect on; defaults to the most recent run
        #[arg(long)]
        run_id: Option<Uuid>,
        /// Realized position return since the decision
        #[arg(long, allow_negative_numbers = true)]
        realized_return: Decimal,
        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: TadsConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    let graph = tads::build_graph(&config, None).context("Failed to build graph")?;

    match cli.command {
        Command::Decide {
            symbol,
            as_of_date,
            pretty,
        } => {
            let (trace, decision) = graph
                .propagate(&symbol, &as_of_date)
                .await
                .map_err(|e| anyhow::anyhow!("Run failed: {e}"))?;

            let output = if config.engine.debug {
                serde_json::json!({ "final_decision": decision, "trace": trace })
            } else {
                serde_json::to_value(&decision)?
            };
            print_json(&output, pretty)?;
        }
        Command::Reflect {
            run_id,
            realized_return,
            pretty,
        } => {
            let run_id = match run_id {
                Some(id) => id,
                None => graph
                    .latest_run_id()
                    .map_err(|e| anyhow::anyhow!("Failed to look up latest run: {e}"))?
                    .context("No stored runs to reflect on; pass --run-id")?,
            };

            let record = graph
                .reflect_and_remember(run_id, realized_return)
                .await
                .map_err(|e| anyhow::anyhow!("Reflection failed: {e}"))?;
            print_json(&serde_json::to_value(&record)?, pretty)?;
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
