mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::monte_carlo::{DcfArgs, ExitsArgs, RevenueArgs, SensitivityArgs};
use commands::pwerm::{PwermCatalogArgs, PwermSummaryArgs};
use commands::scenarios::ScenariosArgs;
use commands::stress::{StressArgs, StressScenariosArgs};
use commands::waterfall::WaterfallArgs;

/// Scenario and valuation simulation engine
#[derive(Parser)]
#[command(
    name = "sce",
    version,
    about = "Scenario and valuation simulation engine",
    long_about = "Monte Carlo exit, revenue and DCF simulation, DCF sensitivity grids, \
                  tail-risk stress testing, the PWERM outcome taxonomy and \
                  liquidation-preference waterfalls."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Monte Carlo exit simulation over a scenario group
    Exits(ExitsArgs),
    /// Simulate revenue trajectories for a fan chart
    Revenue(RevenueArgs),
    /// Monte Carlo DCF valuation with sensitivity grid
    Dcf(DcfArgs),
    /// Deterministic 5x5 margin x WACC DCF grid
    Sensitivity(SensitivityArgs),
    /// Stress a base model against tail-risk scenarios
    Stress(StressArgs),
    /// List the built-in stress scenarios for a model domain
    StressScenarios(StressScenariosArgs),
    /// Browse the probability-weighted scenario catalog
    Scenarios(ScenariosArgs),
    /// List the 499 PWERM valuation-outcome buckets
    PwermCatalog(PwermCatalogArgs),
    /// Summarize an outcome-type probability distribution
    PwermSummary(PwermSummaryArgs),
    /// Distribute exit proceeds across a liquidation-preference stack
    Waterfall(WaterfallArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Exits(args) => commands::monte_carlo::run_exits(args),
        Commands::Revenue(args) => commands::monte_carlo::run_revenue(args),
        Commands::Dcf(args) => commands::monte_carlo::run_dcf(args),
        Commands::Sensitivity(args) => commands::monte_carlo::run_sensitivity(args),
        Commands::Stress(args) => commands::stress::run_stress(args),
        Commands::StressScenarios(args) => commands::stress::run_stress_scenarios(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::PwermCatalog(args) => commands::pwerm::run_pwerm_catalog(args),
        Commands::PwermSummary(args) => commands::pwerm::run_pwerm_summary(args),
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args),
        Commands::Version => {
            println!("sce {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
