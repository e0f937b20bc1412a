use clap::Args;
use serde_json::Value;

use scenario_engine_core::monte_carlo::dcf::{self, DcfSensitivityInput, DcfSimulationInput};
use scenario_engine_core::monte_carlo::simulation::{
    self, ExitSimulationInput, RevenueSimulationInput,
};
use scenario_engine_core::scenarios::ScenarioCatalog;

use crate::input;

const DEFAULT_SIMULATIONS: u32 = 10_000;

/// Arguments for a Monte Carlo exit simulation
#[derive(Args)]
pub struct ExitsArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Initial investment
    #[arg(long)]
    pub investment: Option<f64>,

    /// Ownership fraction at exit (e.g. 0.10 for 10%)
    #[arg(long)]
    pub ownership: Option<f64>,

    /// Built-in scenario group to sample from
    #[arg(long, default_value = "exit")]
    pub category: String,

    /// Number of simulation paths
    #[arg(long, default_value_t = DEFAULT_SIMULATIONS)]
    pub simulations: u32,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for a revenue trajectory simulation
#[derive(Args)]
pub struct RevenueArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Starting annual revenue
    #[arg(long)]
    pub base_revenue: Option<f64>,

    /// Projection horizon in years
    #[arg(long, default_value_t = 5)]
    pub years: u32,

    /// Number of simulation paths
    #[arg(long, default_value_t = DEFAULT_SIMULATIONS)]
    pub simulations: u32,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for a Monte Carlo DCF valuation
#[derive(Args)]
pub struct DcfArgs {
    /// Path to JSON/YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the deterministic margin x WACC grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON/YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_exits(args: ExitsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let exit_input: ExitSimulationInput = if args.input.is_some() || args.investment.is_none() {
        input::load(args.input.as_deref(), "exit simulation")?
    } else {
        let scenarios = ScenarioCatalog::global().try_group(&args.category)?.to_vec();
        ExitSimulationInput {
            initial_investment: args.investment.ok_or("--investment required")?,
            ownership: args.ownership.ok_or("--ownership required")?,
            scenarios,
            num_simulations: args.simulations,
            seed: args.seed,
        }
    };
    let result = simulation::simulate_exits(&exit_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_revenue(args: RevenueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let revenue_input: RevenueSimulationInput = match args.base_revenue {
        Some(base_revenue) if args.input.is_none() => {
            let catalog = ScenarioCatalog::global();
            RevenueSimulationInput {
                base_revenue,
                years: args.years,
                growth_scenarios: catalog.try_group("growth")?.to_vec(),
                market_scenarios: catalog.try_group("market")?.to_vec(),
                num_simulations: args.simulations,
                seed: args.seed,
            }
        }
        _ => input::load(args.input.as_deref(), "revenue simulation")?,
    };
    let result = simulation::simulate_revenue(&revenue_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_dcf(args: DcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dcf_input: DcfSimulationInput = input::load(args.input.as_deref(), "Monte Carlo DCF")?;
    let result = dcf::simulate_dcf(&dcf_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let grid_input: DcfSensitivityInput =
        input::load(args.input.as_deref(), "DCF sensitivity grid")?;
    let result = dcf::run_dcf_sensitivity(&grid_input)?;
    Ok(serde_json::to_value(result)?)
}
