use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use scenario_engine_core::waterfall::{distribute_waterfall, WaterfallInput};

use crate::input;

/// Arguments for an exit-proceeds waterfall
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to JSON/YAML input file with the claim stack
    #[arg(long)]
    pub input: Option<String>,

    /// Override the total proceeds in the input
    #[arg(long)]
    pub proceeds: Option<Decimal>,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut wf_input: WaterfallInput = input::load(args.input.as_deref(), "waterfall")?;
    if let Some(proceeds) = args.proceeds {
        wf_input.total_proceeds = proceeds;
    }
    let result = distribute_waterfall(&wf_input)?;
    Ok(serde_json::to_value(result)?)
}
