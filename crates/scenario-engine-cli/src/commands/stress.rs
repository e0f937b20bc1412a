use clap::Args;
use serde_json::Value;

use scenario_engine_core::stress::{
    generate_stress_scenarios, run_stress_test, BaseModel, ModelType, StressTestInput,
};

use crate::input;

/// Arguments for a stress test run
#[derive(Args)]
pub struct StressArgs {
    /// Path to JSON/YAML input file: a full stress input, or just the base
    /// model when --model-type is given
    #[arg(long)]
    pub input: Option<String>,

    /// Stress the base model with the built-in catalog for this domain
    /// (venture, credit, growth, real_estate)
    #[arg(long)]
    pub model_type: Option<ModelType>,
}

/// Arguments for listing the built-in stress scenarios
#[derive(Args)]
pub struct StressScenariosArgs {
    /// Model domain (venture, credit, growth, real_estate)
    #[arg(long)]
    pub model_type: ModelType,
}

pub fn run_stress(args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let stress_input: StressTestInput = match args.model_type {
        Some(model_type) => {
            let base_model: BaseModel = input::load(args.input.as_deref(), "stress test")?;
            StressTestInput {
                base_model,
                scenarios: generate_stress_scenarios(model_type),
            }
        }
        None => input::load(args.input.as_deref(), "stress test")?,
    };
    let result = run_stress_test(&stress_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_stress_scenarios(
    args: StressScenariosArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(generate_stress_scenarios(args.model_type))?)
}
