use clap::Args;
use serde_json::Value;

use scenario_engine_core::scenarios::pwerm::{
    pwerm_catalog, representative_values, summarize_outcomes, OutcomeType, PwermSummaryInput,
};

use crate::input;

/// Arguments for listing PWERM buckets
#[derive(Args)]
pub struct PwermCatalogArgs {
    /// Only buckets of this outcome type (e.g. strategic_acquisition)
    #[arg(long)]
    pub outcome: Option<String>,

    /// A single bucket by id (1-499)
    #[arg(long)]
    pub id: Option<u32>,

    /// Print representative values per outcome type instead of buckets
    #[arg(long)]
    pub representative: bool,
}

/// Arguments for summarizing an outcome-type distribution
#[derive(Args)]
pub struct PwermSummaryArgs {
    /// Path to JSON/YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

fn parse_outcome(s: &str) -> Result<OutcomeType, Box<dyn std::error::Error>> {
    serde_json::from_value(Value::String(s.trim().to_ascii_lowercase()))
        .map_err(|_| format!("Unknown outcome type '{s}'").into())
}

pub fn run_pwerm_catalog(args: PwermCatalogArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let catalog = pwerm_catalog()?;

    if args.representative {
        return Ok(serde_json::to_value(representative_values(catalog))?);
    }
    if let Some(id) = args.id {
        let bucket = catalog
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| format!("No PWERM bucket with id {id}"))?;
        return Ok(serde_json::to_value(bucket)?);
    }

    let outcome = args.outcome.as_deref().map(parse_outcome).transpose()?;
    let buckets: Vec<_> = catalog
        .iter()
        .filter(|s| outcome.map_or(true, |o| s.outcome_type == o))
        .collect();
    Ok(serde_json::to_value(buckets)?)
}

pub fn run_pwerm_summary(args: PwermSummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let summary_input: PwermSummaryInput = input::load(args.input.as_deref(), "PWERM summary")?;
    let result = summarize_outcomes(&summary_input)?;
    Ok(serde_json::to_value(result)?)
}
