use clap::Args;
use serde_json::Value;

use scenario_engine_core::scenarios::ScenarioCatalog;

/// Arguments for browsing the scenario catalog
#[derive(Args)]
pub struct ScenariosArgs {
    /// Category key (exit, growth, market, macro, regulatory, operational);
    /// all groups when omitted
    #[arg(long)]
    pub category: Option<String>,

    /// Fail on an unknown category instead of returning an empty group
    #[arg(long)]
    pub strict: bool,
}

pub fn run_scenarios(args: ScenariosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let catalog = ScenarioCatalog::global();
    match args.category {
        Some(ref key) if args.strict => Ok(serde_json::to_value(catalog.try_group(key)?)?),
        Some(ref key) => Ok(serde_json::to_value(catalog.group(key))?),
        None => Ok(serde_json::to_value(catalog)?),
    }
}
