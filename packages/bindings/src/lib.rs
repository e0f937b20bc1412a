use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use scenario_engine_core::monte_carlo::{dcf, simulation};
use scenario_engine_core::scenarios::{pwerm, ScenarioCatalog};
use scenario_engine_core::stress::{self, BaseModel, ModelType, StressTestInput};
use scenario_engine_core::waterfall;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Monte Carlo
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate_exits(input_json: String) -> NapiResult<String> {
    let input: simulation::ExitSimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = simulation::simulate_exits(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_revenue(input_json: String) -> NapiResult<String> {
    let input: simulation::RevenueSimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = simulation::simulate_revenue(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_dcf(input_json: String) -> NapiResult<String> {
    let input: dcf::DcfSimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf::simulate_dcf(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn dcf_sensitivity(input_json: String) -> NapiResult<String> {
    let input: dcf::DcfSensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf::run_dcf_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenario catalogs
// ---------------------------------------------------------------------------

/// Scenario group for a category key; unknown keys return `[]`.
#[napi]
pub fn scenario_group(category: String) -> NapiResult<String> {
    serde_json::to_string(ScenarioCatalog::global().group(&category)).map_err(to_napi_error)
}

#[napi]
pub fn pwerm_catalog() -> NapiResult<String> {
    let catalog = pwerm::pwerm_catalog().map_err(to_napi_error)?;
    serde_json::to_string(catalog).map_err(to_napi_error)
}

#[napi]
pub fn pwerm_summary(input_json: String) -> NapiResult<String> {
    let input: pwerm::PwermSummaryInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pwerm::summarize_outcomes(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Stress testing
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_stress_scenarios(model_type: String) -> NapiResult<String> {
    let model_type: ModelType = model_type.parse().map_err(to_napi_error)?;
    serde_json::to_string(&stress::generate_stress_scenarios(model_type)).map_err(to_napi_error)
}

/// Either a full stress input, or `{ base_model, model_type }` to run the
/// built-in catalog for that domain.
#[derive(Deserialize)]
#[serde(untagged)]
enum StressRequest {
    Explicit(StressTestInput),
    Catalog {
        base_model: BaseModel,
        model_type: ModelType,
    },
}

#[napi]
pub fn run_stress_test(input_json: String) -> NapiResult<String> {
    let request: StressRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let input = match request {
        StressRequest::Explicit(input) => input,
        StressRequest::Catalog {
            base_model,
            model_type,
        } => StressTestInput {
            base_model,
            scenarios: stress::generate_stress_scenarios(model_type),
        },
    };
    let output = stress::run_stress_test(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Waterfall
// ---------------------------------------------------------------------------

#[napi]
pub fn distribute_waterfall(input_json: String) -> NapiResult<String> {
    let input: waterfall::WaterfallInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = waterfall::distribute_waterfall(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
