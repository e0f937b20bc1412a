use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::EngineError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Domain of the model being stressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Venture,
    Credit,
    Growth,
    RealEstate,
}

impl ModelType {
    pub const ALL: [ModelType; 4] = [
        ModelType::Venture,
        ModelType::Credit,
        ModelType::Growth,
        ModelType::RealEstate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Venture => "venture",
            ModelType::Credit => "credit",
            ModelType::Growth => "growth",
            ModelType::RealEstate => "real_estate",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        ModelType::ALL
            .into_iter()
            .find(|m| m.as_str() == key)
            .ok_or_else(|| {
                EngineError::invalid_input("model_type", format!("Unknown model type '{s}'"))
            })
    }
}

/// Model assumption names. Unrecognised names are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssumptionKey {
    RevenueGrowth,
    BurnRate,
    ExitMultiple,
    Wacc,
    Dscr,
    DefaultRate,
    RecoveryRate,
    ChurnRate,
    Occupancy,
    CapRate,
    Other(String),
}

impl AssumptionKey {
    pub fn as_str(&self) -> &str {
        match self {
            AssumptionKey::RevenueGrowth => "revenue_growth",
            AssumptionKey::BurnRate => "burn_rate",
            AssumptionKey::ExitMultiple => "exit_multiple",
            AssumptionKey::Wacc => "wacc",
            AssumptionKey::Dscr => "dscr",
            AssumptionKey::DefaultRate => "default_rate",
            AssumptionKey::RecoveryRate => "recovery_rate",
            AssumptionKey::ChurnRate => "churn_rate",
            AssumptionKey::Occupancy => "occupancy",
            AssumptionKey::CapRate => "cap_rate",
            AssumptionKey::Other(name) => name,
        }
    }
}

impl From<String> for AssumptionKey {
    fn from(s: String) -> Self {
        match s.as_str() {
            "revenue_growth" => AssumptionKey::RevenueGrowth,
            "burn_rate" => AssumptionKey::BurnRate,
            "exit_multiple" => AssumptionKey::ExitMultiple,
            "wacc" => AssumptionKey::Wacc,
            "dscr" => AssumptionKey::Dscr,
            "default_rate" => AssumptionKey::DefaultRate,
            "recovery_rate" => AssumptionKey::RecoveryRate,
            "churn_rate" => AssumptionKey::ChurnRate,
            "occupancy" => AssumptionKey::Occupancy,
            "cap_rate" => AssumptionKey::CapRate,
            _ => AssumptionKey::Other(s),
        }
    }
}

impl From<AssumptionKey> for String {
    fn from(k: AssumptionKey) -> Self {
        k.as_str().to_string()
    }
}

impl fmt::Display for AssumptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An assumption value. Numbers are shocked multiplicatively, anything else
/// is replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssumptionValue {
    Number(Decimal),
    Flag(bool),
    Text(String),
}

impl AssumptionValue {
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            AssumptionValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// The unstressed model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseModel {
    /// Base valuation (must be positive)
    pub value: Money,
    pub irr: Rate,
    /// Minimum acceptable IRR
    pub hurdle_rate: Rate,
    #[serde(default)]
    pub assumptions: BTreeMap<AssumptionKey, AssumptionValue>,
}

/// Outcome degradation factors. Absent fields take their documented default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StressOutcomes {
    /// Fraction of value lost; default 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_loss: Option<Rate>,
    /// Fractional IRR haircut; default 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dilution: Option<Rate>,
    /// Default 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survival_probability: Option<Rate>,
    /// Default 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_probability: Option<Rate>,
    /// Default false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_freeze: Option<bool>,
    /// Default 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_share_loss: Option<Rate>,
}

impl StressOutcomes {
    pub fn total_loss_or_zero(&self) -> Rate {
        self.total_loss.unwrap_or(Decimal::ZERO)
    }

    pub fn dilution_or_zero(&self) -> Rate {
        self.dilution.unwrap_or(Decimal::ZERO)
    }

    pub fn survival_or_one(&self) -> Rate {
        self.survival_probability.unwrap_or(Decimal::ONE)
    }

    pub fn shutdown_or_zero(&self) -> Rate {
        self.shutdown_probability.unwrap_or(Decimal::ZERO)
    }

    pub fn freezes_funding(&self) -> bool {
        self.funding_freeze.unwrap_or(false)
    }

    pub fn market_share_loss_or_zero(&self) -> Rate {
        self.market_share_loss.unwrap_or(Decimal::ZERO)
    }

    fn fractions(&self) -> [(&'static str, Option<Rate>); 5] {
        [
            ("total_loss", self.total_loss),
            ("dilution", self.dilution),
            ("survival_probability", self.survival_probability),
            ("shutdown_probability", self.shutdown_probability),
            ("market_share_loss", self.market_share_loss),
        ]
    }
}

/// A low-probability tail scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenario {
    pub id: String,
    pub name: String,
    pub probability: Rate,
    pub model_type: ModelType,
    /// Multipliers (numbers) or replacements (flags, text) per assumption
    #[serde(default)]
    pub shocks: BTreeMap<AssumptionKey, AssumptionValue>,
    #[serde(default)]
    pub outcomes: StressOutcomes,
}

/// Input for the stress-testing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestInput {
    pub base_model: BaseModel,
    pub scenarios: Vec<StressScenario>,
}

/// Result for a single stress scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressResult {
    pub scenario: String,
    pub scenario_id: String,
    pub probability: Rate,
    pub stressed_value: Money,
    pub stressed_irr: Rate,
    /// (base value − stressed value) / base value
    pub impact: Rate,
    pub breaks_model: bool,
    pub mitigations: Vec<String>,
    pub survival_probability: Rate,
    pub shutdown_probability: Rate,
    /// Assumptions after shocks were applied
    pub stressed_assumptions: BTreeMap<AssumptionKey, AssumptionValue>,
}

/// Cross-scenario summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressSummary {
    pub worst_scenario: String,
    pub max_impact: Rate,
    pub breach_count: usize,
    /// Σ probability × impact over the tested scenarios
    pub probability_weighted_impact: Rate,
}

/// Output of the stress-testing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestOutput {
    pub results: Vec<StressResult>,
    pub summary: StressSummary,
}

// ---------------------------------------------------------------------------
// Mitigation rules
// ---------------------------------------------------------------------------

struct RuleContext<'a> {
    impact: Rate,
    outcomes: &'a StressOutcomes,
    dscr: Option<Decimal>,
}

struct MitigationRule {
    applies: fn(&RuleContext<'_>) -> bool,
    text: &'static str,
}

fn severe_impact(c: &RuleContext<'_>) -> bool {
    c.impact > dec!(0.5)
}

fn funding_frozen(c: &RuleContext<'_>) -> bool {
    c.outcomes.freezes_funding()
}

fn loses_share(c: &RuleContext<'_>) -> bool {
    c.outcomes.market_share_loss_or_zero() > Decimal::ZERO
}

fn dscr_breach(c: &RuleContext<'_>) -> bool {
    c.dscr.is_some_and(|d| d < Decimal::ONE)
}

const MITIGATION_RULES: &[MitigationRule] = &[
    MitigationRule {
        applies: severe_impact,
        text: "Severe value impact: reduce concentration and reserve follow-on capital",
    },
    MitigationRule {
        applies: funding_frozen,
        text: "Funding freeze: extend runway beyond 24 months and cut discretionary burn",
    },
    MitigationRule {
        applies: loses_share,
        text: "Market share loss: prioritise retention and core product differentiation",
    },
    MitigationRule {
        applies: dscr_breach,
        text: "DSCR below 1.0x: renegotiate covenants or restructure debt service",
    },
];

fn mitigations_for(ctx: &RuleContext<'_>) -> Vec<String> {
    MITIGATION_RULES
        .iter()
        .filter(|r| (r.applies)(ctx))
        .map(|r| r.text.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Apply shocks to the keys the base model carries. Keys absent from the
/// base model are ignored.
pub fn apply_shocks(
    base: &BTreeMap<AssumptionKey, AssumptionValue>,
    shocks: &BTreeMap<AssumptionKey, AssumptionValue>,
) -> BTreeMap<AssumptionKey, AssumptionValue> {
    let mut stressed = base.clone();
    for (key, shock) in shocks {
        let Some(current) = stressed.get_mut(key) else {
            continue;
        };
        let next = match (&*current, shock) {
            (AssumptionValue::Number(value), AssumptionValue::Number(multiplier)) => {
                AssumptionValue::Number(*value * *multiplier)
            }
            _ => shock.clone(),
        };
        *current = next;
    }
    stressed
}

fn validate(input: &StressTestInput) -> EngineResult<()> {
    if input.base_model.value <= Decimal::ZERO {
        return Err(EngineError::invalid_input(
            "base_model.value",
            "Base value must be positive",
        ));
    }
    if input.scenarios.is_empty() {
        return Err(EngineError::InsufficientData(
            "At least one stress scenario required".into(),
        ));
    }
    for s in &input.scenarios {
        if s.probability < Decimal::ZERO || s.probability > Decimal::ONE {
            return Err(EngineError::invalid_range(
                format!("scenario:{} probability", s.id),
                "Probability must be between 0 and 1",
            ));
        }
        for (name, value) in s.outcomes.fractions() {
            if let Some(v) = value {
                if v < Decimal::ZERO || v > Decimal::ONE {
                    return Err(EngineError::invalid_range(
                        format!("scenario:{} {name}", s.id),
                        "Outcome factors must be between 0 and 1",
                    ));
                }
            }
        }
    }
    Ok(())
}

fn evaluate_scenario(base: &BaseModel, scenario: &StressScenario) -> StressResult {
    let stressed_assumptions = apply_shocks(&base.assumptions, &scenario.shocks);
    let outcomes = &scenario.outcomes;

    let stressed_value = base.value * (Decimal::ONE - outcomes.total_loss_or_zero());
    let stressed_irr = base.irr * (Decimal::ONE - outcomes.dilution_or_zero());
    let impact = (base.value - stressed_value) / base.value;
    let breaks_model = stressed_value < Decimal::ZERO || stressed_irr < base.hurdle_rate;

    let dscr = stressed_assumptions
        .get(&AssumptionKey::Dscr)
        .and_then(AssumptionValue::as_number);
    let mitigations = mitigations_for(&RuleContext {
        impact,
        outcomes,
        dscr,
    });

    StressResult {
        scenario: scenario.name.clone(),
        scenario_id: scenario.id.clone(),
        probability: scenario.probability,
        stressed_value,
        stressed_irr,
        impact,
        breaks_model,
        mitigations,
        survival_probability: outcomes.survival_or_one(),
        shutdown_probability: outcomes.shutdown_or_zero(),
        stressed_assumptions,
    }
}

/// Run every scenario against the base model.
///
/// `value = base × (1 − total_loss)`, `irr = base_irr × (1 − dilution)`;
/// a scenario breaks the model when the stressed value is negative or the
/// stressed IRR falls below the hurdle rate.
pub fn run_stress_test(
    input: &StressTestInput,
) -> EngineResult<ComputationOutput<StressTestOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(input)?;
    tracing::debug!(scenarios = input.scenarios.len(), "running stress test");

    for s in &input.scenarios {
        let unmatched: Vec<&str> = s
            .shocks
            .keys()
            .filter(|k| !input.base_model.assumptions.contains_key(*k))
            .map(AssumptionKey::as_str)
            .collect();
        if !unmatched.is_empty() {
            warnings.push(format!(
                "Scenario '{}' shocks assumptions absent from the base model: {}",
                s.id,
                unmatched.join(", ")
            ));
        }
    }

    let results: Vec<StressResult> = input
        .scenarios
        .iter()
        .map(|s| evaluate_scenario(&input.base_model, s))
        .collect();

    let worst = results
        .iter()
        .max_by(|a, b| a.impact.cmp(&b.impact))
        .ok_or_else(|| EngineError::InsufficientData("No stress results".into()))?;

    let summary = StressSummary {
        worst_scenario: worst.scenario.clone(),
        max_impact: worst.impact,
        breach_count: results.iter().filter(|r| r.breaks_model).count(),
        probability_weighted_impact: results.iter().map(|r| r.probability * r.impact).sum(),
    };

    let output = StressTestOutput { results, summary };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Tail-Risk Stress Test",
        &serde_json::json!({
            "base_value": input.base_model.value.to_string(),
            "base_irr": input.base_model.irr.to_string(),
            "hurdle_rate": input.base_model.hurdle_rate.to_string(),
            "num_scenarios": input.scenarios.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
