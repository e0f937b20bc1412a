use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::EngineError;
use crate::EngineResult;

/// Tolerance on the sum of probabilities within a scenario group.
pub const PROBABILITY_TOLERANCE: f64 = 0.01;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Domain a scenario group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCategory {
    Exit,
    Growth,
    Market,
    Macro,
    Regulatory,
    Operational,
}

impl ScenarioCategory {
    pub const ALL: [ScenarioCategory; 6] = [
        ScenarioCategory::Exit,
        ScenarioCategory::Growth,
        ScenarioCategory::Market,
        ScenarioCategory::Macro,
        ScenarioCategory::Regulatory,
        ScenarioCategory::Operational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioCategory::Exit => "exit",
            ScenarioCategory::Growth => "growth",
            ScenarioCategory::Market => "market",
            ScenarioCategory::Macro => "macro",
            ScenarioCategory::Regulatory => "regulatory",
            ScenarioCategory::Operational => "operational",
        }
    }
}

impl fmt::Display for ScenarioCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::UnknownCategory(s.to_string()))
    }
}

/// Known scenario drivers plus a free-form extension map.
///
/// Exit templates carry `exit_multiple` and `time_to_exit`, growth templates
/// carry `growth_rate`, market templates carry `market_multiplier`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssumptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_multiple: Option<f64>,
    /// Years from investment to exit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_exit: Option<f64>,
    /// Annual revenue growth rate (0.25 = 25%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<f64>,
    /// Scales the growth rate; absent means 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
}

impl ScenarioAssumptions {
    pub fn market_multiplier_or_default(&self) -> f64 {
        self.market_multiplier.unwrap_or(1.0)
    }
}

/// A single probability-weighted scenario template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub probability: f64,
    #[serde(default)]
    pub assumptions: ScenarioAssumptions,
    /// Named result deltas (e.g. `value_delta`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outcomes: BTreeMap<String, f64>,
}

impl Scenario {
    /// Exit scenario with a multiple on invested capital and a holding period.
    pub fn exit(id: &str, name: &str, probability: f64, multiple: f64, years: f64) -> Self {
        Scenario {
            id: id.into(),
            name: name.into(),
            probability,
            assumptions: ScenarioAssumptions {
                exit_multiple: Some(multiple),
                time_to_exit: Some(years),
                ..Default::default()
            },
            outcomes: BTreeMap::new(),
        }
    }

    /// Growth scenario driving the annual revenue growth rate.
    pub fn growth(id: &str, name: &str, probability: f64, growth_rate: f64) -> Self {
        Scenario {
            id: id.into(),
            name: name.into(),
            probability,
            assumptions: ScenarioAssumptions {
                growth_rate: Some(growth_rate),
                ..Default::default()
            },
            outcomes: BTreeMap::new(),
        }
    }

    /// Market scenario scaling realised growth.
    pub fn market(id: &str, name: &str, probability: f64, multiplier: f64) -> Self {
        Scenario {
            id: id.into(),
            name: name.into(),
            probability,
            assumptions: ScenarioAssumptions {
                market_multiplier: Some(multiplier),
                ..Default::default()
            },
            outcomes: BTreeMap::new(),
        }
    }

    fn with_extra(mut self, key: &str, value: f64) -> Self {
        self.assumptions.extra.insert(key.into(), value);
        self
    }

    fn with_outcome(mut self, key: &str, value: f64) -> Self {
        self.outcomes.insert(key.into(), value);
        self
    }

    fn with_market_multiplier(mut self, multiplier: f64) -> Self {
        self.assumptions.market_multiplier = Some(multiplier);
        self
    }

    fn template(id: &str, name: &str, probability: f64) -> Self {
        Scenario {
            id: id.into(),
            name: name.into(),
            probability,
            assumptions: ScenarioAssumptions::default(),
            outcomes: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check that a group is non-empty, every probability lies in [0, 1] and the
/// probabilities sum to 1 within [`PROBABILITY_TOLERANCE`].
pub fn validate_group(scenarios: &[Scenario]) -> EngineResult<()> {
    if scenarios.is_empty() {
        return Err(EngineError::InsufficientData(
            "Scenario group must contain at least one scenario".into(),
        ));
    }
    for s in scenarios {
        if !s.probability.is_finite() || !(0.0..=1.0).contains(&s.probability) {
            return Err(EngineError::invalid_range(
                format!("scenario:{} probability", s.id),
                format!("Probability must be between 0 and 1 (got {})", s.probability),
            ));
        }
    }
    let total: f64 = scenarios.iter().map(|s| s.probability).sum();
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(EngineError::invalid_range(
            "probabilities",
            format!("Probabilities must sum to 1.0 (got {total:.4})"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable registry of scenario groups keyed by category.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioCatalog {
    groups: BTreeMap<ScenarioCategory, Vec<Scenario>>,
}

static CATALOG: OnceLock<ScenarioCatalog> = OnceLock::new();

impl ScenarioCatalog {
    /// Process-wide catalog, built on first use.
    pub fn global() -> &'static ScenarioCatalog {
        CATALOG.get_or_init(|| {
            tracing::trace!("building scenario catalog");
            ScenarioCatalog::build()
        })
    }

    fn build() -> Self {
        let groups = ScenarioCategory::ALL
            .into_iter()
            .map(|c| (c, templates(c)))
            .collect();
        ScenarioCatalog { groups }
    }

    pub fn categories(&self) -> Vec<ScenarioCategory> {
        self.groups.keys().copied().collect()
    }

    /// Scenarios for a category key. Unknown keys yield an empty slice, which
    /// callers must read as "no data".
    pub fn group(&self, key: &str) -> &[Scenario] {
        match key.parse::<ScenarioCategory>() {
            Ok(c) => self.group_for(c),
            Err(_) => {
                tracing::debug!(key, "unknown scenario category");
                &[]
            }
        }
    }

    /// Strict lookup: unknown keys are an error.
    pub fn try_group(&self, key: &str) -> EngineResult<&[Scenario]> {
        let category: ScenarioCategory = key.parse()?;
        Ok(self.group_for(category))
    }

    pub fn group_for(&self, category: ScenarioCategory) -> &[Scenario] {
        self.groups.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (category, scenarios) in &self.groups {
            validate_group(scenarios).map_err(|e| match e {
                EngineError::InvalidRange { field, reason } => EngineError::InvalidRange {
                    field: format!("{category}.{field}"),
                    reason,
                },
                other => other,
            })?;
        }
        Ok(())
    }
}

fn templates(category: ScenarioCategory) -> Vec<Scenario> {
    match category {
        ScenarioCategory::Exit => vec![
            Scenario::exit("exit-ipo", "IPO", 0.05, 20.0, 7.0).with_outcome("value_delta", 19.0),
            Scenario::exit("exit-strategic", "Strategic acquisition", 0.15, 5.0, 5.0)
                .with_outcome("value_delta", 4.0),
            Scenario::exit("exit-secondary", "Secondary sale", 0.10, 2.5, 4.0)
                .with_outcome("value_delta", 1.5),
            Scenario::exit("exit-acquihire", "Acquihire", 0.15, 1.0, 3.0)
                .with_outcome("value_delta", 0.0),
            Scenario::exit("exit-zombie", "Zombie / living dead", 0.15, 0.5, 7.0)
                .with_outcome("value_delta", -0.5),
            Scenario::exit("exit-shutdown", "Shutdown", 0.40, 0.0, 3.0)
                .with_outcome("value_delta", -1.0),
        ],
        ScenarioCategory::Growth => vec![
            Scenario::growth("growth-hyper", "Hypergrowth", 0.10, 1.00),
            Scenario::growth("growth-strong", "Strong growth", 0.25, 0.50),
            Scenario::growth("growth-moderate", "Moderate growth", 0.35, 0.25),
            Scenario::growth("growth-stagnation", "Stagnation", 0.20, 0.05),
            Scenario::growth("growth-decline", "Decline", 0.10, -0.15),
        ],
        ScenarioCategory::Market => vec![
            Scenario::market("market-bull", "Bull market", 0.25, 1.20),
            Scenario::market("market-normal", "Normal market", 0.45, 1.00),
            Scenario::market("market-bear", "Bear market", 0.20, 0.80),
            Scenario::market("market-crash", "Market crash", 0.10, 0.50),
        ],
        ScenarioCategory::Macro => vec![
            Scenario::template("macro-expansion", "Expansion", 0.35)
                .with_market_multiplier(1.10)
                .with_extra("funding_availability", 1.20)
                .with_outcome("value_delta", 0.10),
            Scenario::template("macro-soft-landing", "Soft landing", 0.30)
                .with_market_multiplier(1.00)
                .with_extra("funding_availability", 1.00),
            Scenario::template("macro-recession", "Recession", 0.25)
                .with_market_multiplier(0.75)
                .with_extra("funding_availability", 0.60)
                .with_outcome("value_delta", -0.25),
            Scenario::template("macro-stagflation", "Stagflation", 0.10)
                .with_market_multiplier(0.85)
                .with_extra("funding_availability", 0.70)
                .with_outcome("value_delta", -0.15),
        ],
        ScenarioCategory::Regulatory => vec![
            Scenario::template("reg-favourable", "Favourable regulation", 0.20)
                .with_extra("compliance_cost", 0.90)
                .with_outcome("value_delta", 0.10),
            Scenario::template("reg-status-quo", "Status quo", 0.55)
                .with_extra("compliance_cost", 1.00),
            Scenario::template("reg-tightening", "Regulatory tightening", 0.20)
                .with_extra("compliance_cost", 1.20)
                .with_outcome("value_delta", -0.15),
            Scenario::template("reg-prohibitive", "Prohibitive regulation", 0.05)
                .with_extra("compliance_cost", 2.00)
                .with_outcome("value_delta", -0.60),
        ],
        ScenarioCategory::Operational => vec![
            Scenario::template("ops-flawless", "Flawless execution", 0.15)
                .with_extra("execution_multiplier", 1.15)
                .with_outcome("value_delta", 0.15),
            Scenario::template("ops-minor-setbacks", "Minor setbacks", 0.50)
                .with_extra("execution_multiplier", 1.00),
            Scenario::template("ops-key-person", "Key person loss", 0.25)
                .with_extra("execution_multiplier", 0.80)
                .with_outcome("value_delta", -0.20),
            Scenario::template("ops-major-failure", "Major operational failure", 0.10)
                .with_extra("execution_multiplier", 0.50)
                .with_outcome("value_delta", -0.50),
        ],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_group_sums_to_one() {
        let catalog = ScenarioCatalog::global();
        for category in ScenarioCategory::ALL {
            let total: f64 = catalog.group_for(category).iter().map(|s| s.probability).sum();
            assert!(
                (total - 1.0).abs() <= PROBABILITY_TOLERANCE,
                "{category} sums to {total}"
            );
        }
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_unknown_category_is_empty_not_error() {
        let catalog = ScenarioCatalog::global();
        assert!(catalog.group("crypto_winter").is_empty());
        assert!(matches!(
            catalog.try_group("crypto_winter"),
            Err(EngineError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_category_keys_are_case_insensitive() {
        let catalog = ScenarioCatalog::global();
        assert_eq!(catalog.group("EXIT").len(), catalog.group("exit").len());
        assert_eq!(catalog.categories().len(), 6);
    }

    #[test]
    fn test_exit_templates_carry_multiple_and_horizon() {
        for s in ScenarioCatalog::global().group("exit") {
            assert!(s.assumptions.exit_multiple.is_some(), "{}", s.id);
            assert!(s.assumptions.time_to_exit.unwrap_or(0.0) > 0.0, "{}", s.id);
        }
    }

    #[test]
    fn test_global_catalog_is_shared() {
        let a = ScenarioCatalog::global() as *const ScenarioCatalog;
        let b = ScenarioCatalog::global() as *const ScenarioCatalog;
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_group_rejects_bad_probabilities() {
        let bad_sum = vec![
            Scenario::growth("a", "A", 0.3, 0.1),
            Scenario::growth("b", "B", 0.3, 0.1),
        ];
        assert!(matches!(
            validate_group(&bad_sum),
            Err(EngineError::InvalidRange { .. })
        ));

        let out_of_range = vec![
            Scenario::growth("a", "A", -0.5, 0.1),
            Scenario::growth("b", "B", 1.5, 0.1),
        ];
        assert!(validate_group(&out_of_range).is_err());

        assert!(matches!(
            validate_group(&[]),
            Err(EngineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_validate_group_accepts_within_tolerance() {
        let near = vec![
            Scenario::growth("a", "A", 0.333, 0.1),
            Scenario::growth("b", "B", 0.333, 0.1),
            Scenario::growth("c", "C", 0.333, 0.1),
        ];
        assert!(validate_group(&near).is_ok());
    }
}
