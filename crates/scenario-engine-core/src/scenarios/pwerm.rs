use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

use crate::error::EngineError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::EngineResult;

/// Size of the PWERM bucket enumeration; ids run 1..=PWERM_BUCKETS.
pub const PWERM_BUCKETS: u32 = 499;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Category tag of a valuation-outcome bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    Liquidation,
    Acquihire,
    SmallAcquisition,
    StrategicAcquisition,
    LargeAcquisition,
    Ipo,
    MegaIpo,
}

impl OutcomeType {
    pub const ALL: [OutcomeType; 7] = [
        OutcomeType::Liquidation,
        OutcomeType::Acquihire,
        OutcomeType::SmallAcquisition,
        OutcomeType::StrategicAcquisition,
        OutcomeType::LargeAcquisition,
        OutcomeType::Ipo,
        OutcomeType::MegaIpo,
    ];

    /// Strategic acquisitions and above count as a successful exit.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            OutcomeType::StrategicAcquisition
                | OutcomeType::LargeAcquisition
                | OutcomeType::Ipo
                | OutcomeType::MegaIpo
        )
    }

    pub fn is_downside(&self) -> bool {
        matches!(self, OutcomeType::Liquidation | OutcomeType::Acquihire)
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutcomeType::Liquidation => "Liquidation",
            OutcomeType::Acquihire => "Acquihire",
            OutcomeType::SmallAcquisition => "Small acquisition",
            OutcomeType::StrategicAcquisition => "Strategic acquisition",
            OutcomeType::LargeAcquisition => "Large acquisition",
            OutcomeType::Ipo => "IPO",
            OutcomeType::MegaIpo => "Mega IPO",
        }
    }

    /// Classify a synthesised bucket by its lower bound in $M.
    fn for_low_millions(low: i64) -> Self {
        match low {
            l if l < 50 => OutcomeType::Acquihire,
            l if l < 250 => OutcomeType::SmallAcquisition,
            l if l < 1_000 => OutcomeType::StrategicAcquisition,
            l if l < 1_700 => OutcomeType::LargeAcquisition,
            l if l < 10_000 => OutcomeType::Ipo,
            _ => OutcomeType::MegaIpo,
        }
    }
}

impl fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One valuation-outcome bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwermScenario {
    pub id: u32,
    pub name: String,
    /// Interval label, e.g. "$10M-$15M" or "$56B+"
    pub valuation_range: String,
    pub low: Money,
    /// `None` for the open-ended top bucket
    pub high: Option<Money>,
    pub outcome_type: OutcomeType,
}

impl PwermScenario {
    /// Bucket midpoint; the open-ended bucket is represented by its lower bound.
    pub fn midpoint(&self) -> Money {
        match self.high {
            Some(high) => (self.low + high) / dec!(2),
            None => self.low,
        }
    }
}

/// An explicitly named bucket. Amounts are in $M.
#[derive(Debug, Clone, Copy)]
pub struct KeyScenario {
    pub id: u32,
    pub name: &'static str,
    pub low_m: i64,
    pub high_m: Option<i64>,
    pub outcome_type: OutcomeType,
}

const fn key(
    id: u32,
    name: &'static str,
    low_m: i64,
    high_m: Option<i64>,
    outcome_type: OutcomeType,
) -> KeyScenario {
    KeyScenario {
        id,
        name,
        low_m,
        high_m,
        outcome_type,
    }
}

/// Named landmark buckets. Every id appears once; the build rejects repeats.
pub const KEY_SCENARIOS: &[KeyScenario] = &[
    key(1, "Dissolution, no recovery", 0, Some(1), OutcomeType::Liquidation),
    key(2, "Asset sale", 1, Some(3), OutcomeType::Liquidation),
    key(3, "IP sale", 3, Some(5), OutcomeType::Liquidation),
    key(4, "Acquihire, team only", 5, Some(7), OutcomeType::Acquihire),
    key(5, "Acquihire with retention", 7, Some(9), OutcomeType::Acquihire),
    key(6, "Distressed sale", 9, Some(10), OutcomeType::Acquihire),
    key(57, "Quarter-billion strategic sale", 260, Some(270), OutcomeType::StrategicAcquisition),
    key(131, "Unicorn acquisition", 1_000, Some(1_010), OutcomeType::LargeAcquisition),
    key(200, "Mid-cap IPO", 1_700, Some(1_720), OutcomeType::Ipo),
    key(300, "Growth-stage IPO", 3_700, Some(3_720), OutcomeType::Ipo),
    key(450, "Large-cap IPO", 7_000, Some(8_000), OutcomeType::Ipo),
    key(453, "Decacorn IPO", 10_000, Some(11_000), OutcomeType::MegaIpo),
    key(460, "Category-leader IPO", 17_000, Some(18_000), OutcomeType::MegaIpo),
    key(480, "Mega-cap IPO", 37_000, Some(38_000), OutcomeType::MegaIpo),
    key(499, "Generational outcome", 56_000, None, OutcomeType::MegaIpo),
];

// ---------------------------------------------------------------------------
// Catalog construction
// ---------------------------------------------------------------------------

fn millions(m: i64) -> Money {
    Decimal::from(m) * dec!(1_000_000)
}

/// "$15M", "$1.72B"
fn money_label(m: i64) -> String {
    if m >= 1_000 {
        let billions = (Decimal::from(m) / dec!(1000)).normalize();
        format!("${billions}B")
    } else {
        format!("${m}M")
    }
}

fn range_label(low_m: i64, high_m: Option<i64>) -> String {
    match high_m {
        Some(high) => format!("{}-{}", money_label(low_m), money_label(high)),
        None => format!("{}+", money_label(low_m)),
    }
}

/// Lower bound (in $M) of the piecewise-linear band for an unkeyed id.
fn band_low(id: i64) -> i64 {
    match id {
        1..=6 => id - 1,
        7..=56 => 10 + (id - 7) * 5,
        57..=199 => 260 + (id - 57) * 10,
        200..=449 => 1_700 + (id - 200) * 20,
        _ => 7_000 + (id - 450) * 1_000,
    }
}

/// Bucket bounds in $M. Each bucket ends where the next begins, so the last
/// bucket of a band stretches to the start of the following band.
fn synthesized_band(id: u32) -> (i64, Option<i64>) {
    let id = id as i64;
    if id >= PWERM_BUCKETS as i64 {
        return (band_low(PWERM_BUCKETS as i64), None);
    }
    (band_low(id), Some(band_low(id + 1)))
}

fn synthesize(id: u32) -> PwermScenario {
    let (low_m, high_m) = synthesized_band(id);
    let outcome_type = if id <= 3 {
        OutcomeType::Liquidation
    } else {
        OutcomeType::for_low_millions(low_m)
    };
    let valuation_range = range_label(low_m, high_m);
    PwermScenario {
        id,
        name: format!("{} {}", outcome_type.label(), valuation_range),
        valuation_range,
        low: millions(low_m),
        high: high_m.map(millions),
        outcome_type,
    }
}

fn from_key(k: &KeyScenario) -> PwermScenario {
    PwermScenario {
        id: k.id,
        name: k.name.to_string(),
        valuation_range: range_label(k.low_m, k.high_m),
        low: millions(k.low_m),
        high: k.high_m.map(millions),
        outcome_type: k.outcome_type,
    }
}

/// Build the ordered 1..=499 enumeration from a key table.
///
/// Keyed ids take their explicit definition; every other id is synthesised
/// from its band formula. A key id outside 1..=499 or defined twice fails the
/// whole build.
pub fn build_catalog(keys: &[KeyScenario]) -> EngineResult<Vec<PwermScenario>> {
    let mut keyed: BTreeMap<u32, &KeyScenario> = BTreeMap::new();
    for k in keys {
        if k.id == 0 || k.id > PWERM_BUCKETS {
            return Err(EngineError::invalid_input(
                "pwerm.id",
                format!("Id {} outside 1..={PWERM_BUCKETS}", k.id),
            ));
        }
        if keyed.insert(k.id, k).is_some() {
            return Err(EngineError::DuplicateId(k.id));
        }
    }

    let catalog: Vec<PwermScenario> = (1..=PWERM_BUCKETS)
        .map(|id| match keyed.get(&id) {
            Some(k) => from_key(k),
            None => synthesize(id),
        })
        .collect();

    tracing::trace!(keyed = keyed.len(), total = catalog.len(), "built PWERM catalog");
    Ok(catalog)
}

static CATALOG: OnceLock<EngineResult<Vec<PwermScenario>>> = OnceLock::new();

/// The read-only 499-entry catalog, built once per process.
pub fn pwerm_catalog() -> EngineResult<&'static [PwermScenario]> {
    match CATALOG.get_or_init(|| build_catalog(KEY_SCENARIOS)) {
        Ok(catalog) => Ok(catalog.as_slice()),
        Err(e) => Err(e.clone()),
    }
}

/// Mean bucket midpoint per outcome type.
pub fn representative_values(catalog: &[PwermScenario]) -> BTreeMap<OutcomeType, Money> {
    let mut sums: BTreeMap<OutcomeType, (Money, u32)> = BTreeMap::new();
    for s in catalog {
        let entry = sums.entry(s.outcome_type).or_insert((Decimal::ZERO, 0));
        entry.0 += s.midpoint();
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(t, (sum, n))| (t, sum / Decimal::from(n)))
        .collect()
}

// ---------------------------------------------------------------------------
// Per-company summary
// ---------------------------------------------------------------------------

/// Probability assigned to one outcome type for a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeProbability {
    pub outcome_type: OutcomeType,
    pub probability: Rate,
}

/// A company's outcome-type distribution, computed upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwermSummaryInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub distribution: Vec<OutcomeProbability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeContribution {
    pub outcome_type: OutcomeType,
    pub probability: Rate,
    pub representative_value: Money,
    pub weighted_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwermSummaryOutput {
    pub success_probability: Rate,
    pub downside_probability: Rate,
    pub expected_exit_value: Money,
    pub most_likely_outcome: OutcomeType,
    pub outcomes: Vec<OutcomeContribution>,
}

/// Aggregate a per-company outcome-type distribution into PWERM summary
/// fields (success probability, expected exit value).
pub fn summarize_outcomes(
    input: &PwermSummaryInput,
) -> EngineResult<ComputationOutput<PwermSummaryOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.distribution.is_empty() {
        return Err(EngineError::InsufficientData(
            "Outcome distribution must contain at least one outcome type".into(),
        ));
    }
    let mut seen = Vec::with_capacity(input.distribution.len());
    for o in &input.distribution {
        if o.probability < Decimal::ZERO || o.probability > Decimal::ONE {
            return Err(EngineError::invalid_range(
                format!("distribution.{}", o.outcome_type.label()),
                "Probability must be between 0 and 1",
            ));
        }
        if seen.contains(&o.outcome_type) {
            return Err(EngineError::invalid_input(
                "distribution",
                format!("Outcome type '{}' listed more than once", o.outcome_type),
            ));
        }
        seen.push(o.outcome_type);
    }
    let total: Rate = input.distribution.iter().map(|o| o.probability).sum();
    if (total - Decimal::ONE).abs() > dec!(0.01) {
        return Err(EngineError::invalid_range(
            "distribution",
            format!("Probabilities must sum to 1.0 (got {total})"),
        ));
    }
    if total != Decimal::ONE {
        warnings.push(format!(
            "Probabilities sum to {total}; treated as approximately 1.0"
        ));
    }

    let representative = representative_values(pwerm_catalog()?);

    let mut outcomes = Vec::with_capacity(input.distribution.len());
    let mut expected_exit_value = Decimal::ZERO;
    let mut success_probability = Decimal::ZERO;
    let mut downside_probability = Decimal::ZERO;
    let mut most_likely = &input.distribution[0];

    for o in &input.distribution {
        let value = representative
            .get(&o.outcome_type)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let weighted = value * o.probability;
        expected_exit_value += weighted;
        if o.outcome_type.is_success() {
            success_probability += o.probability;
        }
        if o.outcome_type.is_downside() {
            downside_probability += o.probability;
        }
        if o.probability > most_likely.probability {
            most_likely = o;
        }
        outcomes.push(OutcomeContribution {
            outcome_type: o.outcome_type,
            probability: o.probability,
            representative_value: value,
            weighted_value: weighted,
        });
    }

    let output = PwermSummaryOutput {
        success_probability,
        downside_probability,
        expected_exit_value,
        most_likely_outcome: most_likely.outcome_type,
        outcomes,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "PWERM Outcome Summary",
        &serde_json::json!({
            "company": input.company,
            "num_outcome_types": input.distribution.len(),
            "buckets": PWERM_BUCKETS,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
