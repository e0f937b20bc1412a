use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::random::{seeded_rng, RandomSource};
use super::simulation::{default_num_simulations, MIN_SIMULATIONS};
use super::statistics::{sort_ascending, summarize_sorted, SummaryStats};
use crate::error::EngineError;
use crate::types::{with_metadata_f64, ComputationOutput, RateRange};
use crate::EngineResult;

/// Grid points per swept axis of the sensitivity matrix.
pub const SENSITIVITY_GRID_POINTS: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a Monte Carlo DCF valuation over projected revenues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfSimulationInput {
    /// Projected revenue for years 1..=n
    pub revenues: Vec<f64>,
    /// FCF margin on revenue, sampled uniformly
    pub margin_range: RateRange,
    /// Discount rate, sampled uniformly
    pub wacc_range: RateRange,
    /// Gordon-growth rate, sampled uniformly
    pub terminal_growth_range: RateRange,
    /// Number of simulation paths (minimum 100).
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Input for the deterministic margin × WACC sensitivity grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfSensitivityInput {
    pub revenues: Vec<f64>,
    pub margin_range: RateRange,
    pub wacc_range: RateRange,
    pub terminal_growth_range: RateRange,
}

/// Deterministic 2-way valuation grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    /// Row axis
    pub margin_values: Vec<f64>,
    /// Column axis
    pub wacc_values: Vec<f64>,
    /// Terminal growth held fixed across the grid (range midpoint)
    pub terminal_growth: f64,
    /// `matrix[i][j]` = valuation at `margin_values[i]`, `wacc_values[j]`
    pub matrix: Vec<Vec<f64>>,
}

/// Output of a Monte Carlo DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfSimulationOutput {
    /// Per-path valuations in sampling order
    pub valuations: Vec<f64>,
    pub summary: SummaryStats,
    pub sensitivity_matrix: SensitivityMatrix,
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Present value of `revenue_t × margin` for t = 1..=n plus a Gordon-growth
/// terminal value on the final year's FCF, discounted at `wacc`.
pub fn dcf_value(
    revenues: &[f64],
    margin: f64,
    wacc: f64,
    terminal_growth: f64,
) -> EngineResult<f64> {
    if revenues.is_empty() {
        return Err(EngineError::InsufficientData(
            "At least one projected revenue is required".into(),
        ));
    }
    if wacc <= terminal_growth {
        return Err(EngineError::invalid_range(
            "wacc",
            format!("WACC ({wacc}) must exceed terminal growth ({terminal_growth})"),
        ));
    }

    let mut pv = 0.0_f64;
    let mut discount_factor = 1.0_f64;
    let mut last_fcf = 0.0_f64;
    for revenue in revenues {
        let fcf = revenue * margin;
        discount_factor /= 1.0 + wacc;
        pv += fcf * discount_factor;
        last_fcf = fcf;
    }

    let terminal_value = last_fcf * (1.0 + terminal_growth) / (wacc - terminal_growth);
    pv += terminal_value * discount_factor;
    Ok(pv)
}

/// Reject any range combination under which a sampled or swept WACC could
/// fall at or below terminal growth.
fn validate_ranges(
    revenues: &[f64],
    margin: &RateRange,
    wacc: &RateRange,
    terminal_growth: &RateRange,
) -> EngineResult<()> {
    if revenues.is_empty() {
        return Err(EngineError::InsufficientData(
            "At least one projected revenue is required".into(),
        ));
    }
    if revenues.iter().any(|r| !r.is_finite()) {
        return Err(EngineError::invalid_input("revenues", "Revenues must be finite"));
    }
    for (name, range) in [
        ("margin_range", margin),
        ("wacc_range", wacc),
        ("terminal_growth_range", terminal_growth),
    ] {
        if !range.is_well_formed() {
            return Err(EngineError::invalid_range(
                name,
                format!(
                    "Range must be finite with min <= max (got [{}, {}])",
                    range.min, range.max
                ),
            ));
        }
    }
    if wacc.min <= 0.0 {
        return Err(EngineError::invalid_range("wacc_range", "WACC must be positive"));
    }
    if terminal_growth.min <= -1.0 {
        return Err(EngineError::invalid_range(
            "terminal_growth_range",
            "Terminal growth must exceed -100%",
        ));
    }
    if wacc.min <= terminal_growth.max {
        return Err(EngineError::invalid_range(
            "wacc_range",
            format!(
                "Minimum WACC ({}) must exceed maximum terminal growth ({})",
                wacc.min, terminal_growth.max
            ),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API: sensitivity grid
// ---------------------------------------------------------------------------

/// Build the deterministic margin × WACC grid with terminal growth held at
/// the midpoint of its range.
pub fn sensitivity_matrix(
    revenues: &[f64],
    margin_range: &RateRange,
    wacc_range: &RateRange,
    terminal_growth_range: &RateRange,
) -> EngineResult<SensitivityMatrix> {
    validate_ranges(revenues, margin_range, wacc_range, terminal_growth_range)?;

    let points = SENSITIVITY_GRID_POINTS;
    let margin_values: Vec<f64> = (0..points).map(|k| margin_range.grid_point(k, points)).collect();
    let wacc_values: Vec<f64> = (0..points).map(|k| wacc_range.grid_point(k, points)).collect();
    let terminal_growth = terminal_growth_range.midpoint();

    let mut matrix = Vec::with_capacity(points);
    for &margin in &margin_values {
        let mut row = Vec::with_capacity(points);
        for &wacc in &wacc_values {
            row.push(dcf_value(revenues, margin, wacc, terminal_growth)?);
        }
        matrix.push(row);
    }

    Ok(SensitivityMatrix {
        margin_values,
        wacc_values,
        terminal_growth,
        matrix,
    })
}

/// Sensitivity grid wrapped in the standard output envelope.
pub fn run_dcf_sensitivity(
    input: &DcfSensitivityInput,
) -> EngineResult<ComputationOutput<SensitivityMatrix>> {
    let start = Instant::now();
    let output = sensitivity_matrix(
        &input.revenues,
        &input.margin_range,
        &input.wacc_range,
        &input.terminal_growth_range,
    )?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "DCF Sensitivity Grid (Margin x WACC)",
        &serde_json::json!({
            "projection_years": input.revenues.len(),
            "grid_points": SENSITIVITY_GRID_POINTS,
            "terminal_growth": output.terminal_growth,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Public API: Monte Carlo DCF
// ---------------------------------------------------------------------------

/// Run a Monte Carlo DCF with an RNG built from `input.seed`.
pub fn simulate_dcf(
    input: &DcfSimulationInput,
) -> EngineResult<ComputationOutput<DcfSimulationOutput>> {
    let mut rng = seeded_rng(input.seed);
    simulate_dcf_with(input, &mut rng)
}

/// Run a Monte Carlo DCF drawing from the given random source.
///
/// Margin, WACC and terminal growth are drawn uniformly from their ranges on
/// every path. The sensitivity grid is computed separately and does not use
/// the random source.
pub fn simulate_dcf_with<R: RandomSource + ?Sized>(
    input: &DcfSimulationInput,
    rng: &mut R,
) -> EngineResult<ComputationOutput<DcfSimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.num_simulations < MIN_SIMULATIONS {
        return Err(EngineError::invalid_input(
            "num_simulations",
            format!("Must be at least {MIN_SIMULATIONS}"),
        ));
    }
    let sensitivity = sensitivity_matrix(
        &input.revenues,
        &input.margin_range,
        &input.wacc_range,
        &input.terminal_growth_range,
    )?;

    let n = input.num_simulations as usize;
    tracing::debug!(
        num_simulations = n,
        projection_years = input.revenues.len(),
        seeded = input.seed.is_some(),
        "simulating DCF"
    );

    let mut valuations = Vec::with_capacity(n);
    for _ in 0..n {
        let margin = input.margin_range.lerp(rng.next_uniform());
        let wacc = input.wacc_range.lerp(rng.next_uniform());
        let terminal_growth = input.terminal_growth_range.lerp(rng.next_uniform());
        valuations.push(dcf_value(&input.revenues, margin, wacc, terminal_growth)?);
    }

    if input.margin_range.min < 0.0 {
        warnings.push("Margin range includes negative margins; valuations may be negative".into());
    }

    let mut sorted = valuations.clone();
    sort_ascending(&mut sorted);
    let summary = summarize_sorted(&sorted);

    let output = DcfSimulationOutput {
        valuations,
        summary,
        sensitivity_matrix: sensitivity,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo DCF Valuation",
        &serde_json::json!({
            "projection_years": input.revenues.len(),
            "margin_range": input.margin_range,
            "wacc_range": input.wacc_range,
            "terminal_growth_range": input.terminal_growth_range,
            "num_simulations": input.num_simulations,
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::random::SequenceSource;

    const SEED: u64 = 42;

    fn revenues() -> Vec<f64> {
        vec![100.0, 120.0, 144.0, 172.8, 207.36]
    }

    fn basic_input() -> DcfSimulationInput {
        DcfSimulationInput {
            revenues: revenues(),
            margin_range: RateRange::new(0.10, 0.30),
            wacc_range: RateRange::new(0.08, 0.16),
            terminal_growth_range: RateRange::new(0.01, 0.03),
            num_simulations: 5_000,
            seed: Some(SEED),
        }
    }

    #[test]
    fn test_dcf_value_known_answer() {
        // Single year: FCF 10, wacc 10%, g 0% => 10/1.1 + (10/0.1)/1.1 = 100
        let v = dcf_value(&[100.0], 0.10, 0.10, 0.0).unwrap();
        assert!((v - 100.0).abs() < 1e-9, "v={v}");
    }

    #[test]
    fn test_dcf_value_rejects_wacc_below_growth() {
        assert!(matches!(
            dcf_value(&[100.0], 0.2, 0.03, 0.03),
            Err(EngineError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_matrix_decreasing_in_wacc() {
        let input = basic_input();
        let m = sensitivity_matrix(
            &input.revenues,
            &input.margin_range,
            &input.wacc_range,
            &input.terminal_growth_range,
        )
        .unwrap();
        assert_eq!(m.matrix.len(), 5);
        assert!(m.matrix.iter().all(|row| row.len() == 5));
        for row in &m.matrix {
            for j in 0..row.len() - 1 {
                assert!(row[j] > row[j + 1], "row not decreasing: {row:?}");
            }
        }
        // Higher margin => higher value at fixed WACC
        for j in 0..5 {
            for i in 0..4 {
                assert!(m.matrix[i][j] < m.matrix[i + 1][j]);
            }
        }
    }

    #[test]
    fn test_matrix_axes_and_midpoint() {
        let input = basic_input();
        let m = run_dcf_sensitivity(&DcfSensitivityInput {
            revenues: input.revenues.clone(),
            margin_range: input.margin_range,
            wacc_range: input.wacc_range,
            terminal_growth_range: input.terminal_growth_range,
        })
        .unwrap()
        .result;
        assert!((m.wacc_values[0] - 0.08).abs() < 1e-12);
        assert!((m.wacc_values[2] - 0.12).abs() < 1e-12);
        assert!((m.wacc_values[4] - 0.16).abs() < 1e-12);
        assert!((m.margin_values[4] - 0.30).abs() < 1e-12);
        assert!((m.terminal_growth - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_is_deterministic_and_independent_of_rng() {
        let input = basic_input();
        let a = simulate_dcf(&input).unwrap().result;
        let mut other = input.clone();
        other.seed = Some(7);
        let b = simulate_dcf(&other).unwrap().result;
        assert_eq!(a.sensitivity_matrix, b.sensitivity_matrix);
        assert_ne!(a.valuations, b.valuations);
    }

    #[test]
    fn test_valuations_within_grid_bounds() {
        let out = simulate_dcf(&basic_input()).unwrap().result;
        assert_eq!(out.valuations.len(), 5_000);
        // Lowest: min margin, max wacc, min growth. Highest: the opposite.
        let lo = dcf_value(&revenues(), 0.10, 0.16, 0.01).unwrap();
        let hi = dcf_value(&revenues(), 0.30, 0.08, 0.03).unwrap();
        assert!(out.valuations.iter().all(|&v| v >= lo - 1e-9 && v <= hi + 1e-9));
        let p = out.summary.percentiles;
        assert!(p.p5 <= p.p25 && p.p25 <= p.p50 && p.p50 <= p.p75 && p.p75 <= p.p95);
    }

    #[test]
    fn test_injected_source_hits_range_floor() {
        let mut input = basic_input();
        input.num_simulations = 100;
        let mut src = SequenceSource::new(vec![0.0]);
        let out = simulate_dcf_with(&input, &mut src).unwrap().result;
        let expected = dcf_value(&revenues(), 0.10, 0.08, 0.01).unwrap();
        assert!(out.valuations.iter().all(|&v| (v - expected).abs() < 1e-9));
    }

    #[test]
    fn test_overlapping_wacc_and_growth_rejected() {
        let mut input = basic_input();
        input.wacc_range = RateRange::new(0.02, 0.10);
        input.terminal_growth_range = RateRange::new(0.01, 0.03);
        assert!(matches!(
            simulate_dcf(&input),
            Err(EngineError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut input = basic_input();
        input.margin_range = RateRange::new(0.3, 0.1);
        assert!(simulate_dcf(&input).is_err());
    }

    #[test]
    fn test_empty_revenues_rejected() {
        let mut input = basic_input();
        input.revenues.clear();
        assert!(matches!(
            simulate_dcf(&input),
            Err(EngineError::InsufficientData(_))
        ));
    }
}
