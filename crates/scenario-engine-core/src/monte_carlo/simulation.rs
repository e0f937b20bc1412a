use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::random::{seeded_rng, RandomSource};
use super::statistics::{percentiles_sorted, sort_ascending, summarize_sorted, SummaryStats};
use crate::error::EngineError;
use crate::scenarios::catalog::{validate_group, Scenario};
use crate::types::{with_metadata_f64, ComputationOutput, Percentiles};
use crate::EngineResult;

/// Additive noise on the sampled growth rate, `U(-REVENUE_NOISE, REVENUE_NOISE)`.
pub const REVENUE_NOISE: f64 = 0.10;

pub(crate) const MIN_SIMULATIONS: u32 = 100;

pub(crate) fn default_num_simulations() -> u32 {
    10_000
}

// ---------------------------------------------------------------------------
// Exit simulation types
// ---------------------------------------------------------------------------

/// Input for a Monte Carlo exit simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSimulationInput {
    /// Capital invested (must be positive)
    pub initial_investment: f64,
    /// Fully diluted ownership at exit, in [0, 1]
    pub ownership: f64,
    /// Mutually exclusive exit scenarios; each needs `exit_multiple` and `time_to_exit`
    pub scenarios: Vec<Scenario>,
    /// Number of simulation paths (minimum 100).
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// How often a scenario was drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFrequency {
    pub id: String,
    pub name: String,
    pub probability: f64,
    pub observed: f64,
}

/// Output of a Monte Carlo exit simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSimulationOutput {
    /// Mean proceeds to the investor
    pub expected_value: f64,
    pub std_dev: f64,
    /// Proceeds percentiles
    pub percentiles: Percentiles,
    /// IRR at the 5th, 25th, 50th, 75th and 95th percentiles
    pub irr: [f64; 5],
    /// Proceeds / investment at the same percentiles
    pub multiple: [f64; 5],
    /// Fraction of paths returning less than the initial investment
    pub probability_of_loss: f64,
    pub scenario_frequency: Vec<ScenarioFrequency>,
    /// Sorted proceeds, one per path
    pub outcomes: Vec<f64>,
    /// Sorted IRRs
    pub irrs: Vec<f64>,
    /// Sorted multiples
    pub multiples: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Revenue simulation types
// ---------------------------------------------------------------------------

/// Input for a Monte Carlo revenue trajectory simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSimulationInput {
    pub base_revenue: f64,
    /// Number of projected years (trajectory length)
    pub years: u32,
    /// Growth scenarios; each needs `growth_rate`
    pub growth_scenarios: Vec<Scenario>,
    /// Market scenarios; `market_multiplier` defaults to 1.0
    pub market_scenarios: Vec<Scenario>,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Fan-chart band for one projected year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearBand {
    pub year: u32,
    pub mean: f64,
    pub percentiles: Percentiles,
}

/// Output of a revenue simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSimulationOutput {
    /// `trajectories[i][y]` = revenue of path `i` at year `y + 1`
    pub trajectories: Vec<Vec<f64>>,
    pub fan_chart: Vec<YearBand>,
    pub final_year: SummaryStats,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Cumulative-probability roulette selection.
///
/// Returns the first scenario whose cumulative probability reaches `r`.
/// Zero-probability scenarios are never selected. Rounding shortfalls
/// (cumulative sum just below 1.0) fall back to the last scenario with
/// positive probability.
pub fn select_scenario(scenarios: &[Scenario], r: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, s) in scenarios.iter().enumerate() {
        if s.probability <= 0.0 {
            continue;
        }
        cumulative += s.probability;
        if cumulative >= r {
            return i;
        }
    }
    scenarios
        .iter()
        .rposition(|s| s.probability > 0.0)
        .unwrap_or_else(|| scenarios.len().saturating_sub(1))
}

fn validate_simulations(num_simulations: u32) -> EngineResult<()> {
    if num_simulations < MIN_SIMULATIONS {
        return Err(EngineError::invalid_input(
            "num_simulations",
            format!("Must be at least {MIN_SIMULATIONS}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API: exits
// ---------------------------------------------------------------------------

fn validate_exit_input(input: &ExitSimulationInput) -> EngineResult<()> {
    validate_simulations(input.num_simulations)?;
    if !input.initial_investment.is_finite() || input.initial_investment <= 0.0 {
        return Err(EngineError::invalid_input(
            "initial_investment",
            "Initial investment must be positive",
        ));
    }
    if !input.ownership.is_finite() || !(0.0..=1.0).contains(&input.ownership) {
        return Err(EngineError::invalid_range(
            "ownership",
            "Ownership must be between 0 and 1",
        ));
    }
    validate_group(&input.scenarios)?;
    for s in &input.scenarios {
        match s.assumptions.exit_multiple {
            Some(m) if m.is_finite() && m >= 0.0 => {}
            _ => {
                return Err(EngineError::invalid_range(
                    format!("scenario:{} exit_multiple", s.id),
                    "Exit multiple must be present and non-negative",
                ))
            }
        }
        match s.assumptions.time_to_exit {
            Some(t) if t.is_finite() && t > 0.0 => {}
            _ => {
                return Err(EngineError::invalid_range(
                    format!("scenario:{} time_to_exit", s.id),
                    "Time to exit must be present and positive",
                ))
            }
        }
    }
    Ok(())
}

/// Run a Monte Carlo exit simulation with an RNG built from `input.seed`.
pub fn simulate_exits(
    input: &ExitSimulationInput,
) -> EngineResult<ComputationOutput<ExitSimulationOutput>> {
    let mut rng = seeded_rng(input.seed);
    simulate_exits_with(input, &mut rng)
}

/// Run a Monte Carlo exit simulation drawing from the given random source.
///
/// Each path picks one exit scenario by roulette and computes
/// `proceeds = investment × multiple × ownership` and
/// `irr = (proceeds / investment)^(1 / time_to_exit) − 1`.
pub fn simulate_exits_with<R: RandomSource + ?Sized>(
    input: &ExitSimulationInput,
    rng: &mut R,
) -> EngineResult<ComputationOutput<ExitSimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_exit_input(input)?;

    let n = input.num_simulations as usize;
    let investment = input.initial_investment;
    tracing::debug!(
        num_simulations = n,
        scenarios = input.scenarios.len(),
        seeded = input.seed.is_some(),
        "simulating exits"
    );

    let mut outcomes = Vec::with_capacity(n);
    let mut irrs = Vec::with_capacity(n);
    let mut multiples = Vec::with_capacity(n);
    let mut counts = vec![0u32; input.scenarios.len()];

    for _ in 0..n {
        let idx = select_scenario(&input.scenarios, rng.next_uniform());
        counts[idx] += 1;
        let a = &input.scenarios[idx].assumptions;
        // Presence checked in validation.
        let multiple = a.exit_multiple.unwrap_or(0.0);
        let years = a.time_to_exit.unwrap_or(1.0);

        let exit_value = investment * multiple;
        let proceeds = exit_value * input.ownership;
        let realised = proceeds / investment.abs();
        let irr = realised.powf(1.0 / years) - 1.0;

        outcomes.push(proceeds);
        irrs.push(irr);
        multiples.push(realised);
    }

    sort_ascending(&mut outcomes);
    sort_ascending(&mut irrs);
    sort_ascending(&mut multiples);

    let stats = summarize_sorted(&outcomes);
    let losses = outcomes.iter().filter(|&&p| p < investment).count();
    let probability_of_loss = losses as f64 / n as f64;

    if input.ownership == 0.0 {
        warnings.push("Ownership is zero; every path returns nothing".into());
    }

    let scenario_frequency = input
        .scenarios
        .iter()
        .zip(&counts)
        .map(|(s, &c)| ScenarioFrequency {
            id: s.id.clone(),
            name: s.name.clone(),
            probability: s.probability,
            observed: c as f64 / n as f64,
        })
        .collect();

    let output = ExitSimulationOutput {
        expected_value: stats.mean,
        std_dev: stats.std_dev,
        percentiles: stats.percentiles,
        irr: percentiles_sorted(&irrs).as_array(),
        multiple: percentiles_sorted(&multiples).as_array(),
        probability_of_loss,
        scenario_frequency,
        outcomes,
        irrs,
        multiples,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo Exit Simulation",
        &serde_json::json!({
            "initial_investment": input.initial_investment,
            "ownership": input.ownership,
            "num_scenarios": input.scenarios.len(),
            "num_simulations": input.num_simulations,
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Public API: revenue trajectories
// ---------------------------------------------------------------------------

fn validate_revenue_input(input: &RevenueSimulationInput) -> EngineResult<()> {
    validate_simulations(input.num_simulations)?;
    if !input.base_revenue.is_finite() || input.base_revenue < 0.0 {
        return Err(EngineError::invalid_input(
            "base_revenue",
            "Base revenue must be non-negative",
        ));
    }
    if input.years < 1 {
        return Err(EngineError::invalid_input("years", "Must be at least 1"));
    }
    validate_group(&input.growth_scenarios)?;
    validate_group(&input.market_scenarios)?;
    for s in &input.growth_scenarios {
        if !s.assumptions.growth_rate.is_some_and(f64::is_finite) {
            return Err(EngineError::invalid_range(
                format!("scenario:{} growth_rate", s.id),
                "Growth scenarios must carry a finite growth rate",
            ));
        }
    }
    for s in &input.market_scenarios {
        let m = s.assumptions.market_multiplier_or_default();
        if !m.is_finite() || m < 0.0 {
            return Err(EngineError::invalid_range(
                format!("scenario:{} market_multiplier", s.id),
                "Market multiplier must be non-negative",
            ));
        }
    }
    Ok(())
}

/// Simulate revenue trajectories with an RNG built from `input.seed`.
pub fn simulate_revenue(
    input: &RevenueSimulationInput,
) -> EngineResult<ComputationOutput<RevenueSimulationOutput>> {
    let mut rng = seeded_rng(input.seed);
    simulate_revenue_with(input, &mut rng)
}

/// Simulate revenue trajectories for fan-chart consumption.
///
/// Each path draws one growth and one market scenario independently, then
/// compounds `g = growth_rate × market_multiplier + U(-0.1, 0.1)` year by
/// year. Revenue is floored at zero.
pub fn simulate_revenue_with<R: RandomSource + ?Sized>(
    input: &RevenueSimulationInput,
    rng: &mut R,
) -> EngineResult<ComputationOutput<RevenueSimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_revenue_input(input)?;

    let n = input.num_simulations as usize;
    let years = input.years as usize;
    tracing::debug!(num_simulations = n, years, "simulating revenue");

    let mut trajectories: Vec<Vec<f64>> = Vec::with_capacity(n);
    let mut floored = 0u32;

    for _ in 0..n {
        let growth_idx = select_scenario(&input.growth_scenarios, rng.next_uniform());
        let market_idx = select_scenario(&input.market_scenarios, rng.next_uniform());
        let growth = &input.growth_scenarios[growth_idx];
        let market = &input.market_scenarios[market_idx];
        let base_growth = growth.assumptions.growth_rate.unwrap_or(0.0)
            * market.assumptions.market_multiplier_or_default();

        let mut path = Vec::with_capacity(years);
        let mut revenue = input.base_revenue;
        for _ in 0..years {
            let noise = -REVENUE_NOISE + 2.0 * REVENUE_NOISE * rng.next_uniform();
            revenue *= 1.0 + base_growth + noise;
            if revenue < 0.0 {
                revenue = 0.0;
                floored += 1;
            }
            path.push(revenue);
        }
        trajectories.push(path);
    }

    if floored > 0 {
        warnings.push(format!(
            "{floored} path-years fell below zero revenue and were floored at 0"
        ));
    }

    let mut column = vec![0.0; n];
    let mut fan_chart = Vec::with_capacity(years);
    let mut final_year = None;
    for y in 0..years {
        for (slot, path) in column.iter_mut().zip(&trajectories) {
            *slot = path[y];
        }
        sort_ascending(&mut column);
        let stats = summarize_sorted(&column);
        fan_chart.push(YearBand {
            year: y as u32 + 1,
            mean: stats.mean,
            percentiles: stats.percentiles,
        });
        final_year = Some(stats);
    }
    let final_year = final_year.ok_or_else(|| {
        EngineError::InsufficientData("Revenue simulation produced no years".into())
    })?;

    let output = RevenueSimulationOutput {
        trajectories,
        fan_chart,
        final_year,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo Revenue Trajectories",
        &serde_json::json!({
            "base_revenue": input.base_revenue,
            "years": input.years,
            "growth_scenarios": input.growth_scenarios.len(),
            "market_scenarios": input.market_scenarios.len(),
            "noise": REVENUE_NOISE,
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
    use crate::scenarios::catalog::ScenarioCatalog;

    const SEED: u64 = 42;

    fn two_outcome_input() -> ExitSimulationInput {
        ExitSimulationInput {
            initial_investment: 1_000_000.0,
            ownership: 0.10,
            scenarios: vec![
                Scenario::exit("win", "Win", 0.2, 10.0, 5.0),
                Scenario::exit("loss", "Loss", 0.8, 0.0, 3.0),
            ],
            num_simulations: 10_000,
            seed: Some(SEED),
        }
    }

    #[test]
    fn test_roulette_selection() {
        let scenarios = two_outcome_input().scenarios;
        assert_eq!(select_scenario(&scenarios, 0.0), 0);
        assert_eq!(select_scenario(&scenarios, 0.2), 0);
        assert_eq!(select_scenario(&scenarios, 0.21), 1);
        assert_eq!(select_scenario(&scenarios, 0.999_999), 1);
    }

    #[test]
    fn test_roulette_falls_back_to_last_on_shortfall() {
        let scenarios = vec![
            Scenario::exit("a", "A", 0.333, 1.0, 1.0),
            Scenario::exit("b", "B", 0.333, 1.0, 1.0),
            Scenario::exit("c", "C", 0.333, 1.0, 1.0),
        ];
        assert_eq!(select_scenario(&scenarios, 0.9995), 2);
    }

    #[test]
    fn test_roulette_skips_zero_probability() {
        let scenarios = vec![
            Scenario::exit("never", "Never", 0.0, 100.0, 1.0),
            Scenario::exit("always", "Always", 1.0, 1.0, 1.0),
        ];
        assert_eq!(select_scenario(&scenarios, 0.0), 1);
        assert_eq!(select_scenario(&scenarios, 0.5), 1);

        let trailing = vec![
            Scenario::exit("a", "A", 0.5, 1.0, 1.0),
            Scenario::exit("b", "B", 0.499, 1.0, 1.0),
            Scenario::exit("c", "C", 0.0, 1.0, 1.0),
        ];
        assert_eq!(select_scenario(&trailing, 0.9995), 1);
    }

    #[test]
    fn test_zero_probability_scenario_never_observed() {
        let input = ExitSimulationInput {
            initial_investment: 1_000_000.0,
            ownership: 0.10,
            scenarios: vec![
                Scenario::exit("never", "Never", 0.0, 100.0, 1.0),
                Scenario::exit("always", "Always", 1.0, 1.0, 1.0),
            ],
            num_simulations: 100,
            seed: None,
        };
        let mut src = SequenceSource::new(vec![0.0]);
        let out = simulate_exits_with(&input, &mut src).unwrap().result;
        assert_eq!(out.scenario_frequency[0].observed, 0.0);
        assert!((out.expected_value - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_two_outcome_expected_value() {
        let out = simulate_exits(&two_outcome_input()).unwrap().result;
        assert!(
            (out.expected_value - 200_000.0).abs() < 20_000.0,
            "expected_value={}",
            out.expected_value
        );
        assert!(
            (out.probability_of_loss - 0.8).abs() < 0.02,
            "probability_of_loss={}",
            out.probability_of_loss
        );
        assert_eq!(out.outcomes.len(), 10_000);
    }

    #[test]
    fn test_injected_sequence_is_exact() {
        // 0.1 -> win, 0.5 -> loss: alternate paths
        let mut input = two_outcome_input();
        input.num_simulations = 100;
        let mut src = SequenceSource::new(vec![0.1, 0.5]);
        let out = simulate_exits_with(&input, &mut src).unwrap().result;
        assert_eq!(out.probability_of_loss, 0.5);
        assert!((out.expected_value - 500_000.0).abs() < 1e-6);
        assert_eq!(out.scenario_frequency[0].observed, 0.5);
    }

    #[test]
    fn test_single_scenario_has_zero_variance() {
        let input = ExitSimulationInput {
            initial_investment: 2_000_000.0,
            ownership: 0.25,
            scenarios: vec![Scenario::exit("only", "Only", 1.0, 3.0, 4.0)],
            num_simulations: 5_000,
            seed: Some(SEED),
        };
        let out = simulate_exits(&input).unwrap().result;
        let expected = 2_000_000.0 * 3.0 * 0.25;
        assert!((out.expected_value - expected).abs() < 1e-6);
        assert!(out.outcomes.iter().all(|&v| v == out.outcomes[0]));
        assert!(out.std_dev < 1e-6);
        // 1.5M < 2M invested: every path is a loss
        assert_eq!(out.probability_of_loss, 1.0);
    }

    #[test]
    fn test_irr_matches_closed_form() {
        let input = ExitSimulationInput {
            initial_investment: 100.0,
            ownership: 1.0,
            scenarios: vec![Scenario::exit("double", "Double", 1.0, 2.0, 5.0)],
            num_simulations: 100,
            seed: Some(SEED),
        };
        let out = simulate_exits(&input).unwrap().result;
        let expected_irr = 2.0_f64.powf(0.2) - 1.0;
        for irr in out.irr {
            assert!((irr - expected_irr).abs() < 1e-12);
        }
        assert_eq!(out.multiple, [2.0; 5]);
        assert_eq!(out.probability_of_loss, 0.0);
    }

    #[test]
    fn test_total_loss_irr_is_minus_one() {
        let input = ExitSimulationInput {
            initial_investment: 100.0,
            ownership: 0.5,
            scenarios: vec![Scenario::exit("zero", "Zero", 1.0, 0.0, 3.0)],
            num_simulations: 100,
            seed: None,
        };
        let out = simulate_exits(&input).unwrap().result;
        assert_eq!(out.irr, [-1.0; 5]);
        assert_eq!(out.probability_of_loss, 1.0);
    }

    #[test]
    fn test_percentile_ordering_and_sorted_outputs() {
        let input = ExitSimulationInput {
            initial_investment: 500_000.0,
            ownership: 0.15,
            scenarios: ScenarioCatalog::global().group("exit").to_vec(),
            num_simulations: 10_000,
            seed: Some(SEED),
        };
        let out = simulate_exits(&input).unwrap().result;
        let p = out.percentiles;
        assert!(p.p5 <= p.p25 && p.p25 <= p.p50 && p.p50 <= p.p75 && p.p75 <= p.p95);
        assert!(out.outcomes.windows(2).all(|w| w[0] <= w[1]));
        assert!(out.irr.windows(2).all(|w| w[0] <= w[1]));
        assert!(out.multiple.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_seeded_reproducibility() {
        let a = simulate_exits(&two_outcome_input()).unwrap().result;
        let b = simulate_exits(&two_outcome_input()).unwrap().result;
        assert_eq!(a.expected_value, b.expected_value);
        assert_eq!(a.outcomes, b.outcomes);
    }

    #[test]
    fn test_exit_validation() {
        let mut bad = two_outcome_input();
        bad.initial_investment = 0.0;
        assert!(simulate_exits(&bad).is_err());

        let mut bad = two_outcome_input();
        bad.ownership = 1.5;
        assert!(matches!(
            simulate_exits(&bad),
            Err(EngineError::InvalidRange { .. })
        ));

        let mut bad = two_outcome_input();
        bad.scenarios[0].assumptions.time_to_exit = Some(0.0);
        assert!(matches!(
            simulate_exits(&bad),
            Err(EngineError::InvalidRange { .. })
        ));

        let mut bad = two_outcome_input();
        bad.scenarios[1].probability = 0.5;
        assert!(simulate_exits(&bad).is_err());

        let mut bad = two_outcome_input();
        bad.scenarios.clear();
        assert!(matches!(
            simulate_exits(&bad),
            Err(EngineError::InsufficientData(_))
        ));

        let mut bad = two_outcome_input();
        bad.num_simulations = 50;
        assert!(simulate_exits(&bad).is_err());
    }

    // --- Revenue ---

    fn revenue_input() -> RevenueSimulationInput {
        let catalog = ScenarioCatalog::global();
        RevenueSimulationInput {
            base_revenue: 10_000_000.0,
            years: 5,
            growth_scenarios: catalog.group("growth").to_vec(),
            market_scenarios: catalog.group("market").to_vec(),
            num_simulations: 2_000,
            seed: Some(SEED),
        }
    }

    #[test]
    fn test_revenue_matrix_shape() {
        let out = simulate_revenue(&revenue_input()).unwrap().result;
        assert_eq!(out.trajectories.len(), 2_000);
        assert!(out.trajectories.iter().all(|t| t.len() == 5));
        assert_eq!(out.fan_chart.len(), 5);
        assert_eq!(out.fan_chart[4].year, 5);
        assert_eq!(out.final_year.mean, out.fan_chart[4].mean);
    }

    #[test]
    fn test_revenue_fan_bands_ordered() {
        let out = simulate_revenue(&revenue_input()).unwrap().result;
        for band in &out.fan_chart {
            let p = band.percentiles;
            assert!(p.p5 <= p.p25 && p.p25 <= p.p50 && p.p50 <= p.p75 && p.p75 <= p.p95);
        }
        assert!(out.trajectories.iter().flatten().all(|&r| r >= 0.0));
    }

    #[test]
    fn test_revenue_deterministic_path() {
        // Every draw is 0.5: first scenario whose cumulative >= 0.5, zero noise.
        let input = RevenueSimulationInput {
            base_revenue: 100.0,
            years: 3,
            growth_scenarios: vec![Scenario::growth("g", "G", 1.0, 0.10)],
            market_scenarios: vec![Scenario::market("m", "M", 1.0, 2.0)],
            num_simulations: 100,
            seed: None,
        };
        let mut src = SequenceSource::new(vec![0.5]);
        let out = simulate_revenue_with(&input, &mut src).unwrap().result;
        let path = &out.trajectories[0];
        assert!((path[0] - 120.0).abs() < 1e-9);
        assert!((path[1] - 144.0).abs() < 1e-9);
        assert!((path[2] - 172.8).abs() < 1e-9);
    }

    #[test]
    fn test_revenue_noise_bounds() {
        // Draws per path: growth scenario, market scenario, one noise draw per year
        let input = RevenueSimulationInput {
            base_revenue: 100.0,
            years: 1,
            growth_scenarios: vec![Scenario::growth("g", "G", 1.0, 0.10)],
            market_scenarios: vec![Scenario::market("m", "M", 1.0, 2.0)],
            num_simulations: 100,
            seed: None,
        };

        // Lowest noise: g = 0.10 × 2.0 - 0.10
        let mut low = SequenceSource::new(vec![0.5, 0.5, 0.0]);
        let out = simulate_revenue_with(&input, &mut low).unwrap().result;
        assert!(out.trajectories.iter().all(|t| (t[0] - 110.0).abs() < 1e-9));

        // Highest noise: g -> 0.10 × 2.0 + 0.10
        let mut high = SequenceSource::new(vec![0.5, 0.5, 1.0]);
        let out = simulate_revenue_with(&input, &mut high).unwrap().result;
        assert!(out.trajectories.iter().all(|t| (t[0] - 130.0).abs() < 1e-9));
    }

    #[test]
    fn test_revenue_validation() {
        let mut bad = revenue_input();
        bad.years = 0;
        assert!(simulate_revenue(&bad).is_err());

        let mut bad = revenue_input();
        bad.growth_scenarios = ScenarioCatalog::global().group("market").to_vec();
        assert!(matches!(
            simulate_revenue(&bad),
            Err(EngineError::InvalidRange { .. })
        ));

        let mut bad = revenue_input();
        bad.market_scenarios = ScenarioCatalog::global().group("unknown").to_vec();
        assert!(matches!(
            simulate_revenue(&bad),
            Err(EngineError::InsufficientData(_))
        ));
    }
}
