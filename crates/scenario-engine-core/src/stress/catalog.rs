use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use super::engine::{AssumptionKey, AssumptionValue, ModelType, StressOutcomes, StressScenario};

// ---------------------------------------------------------------------------
// Catalog construction helpers
// ---------------------------------------------------------------------------

fn shocks(pairs: &[(AssumptionKey, Decimal)]) -> BTreeMap<AssumptionKey, AssumptionValue> {
    pairs
        .iter()
        .map(|(k, v)| (k.clone(), AssumptionValue::Number(*v)))
        .collect()
}

fn scenario(
    model_type: ModelType,
    id: &str,
    name: &str,
    probability: Decimal,
    shock_pairs: &[(AssumptionKey, Decimal)],
    outcomes: StressOutcomes,
) -> StressScenario {
    StressScenario {
        id: id.into(),
        name: name.into(),
        probability,
        model_type,
        shocks: shocks(shock_pairs),
        outcomes,
    }
}

// ---------------------------------------------------------------------------
// Per-domain catalogs
// ---------------------------------------------------------------------------

fn venture() -> Vec<StressScenario> {
    use AssumptionKey::*;
    let m = ModelType::Venture;
    vec![
        // 2001 / 2008-style venture funding drought
        scenario(
            m,
            "funding_winter",
            "Funding Winter",
            dec!(0.10),
            &[(RevenueGrowth, dec!(0.5)), (BurnRate, dec!(0.7))],
            StressOutcomes {
                total_loss: Some(dec!(0.40)),
                dilution: Some(dec!(0.50)),
                survival_probability: Some(dec!(0.60)),
                shutdown_probability: Some(dec!(0.25)),
                funding_freeze: Some(true),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "down_round",
            "Down Round",
            dec!(0.15),
            &[(ExitMultiple, dec!(0.6))],
            StressOutcomes {
                total_loss: Some(dec!(0.35)),
                dilution: Some(dec!(0.40)),
                survival_probability: Some(dec!(0.85)),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "competitor_disruption",
            "Competitor Disruption",
            dec!(0.08),
            &[(RevenueGrowth, dec!(0.4)), (ChurnRate, dec!(2.0))],
            StressOutcomes {
                total_loss: Some(dec!(0.55)),
                dilution: Some(dec!(0.30)),
                survival_probability: Some(dec!(0.55)),
                shutdown_probability: Some(dec!(0.30)),
                market_share_loss: Some(dec!(0.35)),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "founder_departure",
            "Founder Departure",
            dec!(0.05),
            &[(RevenueGrowth, dec!(0.7)), (ExitMultiple, dec!(0.8))],
            StressOutcomes {
                total_loss: Some(dec!(0.25)),
                dilution: Some(dec!(0.20)),
                survival_probability: Some(dec!(0.75)),
                shutdown_probability: Some(dec!(0.10)),
                ..Default::default()
            },
        ),
    ]
}

fn credit() -> Vec<StressScenario> {
    use AssumptionKey::*;
    let m = ModelType::Credit;
    vec![
        scenario(
            m,
            "default_wave",
            "Default Wave",
            dec!(0.07),
            &[(DefaultRate, dec!(3.0)), (RecoveryRate, dec!(0.6))],
            StressOutcomes {
                total_loss: Some(dec!(0.30)),
                dilution: Some(dec!(0.45)),
                ..Default::default()
            },
        ),
        // +300 bps on the discount rate
        scenario(
            m,
            "rate_shock",
            "Rate Shock",
            dec!(0.10),
            &[(Wacc, dec!(1.3)), (Dscr, dec!(0.75))],
            StressOutcomes {
                total_loss: Some(dec!(0.15)),
                dilution: Some(dec!(0.25)),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "liquidity_freeze",
            "Liquidity Freeze",
            dec!(0.05),
            &[(Dscr, dec!(0.6)), (RecoveryRate, dec!(0.8))],
            StressOutcomes {
                total_loss: Some(dec!(0.20)),
                dilution: Some(dec!(0.35)),
                funding_freeze: Some(true),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "sector_collapse",
            "Sector Collapse",
            dec!(0.03),
            &[(DefaultRate, dec!(5.0)), (RecoveryRate, dec!(0.4))],
            StressOutcomes {
                total_loss: Some(dec!(0.60)),
                dilution: Some(dec!(0.70)),
                shutdown_probability: Some(dec!(0.15)),
                ..Default::default()
            },
        ),
    ]
}

fn growth() -> Vec<StressScenario> {
    use AssumptionKey::*;
    let m = ModelType::Growth;
    vec![
        scenario(
            m,
            "multiple_compression",
            "Multiple Compression",
            dec!(0.15),
            &[(ExitMultiple, dec!(0.5))],
            StressOutcomes {
                total_loss: Some(dec!(0.45)),
                dilution: Some(dec!(0.35)),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "demand_shock",
            "Demand Shock",
            dec!(0.10),
            &[(RevenueGrowth, dec!(0.3)), (ChurnRate, dec!(1.5))],
            StressOutcomes {
                total_loss: Some(dec!(0.35)),
                dilution: Some(dec!(0.30)),
                survival_probability: Some(dec!(0.90)),
                market_share_loss: Some(dec!(0.10)),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "margin_squeeze",
            "Margin Squeeze",
            dec!(0.12),
            &[(BurnRate, dec!(1.4))],
            StressOutcomes {
                total_loss: Some(dec!(0.20)),
                dilution: Some(dec!(0.20)),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "ipo_window_shut",
            "IPO Window Shut",
            dec!(0.08),
            &[(ExitMultiple, dec!(0.7))],
            StressOutcomes {
                total_loss: Some(dec!(0.25)),
                dilution: Some(dec!(0.45)),
                funding_freeze: Some(true),
                ..Default::default()
            },
        ),
    ]
}

fn real_estate() -> Vec<StressScenario> {
    use AssumptionKey::*;
    let m = ModelType::RealEstate;
    vec![
        // +150 bps on a ~5% cap rate
        scenario(
            m,
            "cap_rate_expansion",
            "Cap Rate Expansion",
            dec!(0.12),
            &[(CapRate, dec!(1.3))],
            StressOutcomes {
                total_loss: Some(dec!(0.25)),
                dilution: Some(dec!(0.40)),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "occupancy_collapse",
            "Occupancy Collapse",
            dec!(0.06),
            &[(Occupancy, dec!(0.7)), (Dscr, dec!(0.65))],
            StressOutcomes {
                total_loss: Some(dec!(0.35)),
                dilution: Some(dec!(0.55)),
                market_share_loss: Some(dec!(0.20)),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "refinancing_wall",
            "Refinancing Wall",
            dec!(0.08),
            &[(Wacc, dec!(1.4)), (Dscr, dec!(0.8))],
            StressOutcomes {
                total_loss: Some(dec!(0.20)),
                dilution: Some(dec!(0.35)),
                funding_freeze: Some(true),
                ..Default::default()
            },
        ),
        scenario(
            m,
            "anchor_tenant_default",
            "Anchor Tenant Default",
            dec!(0.05),
            &[(Occupancy, dec!(0.8)), (DefaultRate, dec!(2.0))],
            StressOutcomes {
                total_loss: Some(dec!(0.30)),
                dilution: Some(dec!(0.30)),
                ..Default::default()
            },
        ),
    ]
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fixed catalog of low-probability tail scenarios for a model domain.
pub fn generate_stress_scenarios(model_type: ModelType) -> Vec<StressScenario> {
    match model_type {
        ModelType::Venture => venture(),
        ModelType::Credit => credit(),
        ModelType::Growth => growth(),
        ModelType::RealEstate => real_estate(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
