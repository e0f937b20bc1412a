use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::EngineError;
use crate::types::*;
use crate::EngineResult;

/// Allowed gap between proceeds and the sum of allocations.
const CONSERVATION_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Exit proceeds and the claim stack they are distributed across.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallInput {
    /// Total exit proceeds available for distribution
    pub total_proceeds: Money,
    /// Claim stack; order within a priority rank is preserved
    pub tiers: Vec<WaterfallTier>,
}

/// A single claim in the stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallTier {
    /// Human-readable tier name (e.g. "Series B Preferred")
    pub name: String,
    /// 1 = most senior; equal ranks are paid pari passu
    pub priority: u32,
    /// Liquidation preference; zero for pure common
    #[serde(default)]
    pub claim: Money,
    /// Shares in the residual after all preferences are paid
    #[serde(default)]
    pub participating: bool,
    /// Fully diluted ownership used to split the residual
    #[serde(default)]
    pub ownership: Rate,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Allocation to a single tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierAllocation {
    pub tier: String,
    pub priority: u32,
    /// Paid against the tier's claim
    pub preference_paid: Money,
    /// Share of the residual
    pub participation_paid: Money,
    /// preference_paid + participation_paid
    pub allocated: Money,
    /// Proceeds still unpaid after this tier's preference
    pub remaining: Money,
}

/// Full waterfall distribution result, tiers in payout order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallOutput {
    pub tiers: Vec<TierAllocation>,
    pub total_proceeds: Money,
    pub total_preference: Money,
    pub total_participation: Money,
    pub total_allocated: Money,
    /// total_proceeds − total_allocated; zero up to the conservation tolerance
    pub unallocated: Money,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate(input: &WaterfallInput) -> EngineResult<()> {
    if input.total_proceeds < Decimal::ZERO {
        return Err(EngineError::invalid_input(
            "total_proceeds",
            "Total proceeds cannot be negative",
        ));
    }
    if input.tiers.is_empty() {
        return Err(EngineError::InsufficientData(
            "At least one waterfall tier is required".into(),
        ));
    }
    for tier in &input.tiers {
        if tier.claim < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                format!("tier:{} claim", tier.name),
                "Claim cannot be negative",
            ));
        }
        if tier.ownership < Decimal::ZERO || tier.ownership > Decimal::ONE {
            return Err(EngineError::invalid_range(
                format!("tier:{} ownership", tier.name),
                "Ownership must be between 0 and 1",
            ));
        }
    }
    Ok(())
}

/// Sum of amounts, rejecting totals beyond the Decimal range.
fn checked_total(
    values: impl IntoIterator<Item = Decimal>,
    context: &str,
) -> EngineResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| EngineError::FinancialImpossibility(format!("{context} overflows")))
}

/// Split `amount` across `weights` pro rata. The last non-zero weight absorbs
/// the rounding remainder so the shares sum to `amount` exactly.
fn pro_rata(amount: Money, weights: &[Decimal]) -> EngineResult<Vec<Money>> {
    let total = checked_total(weights.iter().copied(), "pro rata weight total")?;
    let mut shares = vec![Decimal::ZERO; weights.len()];
    let Some(last) = weights.iter().rposition(|w| !w.is_zero()) else {
        return Ok(shares);
    };
    let mut paid = Decimal::ZERO;
    for (i, w) in weights.iter().enumerate().take(last) {
        // amount × weight can leave the Decimal range; fall back to fraction first
        shares[i] = amount
            .checked_mul(*w)
            .map(|product| product / total)
            .or_else(|| (*w / total).checked_mul(amount))
            .ok_or_else(|| {
                EngineError::FinancialImpossibility(format!("pro rata share of {amount} overflows"))
            })?;
        paid += shares[i];
    }
    shares[last] = amount - paid;
    Ok(shares)
}

/// Group tier indices (already sorted by priority) into pari passu ranks.
fn priority_ranks(order: &[usize], tiers: &[WaterfallTier]) -> Vec<Vec<usize>> {
    let mut ranks: Vec<Vec<usize>> = Vec::new();
    for &i in order {
        match ranks.last_mut() {
            Some(rank) if tiers[rank[0]].priority == tiers[i].priority => rank.push(i),
            _ => ranks.push(vec![i]),
        }
    }
    ranks
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Distribute exit proceeds across a liquidation-preference stack.
///
/// Ranks are paid in ascending `priority`; each tier receives
/// `min(remaining, claim)`, and a rank that cannot be covered in full is paid
/// pro rata to claim. Whatever is left once every preference is satisfied is
/// split by ownership among participating tiers. Exhausting proceeds
/// mid-stack is not an error: junior tiers simply receive zero.
pub fn distribute_waterfall(
    input: &WaterfallInput,
) -> EngineResult<ComputationOutput<WaterfallOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(input)?;

    // Stable sort keeps input order inside a rank
    let mut order: Vec<usize> = (0..input.tiers.len()).collect();
    order.sort_by_key(|&i| input.tiers[i].priority);

    let mut preference = vec![Decimal::ZERO; input.tiers.len()];
    let mut remaining_after = vec![Decimal::ZERO; input.tiers.len()];
    let mut remaining = input.total_proceeds;

    // --- Preferences, rank by rank ---
    for rank in priority_ranks(&order, &input.tiers) {
        let rank_claim =
            checked_total(rank.iter().map(|&i| input.tiers[i].claim), "rank claim")?;

        if remaining >= rank_claim {
            for &i in &rank {
                preference[i] = input.tiers[i].claim;
                remaining -= input.tiers[i].claim;
                remaining_after[i] = remaining;
            }
            continue;
        }

        if !remaining.is_zero() {
            warnings.push(format!(
                "Proceeds exhausted at priority {}: claims of {} covered {}",
                input.tiers[rank[0]].priority, rank_claim, remaining
            ));
        }
        let weights: Vec<Decimal> = rank.iter().map(|&i| input.tiers[i].claim).collect();
        for (&i, share) in rank.iter().zip(pro_rata(remaining, &weights)?) {
            preference[i] = share;
        }
        remaining = Decimal::ZERO;
        for &i in &rank {
            remaining_after[i] = Decimal::ZERO;
        }
    }

    // --- Residual to participating tiers ---
    let mut participation = vec![Decimal::ZERO; input.tiers.len()];
    if remaining > Decimal::ZERO {
        let participants: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&i| input.tiers[i].participating)
            .collect();
        let weights: Vec<Decimal> = participants
            .iter()
            .map(|&i| input.tiers[i].ownership)
            .collect();
        let total_ownership = checked_total(weights.iter().copied(), "ownership")?;

        if total_ownership.is_zero() {
            return Err(EngineError::ConservationViolation {
                proceeds: input.total_proceeds,
                allocated: input.total_proceeds - remaining,
            });
        }
        if total_ownership != Decimal::ONE {
            warnings.push(format!(
                "Participating ownership sums to {total_ownership}; residual split pro rata"
            ));
        }
        for (&i, share) in participants.iter().zip(pro_rata(remaining, &weights)?) {
            participation[i] = share;
        }
    }

    // --- Assemble in payout order ---
    let tiers: Vec<TierAllocation> = order
        .iter()
        .map(|&i| {
            let t = &input.tiers[i];
            TierAllocation {
                tier: t.name.clone(),
                priority: t.priority,
                preference_paid: preference[i],
                participation_paid: participation[i],
                allocated: preference[i] + participation[i],
                remaining: remaining_after[i],
            }
        })
        .collect();

    let total_preference: Money = preference.iter().copied().sum();
    let total_participation: Money = participation.iter().copied().sum();
    let total_allocated = total_preference + total_participation;
    let unallocated = input.total_proceeds - total_allocated;

    if unallocated.abs() > CONSERVATION_TOLERANCE {
        return Err(EngineError::ConservationViolation {
            proceeds: input.total_proceeds,
            allocated: total_allocated,
        });
    }

    tracing::debug!(
        tiers = tiers.len(),
        %total_allocated,
        "waterfall distributed"
    );

    let output = WaterfallOutput {
        tiers,
        total_proceeds: input.total_proceeds,
        total_preference,
        total_participation,
        total_allocated,
        unallocated,
    };

    let total_claims = checked_total(input.tiers.iter().map(|t| t.claim), "total claims")?;
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Liquidation Preference Waterfall",
        &serde_json::json!({
            "total_proceeds": input.total_proceeds.to_string(),
            "num_tiers": input.tiers.len(),
            "total_claims": total_claims.to_string(),
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
    use pretty_assertions::assert_eq;

    fn pref(name: &str, priority: u32, claim: Money) -> WaterfallTier {
        WaterfallTier {
            name: name.into(),
            priority,
            claim,
            participating: false,
            ownership: Decimal::ZERO,
        }
    }

    fn common(name: &str, priority: u32, ownership: Rate) -> WaterfallTier {
        WaterfallTier {
            name: name.into(),
            priority,
            claim: Decimal::ZERO,
            participating: true,
            ownership,
        }
    }

    fn allocated(out: &WaterfallOutput, name: &str) -> Money {
        out.tiers
            .iter()
            .find(|t| t.tier == name)
            .map(|t| t.allocated)
            .unwrap_or_default()
    }

    #[test]
    fn test_single_preference_then_common() {
        // $50M exit: Series A takes its $20M preference, common gets the rest
        let input = WaterfallInput {
            total_proceeds: dec!(50_000_000),
            tiers: vec![
                pref("Series A", 1, dec!(20_000_000)),
                common("Common", 2, dec!(1.0)),
            ],
        };
        let out = distribute_waterfall(&input).unwrap().result;
        assert_eq!(allocated(&out, "Series A"), dec!(20_000_000));
        assert_eq!(allocated(&out, "Common"), dec!(30_000_000));
        assert_eq!(out.unallocated, Decimal::ZERO);
        assert_eq!(out.tiers[0].remaining, dec!(30_000_000));
    }

    #[test]
    fn test_priority_order_not_input_order() {
        let input = WaterfallInput {
            total_proceeds: dec!(25),
            tiers: vec![
                pref("Series A", 2, dec!(20)),
                pref("Series B", 1, dec!(20)),
                common("Common", 3, dec!(1)),
            ],
        };
        let out = distribute_waterfall(&input).unwrap().result;
        assert_eq!(out.tiers[0].tier, "Series B");
        assert_eq!(allocated(&out, "Series B"), dec!(20));
        assert_eq!(allocated(&out, "Series A"), dec!(5));
        assert_eq!(allocated(&out, "Common"), Decimal::ZERO);
    }

    #[test]
    fn test_exhausted_mid_stack_is_not_an_error() {
        let input = WaterfallInput {
            total_proceeds: dec!(10),
            tiers: vec![
                pref("Series C", 1, dec!(30)),
                pref("Series B", 2, dec!(20)),
                common("Common", 3, dec!(1)),
            ],
        };
        let result = distribute_waterfall(&input).unwrap();
        let out = &result.result;
        assert_eq!(allocated(out, "Series C"), dec!(10));
        assert_eq!(allocated(out, "Series B"), Decimal::ZERO);
        assert_eq!(allocated(out, "Common"), Decimal::ZERO);
        assert_eq!(out.total_allocated, dec!(10));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_pari_passu_rank_paid_pro_rata() {
        let input = WaterfallInput {
            total_proceeds: dec!(30),
            tiers: vec![
                pref("Series B", 1, dec!(40)),
                pref("Series A", 1, dec!(20)),
                common("Common", 2, dec!(1)),
            ],
        };
        let out = distribute_waterfall(&input).unwrap().result;
        assert_eq!(allocated(&out, "Series B"), dec!(20));
        assert_eq!(allocated(&out, "Series A"), dec!(10));
    }

    #[test]
    fn test_participating_preferred_shares_residual() {
        let input = WaterfallInput {
            total_proceeds: dec!(100),
            tiers: vec![
                WaterfallTier {
                    participating: true,
                    ownership: dec!(0.25),
                    ..pref("Series A", 1, dec!(20))
                },
                common("Founders", 2, dec!(0.75)),
            ],
        };
        let out = distribute_waterfall(&input).unwrap().result;
        let a = &out.tiers[0];
        assert_eq!(a.preference_paid, dec!(20));
        assert_eq!(a.participation_paid, dec!(20));
        assert_eq!(a.allocated, dec!(40));
        assert_eq!(allocated(&out, "Founders"), dec!(60));
    }

    #[test]
    fn test_rounding_dust_goes_to_last_participant() {
        let input = WaterfallInput {
            total_proceeds: dec!(100),
            tiers: vec![
                common("A", 1, dec!(0.3333)),
                common("B", 1, dec!(0.3333)),
                common("C", 1, dec!(0.3334)),
            ],
        };
        let out = distribute_waterfall(&input).unwrap().result;
        assert_eq!(out.total_allocated, dec!(100));
        assert_eq!(out.unallocated, Decimal::ZERO);
    }

    #[test]
    fn test_zero_proceeds() {
        let input = WaterfallInput {
            total_proceeds: Decimal::ZERO,
            tiers: vec![pref("Series A", 1, dec!(10)), common("Common", 2, dec!(1))],
        };
        let out = distribute_waterfall(&input).unwrap().result;
        assert!(out.tiers.iter().all(|t| t.allocated.is_zero()));
    }

    #[test]
    fn test_leftover_without_participants_is_violation() {
        let input = WaterfallInput {
            total_proceeds: dec!(100),
            tiers: vec![pref("Series A", 1, dec!(20))],
        };
        let err = distribute_waterfall(&input).unwrap_err();
        assert_eq!(
            err,
            EngineError::ConservationViolation {
                proceeds: dec!(100),
                allocated: dec!(20),
            }
        );
    }

    #[test]
    fn test_validation() {
        let bad_proceeds = WaterfallInput {
            total_proceeds: dec!(-1),
            tiers: vec![common("Common", 1, dec!(1))],
        };
        assert!(distribute_waterfall(&bad_proceeds).is_err());

        let no_tiers = WaterfallInput {
            total_proceeds: dec!(1),
            tiers: vec![],
        };
        assert!(matches!(
            distribute_waterfall(&no_tiers),
            Err(EngineError::InsufficientData(_))
        ));

        let bad_ownership = WaterfallInput {
            total_proceeds: dec!(1),
            tiers: vec![common("Common", 1, dec!(1.5))],
        };
        assert!(matches!(
            distribute_waterfall(&bad_ownership),
            Err(EngineError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_short_rank_with_large_claims() {
        // $100T against two $1Q claims: claim × proceeds exceeds Decimal range
        let input = WaterfallInput {
            total_proceeds: dec!(100_000_000_000_000),
            tiers: vec![
                pref("Senior A", 1, dec!(1_000_000_000_000_000)),
                pref("Senior B", 1, dec!(1_000_000_000_000_000)),
            ],
        };
        let out = distribute_waterfall(&input).unwrap().result;
        assert_eq!(allocated(&out, "Senior A"), dec!(50_000_000_000_000));
        assert_eq!(allocated(&out, "Senior B"), dec!(50_000_000_000_000));
        assert_eq!(out.unallocated, Decimal::ZERO);
    }

    #[test]
    fn test_claim_total_overflow_is_rejected() {
        let input = WaterfallInput {
            total_proceeds: dec!(1),
            tiers: vec![
                pref("Senior A", 1, Decimal::MAX),
                pref("Senior B", 1, Decimal::MAX),
            ],
        };
        assert!(matches!(
            distribute_waterfall(&input),
            Err(EngineError::FinancialImpossibility(_))
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn stack() -> impl Strategy<Value = Vec<(u32, u64)>> {
            prop::collection::vec((1u32..5, 0u64..50_000_000), 1..8)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn allocations_conserve_proceeds(proceeds in 0u64..400_000_000, claims in stack()) {
                let mut tiers: Vec<WaterfallTier> = claims
                    .iter()
                    .enumerate()
                    .map(|(i, &(p, c))| pref(&format!("T{i}"), p, Decimal::from(c)))
                    .collect();
                tiers.push(common("Common", 10, dec!(0.6)));
                tiers.push(common("Options", 10, dec!(0.4)));

                let input = WaterfallInput { total_proceeds: Decimal::from(proceeds), tiers };
                let out = distribute_waterfall(&input).unwrap().result;
                let sum: Decimal = out.tiers.iter().map(|t| t.allocated).sum();
                prop_assert!((sum - input.total_proceeds).abs() <= CONSERVATION_TOLERANCE);
                prop_assert!(out.tiers.iter().all(|t| t.allocated >= Decimal::ZERO));
            }
        }
    }
}
