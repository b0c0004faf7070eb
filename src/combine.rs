//! Combination generator (C7).
//!
//! Enumerates candidate lot subsets under four diversification strategies,
//! with pool truncation, greedy seeding, deduplication, and early stopping.

use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::allocate::{self, LotAllocation};
use crate::config::{OperationalLimits, SearchParams};
use crate::lot::Lot;
use crate::request::BlendRequirement;

/// Cooperative cancellation observed at combination-generation checkpoints.
pub trait CancellationToken {
    fn is_cancelled(&self) -> bool;
}

/// Default no-op token: never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl CancellationToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

fn pool_size(n_lots: usize) -> usize {
    if n_lots <= 5 {
        300
    } else if n_lots <= 7 {
        200
    } else {
        150
    }
}

/// Generates deduplicated candidate allocations across all diversification
/// strategies, stopping early once enough have accumulated or the caller
/// cancels.
pub fn generate<'a>(
    ranked: &[&'a Lot],
    req: &BlendRequirement,
    limits: &OperationalLimits,
    search: &SearchParams,
    seed: u64,
    cancel: &dyn CancellationToken,
) -> Vec<Vec<LotAllocation<'a>>> {
    let mut seen = std::collections::HashSet::new();
    let mut accumulated = Vec::new();
    let target_pool = search.early_stop_multiplier * req.num_solutions;

    let strategies = diversified_orderings(ranked, seed);

    for strategy in &strategies {
        if cancel.is_cancelled() {
            break;
        }
        generate_for_ordering(strategy, req, limits, search, cancel, &mut seen, &mut accumulated);
        if accumulated.len() >= target_pool {
            break;
        }
    }

    accumulated
}

fn diversified_orderings<'a>(ranked: &[&'a Lot], seed: u64) -> Vec<Vec<&'a Lot>> {
    let mut orderings = Vec::new();

    orderings.push(ranked.to_vec());

    let mut by_cost = ranked.to_vec();
    by_cost.sort_by(|a, b| {
        a.cost_per_kg
            .unwrap_or(999.0)
            .partial_cmp(&b.cost_per_kg.unwrap_or(999.0))
            .unwrap()
    });
    by_cost.truncate(300);
    orderings.push(by_cost);

    let mut by_qty = ranked.to_vec();
    by_qty.sort_by(|a, b| b.available_kg.partial_cmp(&a.available_kg).unwrap());
    by_qty.truncate(300);
    orderings.push(by_qty);

    for shuffle_idx in 0..2u64 {
        let mut shuffled = ranked.to_vec();
        shuffled.truncate(200);
        let mut rng = SmallRng::seed_from_u64(crate::config::sub_seed(seed, 3 + shuffle_idx));
        shuffled.shuffle(&mut rng);
        orderings.push(shuffled);
    }

    orderings
}

#[allow(clippy::too_many_arguments)]
fn generate_for_ordering<'a>(
    ordering: &[&'a Lot],
    req: &BlendRequirement,
    limits: &OperationalLimits,
    search: &SearchParams,
    cancel: &dyn CancellationToken,
    seen: &mut std::collections::HashSet<Vec<String>>,
    out: &mut Vec<Vec<LotAllocation<'a>>>,
) {
    let mut evaluated = 0usize;

    'sizes: for n_lots in 2..=req.max_lots {
        let pool: Vec<&&Lot> = ordering.iter().take(pool_size(n_lots)).collect();
        for combo in pool.into_iter().combinations(n_lots) {
            if evaluated % search.cancellation_check_interval == 0 && cancel.is_cancelled() {
                break 'sizes;
            }
            evaluated += 1;
            if evaluated > limits.max_combinations {
                break 'sizes;
            }

            let lots: Vec<&Lot> = combo.into_iter().copied().collect();
            let signature = signature_of(&lots);
            if !seen.insert(signature) {
                continue;
            }

            if let Some(allocation) = allocate::allocate(&lots, req.quantity_kg, req.dc_target, limits) {
                if quick_validate(&allocation, req) {
                    out.push(allocation);
                }
            }
        }
    }

    for seed_lot in ordering.iter().take(100) {
        if cancel.is_cancelled() {
            break;
        }
        if let Some(allocation) = grow_greedy_seed(seed_lot, ordering, req, limits, search) {
            let lots: Vec<&Lot> = allocation.iter().map(|a| a.lot).collect();
            let signature = signature_of(&lots);
            if seen.insert(signature) && quick_validate(&allocation, req) {
                out.push(allocation);
            }
        }
    }
}

fn grow_greedy_seed<'a>(
    seed_lot: &&'a Lot,
    ordering: &[&'a Lot],
    req: &BlendRequirement,
    limits: &OperationalLimits,
    search: &SearchParams,
) -> Option<Vec<LotAllocation<'a>>> {
    let target = req.quantity_kg;
    let mut chosen: Vec<&Lot> = vec![seed_lot];
    let mut remaining = target;
    let mut allocations: Vec<LotAllocation> = Vec::new();

    let first_kg = (remaining * search.greedy_seed_fraction)
        .min(seed_lot.available_kg * limits.max_lot_usage_pct);
    if first_kg < limits.min_lot_usage_kg {
        return None;
    }
    allocations.push(LotAllocation {
        lot: seed_lot,
        kg: first_kg,
    });
    remaining -= first_kg;

    for candidate in ordering {
        if chosen.len() >= req.max_lots || remaining <= 0.0 {
            break;
        }
        if chosen.iter().any(|l| std::ptr::eq(*l, *candidate)) {
            continue;
        }

        let candidate_kg = remaining
            .min(candidate.available_kg * limits.max_lot_usage_pct)
            .min(0.3 * target);
        if candidate_kg < limits.min_lot_usage_kg {
            continue;
        }

        let trial_dc = weighted_dc_of(&allocations, candidate, candidate_kg);
        if let Some(dc_target) = req.dc_target {
            let current_dc = weighted_dc_of(&allocations, candidate, 0.0);
            if (trial_dc - dc_target).abs() > (current_dc - dc_target).abs() + 5.0 {
                continue;
            }
        }

        chosen.push(candidate);
        remaining -= candidate_kg;
        allocations.push(LotAllocation {
            lot: candidate,
            kg: candidate_kg,
        });
    }

    if allocations.is_empty() {
        None
    } else {
        Some(allocations)
    }
}

fn weighted_dc_of(existing: &[LotAllocation], extra_lot: &Lot, extra_kg: f64) -> f64 {
    let mut total_kg: f64 = existing.iter().map(|a| a.kg).sum::<f64>() + extra_kg;
    if total_kg <= 0.0 {
        total_kg = 1.0;
    }
    let mut weighted: f64 = existing
        .iter()
        .filter_map(|a| a.lot.dc_real.map(|dc| dc * a.kg))
        .sum();
    if let Some(dc) = extra_lot.dc_real {
        weighted += dc * extra_kg;
    }
    weighted / total_kg
}

fn signature_of(lots: &[&Lot]) -> Vec<String> {
    let mut codes: Vec<String> = lots.iter().map(|l| l.lot_code.clone()).collect();
    codes.sort();
    codes
}

fn quick_validate(allocation: &[LotAllocation], req: &BlendRequirement) -> bool {
    let total: f64 = allocation.iter().map(|a| a.kg).sum();
    if total < 0.7 * req.quantity_kg || total > 1.3 * req.quantity_kg {
        return false;
    }
    if let Some(target) = req.dc_target {
        if (weighted_dc(allocation) - target).abs() > 10.0 {
            return false;
        }
    }
    true
}

fn weighted_dc(allocation: &[LotAllocation]) -> f64 {
    let total: f64 = allocation.iter().map(|a| a.kg).sum();
    if total <= 0.0 {
        return 0.0;
    }
    allocation
        .iter()
        .filter_map(|a| a.lot.dc_real.map(|dc| dc * a.kg))
        .sum::<f64>()
        / total
}
