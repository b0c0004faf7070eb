//! Top-level orchestration: candidate filtering -> combination generation
//! -> evaluation -> top-k selection.

use crate::candidates;
use crate::combine::{self, CancellationToken, NeverCancel};
use crate::config::{OperationalLimits, ScoringWeights, SearchParams, Tolerances, DEFAULT_SEED};
use crate::error::OptimizerError;
use crate::evaluate;
use crate::events::{EventSink, NullSink};
use crate::lot::Lot;
use crate::request::BlendRequirement;
use crate::solution::BlendSolution;

/// Tunables that are not part of the domain request itself.
pub struct OptimizeOptions<'a> {
    pub limits: OperationalLimits,
    pub tolerances: Tolerances,
    pub weights: ScoringWeights,
    pub search: SearchParams,
    pub seed: u64,
    pub cancel: &'a dyn CancellationToken,
    pub sink: &'a dyn EventSink,
}

impl Default for OptimizeOptions<'_> {
    fn default() -> Self {
        Self {
            limits: OperationalLimits::default(),
            tolerances: Tolerances::default(),
            weights: ScoringWeights::default(),
            search: SearchParams::default(),
            seed: DEFAULT_SEED,
            cancel: &NeverCancel,
            sink: &NullSink,
        }
    }
}

/// Computes blended recipes meeting `req`'s targets from `inventory`.
///
/// Deterministic given the same inputs and `options.seed`.
pub fn optimize(
    req: &BlendRequirement,
    inventory: &[Lot],
    options: &OptimizeOptions,
) -> Result<Vec<BlendSolution>, OptimizerError> {
    let req = req.clone().validated()?;

    let candidates_with = candidates::filter_and_rank(
        inventory,
        &req,
        &options.limits,
        &options.tolerances,
    );

    if candidates_with.is_empty() {
        let without_estimated_req = BlendRequirement {
            allow_estimated: false,
            ..req.clone()
        };
        let without_estimated = candidates::filter_and_rank(
            inventory,
            &without_estimated_req,
            &options.limits,
            &options.tolerances,
        );
        let with_estimated_req = BlendRequirement {
            allow_estimated: true,
            ..req.clone()
        };
        let with_estimated = candidates::filter_and_rank(
            inventory,
            &with_estimated_req,
            &options.limits,
            &options.tolerances,
        );
        return Err(OptimizerError::NoCandidates {
            with_estimated: with_estimated.len(),
            without_estimated: without_estimated.len(),
        });
    }

    let allocations = combine::generate(
        &candidates_with,
        &req,
        &options.limits,
        &options.search,
        options.seed,
        options.cancel,
    );

    let mut scored: Vec<BlendSolution> = Vec::new();
    let scoring_cap = options.search.scoring_early_stop_multiplier * req.num_solutions;

    for (idx, allocation) in allocations.iter().enumerate() {
        if idx % options.search.cancellation_check_interval == 0 && options.cancel.is_cancelled() {
            let mut partial = scored;
            partial.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
            partial.truncate(req.num_solutions);
            return Err(OptimizerError::Cancelled { partial });
        }

        let solution = evaluate::evaluate(
            allocation,
            &req,
            &options.tolerances,
            &options.limits,
            &options.weights,
        );
        if solution.is_valid(&req) {
            scored.push(solution);
        }
        if scored.len() >= scoring_cap {
            break;
        }
    }

    if scored.is_empty() {
        let estimated_would_help = !req.allow_estimated && {
            let alt_req = BlendRequirement {
                allow_estimated: true,
                ..req.clone()
            };
            let alt_candidates = candidates::filter_and_rank(
                inventory,
                &alt_req,
                &options.limits,
                &options.tolerances,
            );
            alt_candidates.len() > candidates_with.len()
        };
        options.sink.info(
            "no_feasible_blend",
            &[("candidate_count", &candidates_with.len().to_string())],
        );
        return Err(OptimizerError::NoFeasibleBlend {
            candidate_count: candidates_with.len(),
            estimated_would_help,
        });
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    scored.truncate(req.num_solutions);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    fn lot(code: &str, dc: f64, avail: f64) -> Lot {
        Lot {
            article_code_raw: code.to_string(),
            lot_code: format!("L-{code}-{dc}"),
            description: None,
            code: codes::parse(code),
            dc_real: Some(dc),
            fp_real: None,
            duck_real: None,
            other_elements_real: None,
            feather_real: None,
            oxygen_real: None,
            turbidity_real: None,
            total_fibres: None,
            broken: None,
            landfowl: None,
            dc_nominal: None,
            fp_nominal: None,
            quality_nominal: None,
            standard_nominal: None,
            available_kg: avail,
            cost_per_kg: Some(10.0),
            dc_was_imputed: false,
            fp_was_imputed: false,
        }
    }

    // S1: uniform allocation across two identical lots.
    #[test]
    fn scenario_s1_uniform_allocation() {
        let inventory = vec![lot("PAPW", 85.0, 5000.0), lot("PAPW", 85.0, 5000.0)];
        let req = BlendRequirement {
            dc_target: Some(85.0),
            quantity_kg: 2000.0,
            ..Default::default()
        };
        let solutions = optimize(&req, &inventory, &OptimizeOptions::default()).unwrap();
        assert!(!solutions.is_empty());
        let best = &solutions[0];
        assert!((best.dc_avg - 85.0).abs() < 0.01);
        assert!(best.meets_dc);
    }

    // S2: DC bending across three lots at different DCs.
    #[test]
    fn scenario_s2_dc_bending() {
        let inventory = vec![
            lot("PAPW", 90.0, 1000.0),
            lot("PAPW", 80.0, 1000.0),
            lot("PAPW", 70.0, 1000.0),
        ];
        let req = BlendRequirement {
            dc_target: Some(80.0),
            quantity_kg: 1500.0,
            max_lots: 3,
            ..Default::default()
        };
        let solutions = optimize(&req, &inventory, &OptimizeOptions::default()).unwrap();
        let best = &solutions[0];
        assert!((best.dc_avg - 80.0).abs() <= 3.0);
        assert!(best.lots.len() >= 2);
    }

    // S3: infeasible mass — one lot can't reach 90% of the requested kg.
    #[test]
    fn scenario_s3_infeasible_mass() {
        let inventory = vec![lot("PAPW", 85.0, 500.0)];
        let req = BlendRequirement {
            dc_target: Some(85.0),
            quantity_kg: 2000.0,
            ..Default::default()
        };
        let result = optimize(&req, &inventory, &OptimizeOptions::default());
        assert!(matches!(result, Err(OptimizerError::NoFeasibleBlend { .. })));
    }

    // S4: estimated-data gating.
    #[test]
    fn scenario_s4_estimated_gating() {
        let mut estimated_lot = lot("PAPW", 85.0, 2000.0);
        estimated_lot.dc_was_imputed = true;

        let inventory = vec![estimated_lot];
        let req = BlendRequirement {
            dc_target: Some(85.0),
            quantity_kg: 1000.0,
            allow_estimated: false,
            ..Default::default()
        };
        let result = optimize(&req, &inventory, &OptimizeOptions::default());
        match result {
            Err(OptimizerError::NoCandidates { with_estimated, without_estimated }) => {
                assert!(with_estimated > without_estimated);
            }
            other => panic!("expected NoCandidates, got {other:?}"),
        }

        let req_allow = BlendRequirement {
            allow_estimated: true,
            ..req
        };
        let solutions = optimize(&req_allow, &inventory, &OptimizeOptions::default()).unwrap();
        assert!(!solutions.is_empty());
    }

    // S5: duck-blend species exclusion.
    #[test]
    fn scenario_s5_species_exclusion() {
        let mut goose = lot("MOPW", 85.0, 2000.0);
        goose.duck_real = Some(5.0);
        let mut duck_a = lot("PAPW", 85.0, 2000.0);
        duck_a.lot_code = "DUCK-A".to_string();
        duck_a.duck_real = Some(100.0);
        let mut duck_b = lot("PAPW", 85.0, 2000.0);
        duck_b.lot_code = "DUCK-B".to_string();
        duck_b.duck_real = Some(100.0);

        let inventory = vec![goose, duck_a, duck_b];
        let req = BlendRequirement {
            species: Some(codes::Species::A),
            quantity_kg: 500.0,
            max_lots: 2,
            ..Default::default()
        };
        let solutions = optimize(&req, &inventory, &OptimizeOptions::default()).unwrap();
        let best = &solutions[0];
        assert!(best.lots.iter().all(|l| l.article_code == "PAPW"));
    }
}
