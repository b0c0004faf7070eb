//! Blend evaluator & scorer (C8).

use std::collections::BTreeMap;

use crate::allocate::LotAllocation;
use crate::codes::Species;
use crate::compat;
use crate::config::{ScoringWeights, Tolerances};
use crate::request::BlendRequirement;
use crate::solution::{BlendSolution, BlendSolutionBuilder};

/// Scores one allocation and builds the corresponding [`BlendSolution`].
pub fn evaluate(
    allocation: &[LotAllocation],
    req: &BlendRequirement,
    tolerances: &Tolerances,
    limits: &crate::config::OperationalLimits,
    weights: &ScoringWeights,
) -> BlendSolution {
    let total_kg: f64 = allocation.iter().map(|a| a.kg).sum();
    let mut breakdown = BTreeMap::new();

    let dc_avg = weighted_field(allocation, |l| l.dc_real);
    if let Some(target) = req.dc_target {
        let term = match_score(dc_avg, target, tolerances.dc_tolerance, weights.dc_match_weight);
        breakdown.insert("dc_match".to_string(), term);
    }

    let fp_avg = weighted_field(allocation, |l| l.fp_real);
    if let Some(target) = req.fp_target {
        let term = match_score(fp_avg, target, tolerances.fp_tolerance, weights.fp_match_weight);
        breakdown.insert("fp_match".to_string(), term);
    }

    let duck_avg = weighted_field(allocation, |l| l.duck_real);
    if let Some(target) = req.duck_target {
        let term = compat::duck_content_score(duck_avg, target, tolerances.duck_tolerance);
        breakdown.insert("duck_match".to_string(), term);
    }

    let disposal: f64 = allocation
        .iter()
        .filter(|a| total_kg > 0.0)
        .map(|a| a.lot.quality_score() * (a.kg / total_kg) * weights.disposal_weight)
        .sum();
    breakdown.insert("disposal".to_string(), disposal);

    let n = allocation.len();
    let lot_count_penalty = lot_count_penalty(n);
    if lot_count_penalty != 0.0 {
        breakdown.insert("lot_count".to_string(), lot_count_penalty);
    }

    if req.species == Some(Species::O) && req.duck_target.unwrap_or(0.0) > 0.0 && total_kg > 0.0 {
        let species_term: f64 = allocation
            .iter()
            .map(|a| {
                let share = a.kg / total_kg;
                match a.lot.code.species {
                    Some(Species::OA) => weights.species_oa_bonus * share,
                    Some(Species::A) => -weights.species_a_penalty * share,
                    _ => 0.0,
                }
            })
            .sum();
        if species_term != 0.0 {
            breakdown.insert("species".to_string(), species_term);
        }
    }

    let mut estimated_penalty = 0.0;
    if total_kg > 0.0 {
        for a in allocation {
            let share = a.kg / total_kg;
            if req.dc_target.is_some() && a.lot.dc_was_imputed {
                estimated_penalty -= weights.estimated_penalty * share;
            }
            if req.fp_target.is_some() && a.lot.fp_was_imputed {
                estimated_penalty -= weights.estimated_penalty * share;
            }
        }
    }
    if estimated_penalty != 0.0 {
        breakdown.insert("estimated_data".to_string(), estimated_penalty);
    }

    let mut dc_overqualification = 0.0;
    if let (Some(target), true) = (req.dc_target, total_kg > 0.0) {
        for a in allocation {
            if let Some(dc) = a.lot.dc_real {
                let surplus = dc - target;
                if surplus > weights.dc_overqualification_threshold {
                    let share = a.kg / total_kg;
                    dc_overqualification -= surplus.powi(2) * share;
                }
            }
        }
    }
    if dc_overqualification != 0.0 {
        breakdown.insert("dc_overqualification".to_string(), dc_overqualification);
    }

    let score: f64 = breakdown.values().sum();

    BlendSolutionBuilder::new(allocation).build(req, tolerances, limits, score, breakdown)
}

fn weighted_field(
    allocation: &[LotAllocation],
    field: impl Fn(&crate::lot::Lot) -> Option<f64>,
) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight = 0.0;
    for a in allocation {
        if let Some(v) = field(a.lot) {
            weighted_sum += v * a.kg;
            weight += a.kg;
        }
    }
    if weight > 0.0 {
        weighted_sum / weight
    } else {
        0.0
    }
}

fn match_score(actual: f64, target: f64, tolerance: f64, weight: f64) -> f64 {
    let delta = (actual - target).abs();
    if tolerance <= 0.0 {
        return if delta == 0.0 { weight } else { -weight };
    }
    if delta <= tolerance {
        weight * (1.0 - delta / tolerance)
    } else {
        -weight * (delta / tolerance - 1.0)
    }
}

fn lot_count_penalty(n: usize) -> f64 {
    let mut penalty = 0.0;
    for count in 6..=n.min(20) {
        penalty -= match count {
            6 | 7 => 25.0,
            8 | 9 => 50.0,
            _ => 100.0,
        };
    }
    penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;
    use crate::lot::Lot;

    fn lot_dc(dc: f64) -> Lot {
        Lot {
            article_code_raw: "PAPW".to_string(),
            lot_code: "L".to_string(),
            description: None,
            code: codes::parse("PAPW"),
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
            available_kg: 10_000.0,
            cost_per_kg: Some(5.0),
            dc_was_imputed: false,
            fp_was_imputed: false,
        }
    }

    #[test]
    fn dc_match_bonus_when_within_tolerance() {
        let score = match_score(84.0, 85.0, 3.0, 1000.0);
        assert!(score > 0.0);
    }

    #[test]
    fn dc_match_penalty_when_outside_tolerance() {
        let score = match_score(70.0, 85.0, 3.0, 1000.0);
        assert!(score < 0.0);
    }

    #[test]
    fn lot_count_penalty_bands() {
        assert_eq!(lot_count_penalty(5), 0.0);
        assert_eq!(lot_count_penalty(7), -50.0);
        assert_eq!(lot_count_penalty(9), -150.0);
        assert_eq!(lot_count_penalty(10), -250.0);
    }

    #[test]
    fn evaluate_rewards_in_tolerance_dc() {
        let a = lot_dc(85.0);
        let allocation = vec![LotAllocation { lot: &a, kg: 1000.0 }];
        let req = BlendRequirement {
            quantity_kg: 1000.0,
            dc_target: Some(85.0),
            ..Default::default()
        };
        let solution = evaluate(
            &allocation,
            &req,
            &Tolerances::default(),
            &crate::config::OperationalLimits::default(),
            &ScoringWeights::default(),
        );
        assert!(solution.score > 0.0);
        assert!(solution.meets_dc);
    }
}
