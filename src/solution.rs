//! Blend solution type.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::allocate::LotAllocation;
use crate::config::{OperationalLimits, Tolerances};
use crate::request::BlendRequirement;

/// One lot's contribution to a returned solution. Owns its identifying
/// strings rather than borrowing, so a `BlendSolution` outlives the
/// `optimize()` call that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LotShare {
    pub article_code: String,
    pub lot_code: String,
    pub kg_used: f64,
}

/// A proposed mixture, fully scored and ready to present to a caller.
///
/// Constructed exclusively via [`BlendSolutionBuilder`]; never mutated
/// after `build()`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BlendSolution {
    pub lots: Vec<LotShare>,

    pub dc_avg: f64,
    pub fp_avg: f64,
    pub duck_avg: f64,
    pub oe_avg: f64,
    pub feather_avg: f64,

    pub total_kg: f64,
    pub total_cost: f64,
    pub cost_per_kg: f64,

    pub meets_dc: bool,
    pub meets_fp: bool,
    pub meets_duck: bool,
    pub meets_oe: bool,

    pub score: f64,
    pub score_breakdown: BTreeMap<String, f64>,
}

impl BlendSolution {
    /// A solution is valid only if it conforms to every requested target,
    /// reaches 90% of the requested mass, and contains at least one lot.
    pub fn is_valid(&self, req: &BlendRequirement) -> bool {
        if self.lots.is_empty() {
            return false;
        }
        if self.total_kg < 0.9 * req.quantity_kg {
            return false;
        }
        self.meets_dc && self.meets_fp && self.meets_duck && self.meets_oe
    }
}

/// Computes every aggregate up front so the resulting [`BlendSolution`] can
/// be an immutable value.
pub struct BlendSolutionBuilder<'a> {
    allocation: &'a [LotAllocation<'a>],
}

impl<'a> BlendSolutionBuilder<'a> {
    pub fn new(allocation: &'a [LotAllocation<'a>]) -> Self {
        Self { allocation }
    }

    pub fn build(
        self,
        req: &BlendRequirement,
        tolerances: &Tolerances,
        _limits: &OperationalLimits,
        score: f64,
        score_breakdown: BTreeMap<String, f64>,
    ) -> BlendSolution {
        let total_kg: f64 = self.allocation.iter().map(|a| a.kg).sum();

        let dc_avg = weighted_avg(self.allocation, |l| l.dc_real);
        let fp_avg = weighted_avg(self.allocation, |l| l.fp_real);
        let duck_avg = weighted_avg(self.allocation, |l| l.duck_real);
        let oe_avg = weighted_avg(self.allocation, |l| l.other_elements_real);
        let feather_avg = weighted_avg(self.allocation, |l| l.feather_real);

        let total_cost: f64 = self
            .allocation
            .iter()
            .map(|a| a.kg * a.lot.cost_per_kg.unwrap_or(0.0))
            .sum();
        let cost_per_kg = if total_kg > 0.0 { total_cost / total_kg } else { 0.0 };

        let meets_dc = req
            .dc_target
            .map(|t| (dc_avg - t).abs() <= tolerances.dc_tolerance)
            .unwrap_or(true);
        let meets_fp = req
            .fp_target
            .map(|t| (fp_avg - t).abs() <= tolerances.fp_tolerance)
            .unwrap_or(true);
        let meets_duck = req
            .duck_target
            .map(|t| (duck_avg - t).abs() <= tolerances.duck_tolerance)
            .unwrap_or(true);
        let meets_oe = req.max_oe.map(|m| oe_avg <= m).unwrap_or(true);

        let lots = self
            .allocation
            .iter()
            .map(|a| LotShare {
                article_code: a.lot.article_code_raw.clone(),
                lot_code: a.lot.lot_code.clone(),
                kg_used: a.kg,
            })
            .collect();

        BlendSolution {
            lots,
            dc_avg,
            fp_avg,
            duck_avg,
            oe_avg,
            feather_avg,
            total_kg,
            total_cost,
            cost_per_kg,
            meets_dc,
            meets_fp,
            meets_duck,
            meets_oe,
            score,
            score_breakdown,
        }
    }
}

/// Weighted average over only the lots whose field is present; the
/// denominator is the kg of those lots, not the whole allocation.
fn weighted_avg(
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;
    use crate::lot::Lot;

    fn lot(dc: f64, kg: f64) -> (Lot, f64) {
        (
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
            },
            kg,
        )
    }

    #[test]
    fn weighted_average_excludes_missing_fields() {
        let (a, kg_a) = lot(90.0, 100.0);
        let (mut b, kg_b) = lot(0.0, 100.0);
        b.fp_real = None;
        let allocation = vec![
            LotAllocation { lot: &a, kg: kg_a },
            LotAllocation { lot: &b, kg: kg_b },
        ];
        let avg = weighted_avg(&allocation, |l| l.fp_real);
        assert_eq!(avg, 0.0);
    }

    #[test]
    fn is_valid_requires_mass_floor() {
        let (a, _) = lot(85.0, 100.0);
        let allocation = vec![LotAllocation { lot: &a, kg: 100.0 }];
        let builder = BlendSolutionBuilder::new(&allocation);
        let req = BlendRequirement {
            quantity_kg: 1000.0,
            ..Default::default()
        };
        let solution = builder.build(
            &req,
            &Tolerances::default(),
            &OperationalLimits::default(),
            0.0,
            BTreeMap::new(),
        );
        assert!(!solution.is_valid(&req));
    }
}
