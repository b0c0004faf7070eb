//! Operational limits, tolerances, scoring weights, and search parameters.
//!
//! None of these are global singletons: callers construct them (or use
//! `Default`) and pass them explicitly into [`crate::optimize::optimize`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Hard operational limits on lot usage and combinatorial search size.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OperationalLimits {
    /// Minimum kilograms a lot may contribute to a solution.
    #[serde(default = "default_min_lot_usage_kg")]
    pub min_lot_usage_kg: f64,

    /// Maximum fraction of a lot's available stock usable in one solution.
    #[serde(default = "default_max_lot_usage_pct")]
    pub max_lot_usage_pct: f64,

    /// Preferred number of lots per blend (used by scoring, not enforced).
    #[serde(default = "default_ideal_lots_per_blend")]
    pub ideal_lots_per_blend: usize,

    /// Hard ceiling on lots per blend.
    #[serde(default = "default_max_lots_per_blend")]
    pub max_lots_per_blend: usize,

    /// DC window (target +/- this) used by the candidate filter.
    #[serde(default = "default_initial_dc_range")]
    pub initial_dc_range: f64,

    /// Hard cap on combinations generated per strategy.
    #[serde(default = "default_max_combinations")]
    pub max_combinations: usize,
}

fn default_min_lot_usage_kg() -> f64 {
    10.0
}
fn default_max_lot_usage_pct() -> f64 {
    0.95
}
fn default_ideal_lots_per_blend() -> usize {
    5
}
fn default_max_lots_per_blend() -> usize {
    10
}
fn default_initial_dc_range() -> f64 {
    15.0
}
fn default_max_combinations() -> usize {
    25_000
}

impl Default for OperationalLimits {
    fn default() -> Self {
        Self {
            min_lot_usage_kg: default_min_lot_usage_kg(),
            max_lot_usage_pct: default_max_lot_usage_pct(),
            ideal_lots_per_blend: default_ideal_lots_per_blend(),
            max_lots_per_blend: default_max_lots_per_blend(),
            initial_dc_range: default_initial_dc_range(),
            max_combinations: default_max_combinations(),
        }
    }
}

/// Conformance tolerances for quality targets.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Tolerances {
    #[serde(default = "default_dc_tolerance")]
    pub dc_tolerance: f64,
    #[serde(default = "default_fp_tolerance")]
    pub fp_tolerance: f64,
    #[serde(default = "default_duck_tolerance")]
    pub duck_tolerance: f64,
}

fn default_dc_tolerance() -> f64 {
    3.0
}
fn default_fp_tolerance() -> f64 {
    5.0
}
fn default_duck_tolerance() -> f64 {
    5.0
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            dc_tolerance: default_dc_tolerance(),
            fp_tolerance: default_fp_tolerance(),
            duck_tolerance: default_duck_tolerance(),
        }
    }
}

/// Fixed scoring-term weights used by [`crate::evaluate`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScoringWeights {
    pub dc_match_weight: f64,
    pub fp_match_weight: f64,
    pub duck_underuse_weight: f64,
    pub duck_overuse_weight: f64,
    pub duck_inband_weight: f64,
    pub disposal_weight: f64,
    pub species_oa_bonus: f64,
    pub species_a_penalty: f64,
    pub estimated_penalty: f64,
    pub dc_overqualification_threshold: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            dc_match_weight: 1000.0,
            fp_match_weight: 800.0,
            duck_underuse_weight: 500.0,
            duck_overuse_weight: 200.0,
            duck_inband_weight: 600.0,
            disposal_weight: 0.5,
            species_oa_bonus: 50.0,
            species_a_penalty: 75.0,
            estimated_penalty: 100.0,
            dc_overqualification_threshold: 5.0,
        }
    }
}

/// Parameters governing combinatorial search (§4.7 of the design).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Fraction of target mass allocated to a greedy-seed's first lot.
    pub greedy_seed_fraction: f64,
    /// Multiplier on `num_solutions` at which a diversification pass early-stops.
    pub early_stop_multiplier: usize,
    /// Multiplier on `num_solutions` at which full scoring stops early.
    pub scoring_early_stop_multiplier: usize,
    /// How many evaluated combinations between cancellation checks.
    pub cancellation_check_interval: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            greedy_seed_fraction: 0.3,
            early_stop_multiplier: 5000,
            scoring_early_stop_multiplier: 10,
            cancellation_check_interval: 1024,
        }
    }
}

/// Fixed default seed used when a caller does not supply one, keeping
/// `optimize()` deterministic by default.
pub const DEFAULT_SEED: u64 = 0x5EED_BEEF_F00D_CAFE;

/// Derives a per-strategy sub-seed from a base seed using a splitmix-style
/// combine, so the same base seed always reproduces the same diversified
/// search regardless of strategy ordering.
pub fn sub_seed(base: u64, strategy_index: u64) -> u64 {
    let mut z = base.wrapping_add(0x9E37_79B9_7F4A_7C15u64.wrapping_mul(strategy_index + 1));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_seed_is_deterministic() {
        assert_eq!(sub_seed(42, 0), sub_seed(42, 0));
        assert_ne!(sub_seed(42, 0), sub_seed(42, 1));
    }

    #[test]
    fn defaults_match_design() {
        let limits = OperationalLimits::default();
        assert_eq!(limits.min_lot_usage_kg, 10.0);
        assert_eq!(limits.max_combinations, 25_000);
    }
}
