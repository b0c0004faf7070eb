//! Candidate filter & ranker (C5).

use crate::codes::{Color, Species};
use crate::compat;
use crate::config::{OperationalLimits, Tolerances};
use crate::lot::Lot;
use crate::request::BlendRequirement;

/// Filters the full inventory down to lots admissible for `req`, then sorts
/// by the preservation-aware ranking key (§4.5).
pub fn filter_and_rank<'a>(
    inventory: &'a [Lot],
    req: &BlendRequirement,
    limits: &OperationalLimits,
    _tolerances: &Tolerances,
) -> Vec<&'a Lot> {
    let mut candidates: Vec<&Lot> = inventory
        .iter()
        .filter(|lot| lot.available_kg >= limits.min_lot_usage_kg)
        .filter(|lot| dc_window_ok(lot, req, limits))
        .filter(|lot| !(req.exclude_raw_materials && lot.code.group.as_deref() == Some("G")))
        .filter(|lot| water_repellent_ok(lot, req))
        .filter(|lot| req.allow_estimated || !lot.is_estimated())
        .filter(|lot| material_state_ok(lot, req))
        .filter(|lot| species_ok(lot, req))
        .filter(|lot| color_ok(lot, req))
        .collect();

    candidates.sort_by(|a, b| rank_key(a, req).partial_cmp(&rank_key(b, req)).unwrap());
    candidates
}

fn dc_window_ok(lot: &Lot, req: &BlendRequirement, limits: &OperationalLimits) -> bool {
    let Some(target) = req.dc_target else {
        return true;
    };
    let Some(dc) = lot.dc_real else {
        return false;
    };
    (target - limits.initial_dc_range..=target + limits.initial_dc_range).contains(&dc)
}

fn water_repellent_ok(lot: &Lot, req: &BlendRequirement) -> bool {
    compat::water_repellent_compatible(req.water_repellent, lot.is_water_repellent(), false)
}

fn material_state_ok(lot: &Lot, req: &BlendRequirement) -> bool {
    match lot.code.state {
        Some(state) => compat::material_state_compatible(state, req.dc_target),
        None => false,
    }
}

/// Flexible species admissibility (§4.5 step 7) — deliberately more
/// permissive than `crate::compat::species_compatibility`, which is the
/// strict standalone API.
fn species_ok(lot: &Lot, req: &BlendRequirement) -> bool {
    let Some(target_species) = req.species else {
        return true;
    };
    let duck = lot.duck_real.unwrap_or(0.0);
    match target_species {
        Species::A => {
            if lot.code.species == Some(Species::O) && duck < 15.0 {
                false
            } else {
                duck >= 50.0 || lot.code.species == Some(Species::A)
            }
        }
        Species::O => match req.duck_target {
            Some(target) => duck <= target + 30.0,
            None => duck <= 95.0,
        },
        Species::OA => true,
        Species::C => lot.code.species == Some(Species::C),
    }
}

/// Flexible color admissibility (§4.5 step 8).
fn color_ok(lot: &Lot, req: &BlendRequirement) -> bool {
    let Some(target_color) = req.color else {
        return true;
    };
    let Some(lot_color) = lot.code.color else {
        return false;
    };
    lot_color == target_color || base_color(lot_color) == base_color(target_color)
}

/// Leading letter after stripping the `PW`/`NPW` suffix, matching the
/// original's `get_base_color` (`"BPW"` strips `PW` to `"B"`, base `Br`).
fn base_color(color: Color) -> Color {
    match color {
        Color::Bpw => Color::Br,
        Color::Bnpw => Color::Br,
        other => other,
    }
}

/// Ascending ranking key: earlier entries are preferred for inclusion.
fn rank_key(lot: &Lot, req: &BlendRequirement) -> (f64, f64, f64, f64) {
    let duck_penalty = req
        .duck_target
        .map(|target| duck_preservation_penalty(lot.duck_real.unwrap_or(0.0), target))
        .unwrap_or(0.0);

    let dc_overqualification = req
        .dc_target
        .map(|target| (lot.dc_real.unwrap_or(target) - target).max(0.0).powf(1.5))
        .unwrap_or(0.0);

    let disposal = -lot.quality_score();
    let cost = lot.cost_per_kg.unwrap_or(999.0);

    if req.dc_target.is_some() {
        (duck_penalty, dc_overqualification, disposal, cost)
    } else {
        (0.0, 0.0, disposal, cost)
    }
}

fn duck_preservation_penalty(duck_real: f64, duck_target: f64) -> f64 {
    let preserve_below = 0.5 * duck_target;
    let use_above = 2.0 * duck_target;
    if duck_real < preserve_below {
        (preserve_below - duck_real).powi(2)
    } else if duck_real > use_above {
        (duck_real - use_above).powi(2)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    fn lot(code: &str, dc: f64, avail: f64) -> Lot {
        Lot {
            article_code_raw: code.to_string(),
            lot_code: "L".to_string(),
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

    #[test]
    fn filters_out_lots_below_min_usage() {
        let inventory = vec![lot("PAPW", 85.0, 5.0)];
        let req = BlendRequirement {
            quantity_kg: 1000.0,
            ..Default::default()
        };
        let candidates = filter_and_rank(
            &inventory,
            &req,
            &OperationalLimits::default(),
            &Tolerances::default(),
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn filters_out_lots_outside_dc_window() {
        let inventory = vec![lot("PAPW", 40.0, 1000.0)];
        let req = BlendRequirement {
            quantity_kg: 1000.0,
            dc_target: Some(85.0),
            ..Default::default()
        };
        let candidates = filter_and_rank(
            &inventory,
            &req,
            &OperationalLimits::default(),
            &Tolerances::default(),
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn species_a_excludes_low_duck_goose_lots() {
        let mut goose = lot("MOPW", 85.0, 1000.0);
        goose.duck_real = Some(5.0);
        let req = BlendRequirement {
            quantity_kg: 1000.0,
            species: Some(Species::A),
            ..Default::default()
        };
        let candidates = filter_and_rank(
            &[goose],
            &req,
            &OperationalLimits::default(),
            &Tolerances::default(),
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn ranking_prefers_lower_cost_when_no_dc_target() {
        let mut cheap = lot("PAPW", 85.0, 1000.0);
        cheap.cost_per_kg = Some(5.0);
        let expensive = lot("PAPW", 85.0, 1000.0);
        let req = BlendRequirement {
            quantity_kg: 1000.0,
            ..Default::default()
        };
        let candidates = filter_and_rank(
            &[expensive, cheap],
            &req,
            &OperationalLimits::default(),
            &Tolerances::default(),
        );
        assert_eq!(candidates[0].cost_per_kg, Some(5.0));
    }
}
