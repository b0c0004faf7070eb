//! Compatibility manager (C4).
//!
//! Standalone predicates and penalty scores over [`ArticleCode`] and lot
//! measurements. Exposed as a stateless API independently of the candidate
//! filter (C5), which has its own, more permissive "flexible" rules for the
//! actual search hot path — see [`crate::candidates`].

use crate::codes::{ArticleCode, Color, MaterialState, Species};

/// Rejects any color penalty at or below this value outright.
pub const COLOR_INCOMPATIBLE: f64 = -10_000.0;

/// `true` iff a lot in the given material state can be used in a blend
/// targeting `dc_target` (unset means "no DC constraint").
pub fn material_state_compatible(state: MaterialState, dc_target: Option<f64>) -> bool {
    match state {
        MaterialState::P => true,
        MaterialState::M => dc_target.map(|t| t <= 50.0).unwrap_or(true),
        MaterialState::S => dc_target.map(|t| t <= 30.0).unwrap_or(true),
        MaterialState::O => false,
    }
}

/// Species admissibility and penalty for a lot relative to a blend's target
/// species and (if any) duck target.
pub fn species_compatibility(
    blend_species: Species,
    lot_species: Species,
    duck_target: Option<f64>,
) -> (bool, f64) {
    match (blend_species, lot_species) {
        (Species::A, Species::O) => (false, -1000.0),
        (Species::A, _) => (true, 0.0),
        (Species::O, Species::OA) => (true, if duck_target.unwrap_or(0.0) > 0.0 { -50.0 } else { -30.0 }),
        (Species::O, Species::A) => (true, if duck_target.unwrap_or(0.0) > 0.0 { -150.0 } else { -100.0 }),
        (Species::O, Species::O) => (true, 0.0),
        (Species::OA, _) => (true, 0.0),
        (_, _) => (true, 0.0),
    }
}

fn grade(color: Color) -> u8 {
    match color {
        Color::Pw | Color::Bpw => 1,
        Color::Npw | Color::Bnpw => 2,
        Color::Gy => 3,
        Color::Br => 4,
        Color::Raw => 5,
    }
}

/// Color admissibility and penalty. A lot of strictly better grade than the
/// blend target is blocked (never burn premium stock on an undemanding
/// blend); a lot of worse grade is usable at a flat penalty.
///
/// This is a grade-distance approximation, not a literal transcription of an
/// asymmetric per-pair matrix: the original's color penalty table was empty
/// in every source available here, so there was nothing to transcribe. This
/// function is reached only by its own tests; `candidates::color_ok` is the
/// admissibility check actually used during search.
pub fn color_compatibility(blend_color: Color, lot_color: Color) -> (bool, f64) {
    if matches!(blend_color, Color::Raw) || matches!(lot_color, Color::Raw) {
        return (false, COLOR_INCOMPATIBLE);
    }
    let (bg, lg) = (grade(blend_color), grade(lot_color));
    if bg == lg {
        (true, 0.0)
    } else if lg > bg {
        (true, -150.0)
    } else {
        (false, COLOR_INCOMPATIBLE)
    }
}

/// Water-repellent admissibility. `blend_requires_wr = None` means the
/// blend has no WR requirement either way.
pub fn water_repellent_compatible(
    blend_requires_wr: Option<bool>,
    lot_is_wr: bool,
    allow_mixing: bool,
) -> bool {
    match blend_requires_wr {
        None => true,
        Some(true) => lot_is_wr || allow_mixing,
        Some(false) => !lot_is_wr || allow_mixing,
    }
}

/// Duck-content score: rewards landing in-band, penalizes under- and
/// over-shoot asymmetrically (underuse is the critical failure mode).
pub fn duck_content_score(actual: f64, target: f64, tolerance: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    let delta = actual - target;
    if delta < -tolerance {
        -500.0 * (target - actual) / target
    } else if delta > tolerance {
        -200.0 * (actual - target) / target
    } else {
        600.0 * (1.0 - delta.abs() / tolerance)
    }
}

/// Combines an [`ArticleCode`]'s certification flag with the lot-level
/// nominal-quality text flag to decide water-repellent status.
pub fn is_water_repellent(code: &ArticleCode, quality_nominal: Option<&str>) -> bool {
    if code.is_wr_certified() {
        return true;
    }
    quality_nominal
        .map(|q| {
            let q = q.trim().to_uppercase();
            q == "GWR" || q == "NWR"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MaterialState::P, Some(90.0), true)]
    #[case(MaterialState::M, Some(50.0), true)]
    #[case(MaterialState::M, Some(51.0), false)]
    #[case(MaterialState::S, Some(30.0), true)]
    #[case(MaterialState::S, Some(31.0), false)]
    #[case(MaterialState::O, None, false)]
    fn material_state_gates_on_dc_target(
        #[case] state: MaterialState,
        #[case] target: Option<f64>,
        #[case] expected: bool,
    ) {
        assert_eq!(material_state_compatible(state, target), expected);
    }

    #[test]
    fn species_a_rejects_pure_goose() {
        let (ok, penalty) = species_compatibility(Species::A, Species::O, None);
        assert!(!ok);
        assert_eq!(penalty, -1000.0);
    }

    #[test]
    fn species_o_with_duck_target_prefers_oa_over_a() {
        let (_, oa_penalty) = species_compatibility(Species::O, Species::OA, Some(40.0));
        let (_, a_penalty) = species_compatibility(Species::O, Species::A, Some(40.0));
        assert!(oa_penalty > a_penalty);
    }

    #[test]
    fn color_lower_grade_lot_usable_at_penalty() {
        let (ok, penalty) = color_compatibility(Color::Pw, Color::Br);
        assert!(ok);
        assert_eq!(penalty, -150.0);
    }

    #[test]
    fn color_higher_grade_lot_blocked() {
        let (ok, penalty) = color_compatibility(Color::Br, Color::Pw);
        assert!(!ok);
        assert_eq!(penalty, COLOR_INCOMPATIBLE);
    }

    #[test]
    fn duck_score_rewards_inband() {
        let score = duck_content_score(80.0, 80.0, 5.0);
        assert_eq!(score, 600.0);
    }

    #[test]
    fn duck_score_penalizes_underuse_harder_than_overuse() {
        let under = duck_content_score(60.0, 80.0, 5.0);
        let over = duck_content_score(100.0, 80.0, 5.0);
        assert!(under < over);
    }
}
