//! Article-code decoding (C1).
//!
//! Article codes encode material state, species, and color in a compact
//! pipe-delimited string, plus a handful of "special" aliases that bypass
//! the positional grammar entirely.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Material state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MaterialState {
    /// Piumino (down) — pure down product.
    P,
    /// Misto (mixed) — blendable up to 50% DC.
    M,
    /// Scarto (scrap) — blendable up to 30% DC.
    S,
    /// Other — raw/unprocessed, never admissible in a standard blend.
    O,
}

/// Species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Species {
    /// Oca (goose).
    O,
    /// Anatra (duck).
    A,
    /// Oca/Anatra mixed.
    OA,
    /// Composite/synthetic.
    C,
}

/// Canonical color grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Color {
    /// Pure white.
    Pw,
    /// Bleached pure white.
    Bpw,
    /// Near pure white.
    Npw,
    /// Bleached near pure white.
    Bnpw,
    /// Grey.
    Gy,
    /// Brown/dark.
    Br,
    /// Raw, unsorted.
    Raw,
}

const SPECIAL_CODES: &[(&str, MaterialState, Species, Color)] = &[
    ("PGR", MaterialState::P, Species::OA, Color::Gy),
    ("PBR", MaterialState::P, Species::OA, Color::Br),
];

/// A decoded article identifier.
///
/// An `ArticleCode` is built once at ingestion via [`parse`] and never
/// mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArticleCode {
    pub raw: String,
    pub group: Option<String>,
    pub state: Option<MaterialState>,
    pub species: Option<Species>,
    pub color: Option<Color>,
    pub color_raw: Option<String>,
    pub certification: Option<String>,
}

impl ArticleCode {
    /// `true` iff state, species, and color all resolved to known values.
    pub fn is_valid(&self) -> bool {
        self.state.is_some() && self.species.is_some() && self.color.is_some()
    }

    /// Certification-half of the water-repellent predicate (§4.1); the
    /// lot-level `quality_nominal` half lives on `Lot::is_water_repellent`.
    pub fn is_wr_certified(&self) -> bool {
        matches!(
            self.certification.as_deref().map(str::to_uppercase).as_deref(),
            Some("GWR") | Some("NWR")
        )
    }

    /// Ordinal quality rank: lower is better. Unknown colors sort last.
    pub fn quality_rank(&self) -> u32 {
        match self.color {
            Some(Color::Pw) | Some(Color::Bpw) => 1,
            Some(Color::Npw) | Some(Color::Bnpw) => 2,
            Some(Color::Br) => 3,
            Some(Color::Gy) => 4,
            Some(Color::Raw) | None => u32::MAX,
        }
    }
}

/// Parses a raw article string into an [`ArticleCode`].
///
/// Accepted forms: `GROUP|MAIN|CERT`, `GROUP|MAIN`, or bare `MAIN`. `MAIN` is
/// tested against the special-code table first (longest alias wins on a
/// tie), then decoded positionally as `state + species + color`.
pub fn parse(raw: &str) -> ArticleCode {
    let parts: Vec<&str> = raw.split('|').collect();
    let (group, main, certification) = match parts.as_slice() {
        [g, m, c] => (Some((*g).to_string()), *m, Some((*c).to_string())),
        [g, m] => (Some((*g).to_string()), *m, None),
        [m] => (None, *m, None),
        _ => (None, raw, None),
    };

    if let Some((state, species, color)) = match_special(main) {
        return ArticleCode {
            raw: raw.to_string(),
            group,
            state: Some(state),
            species: Some(species),
            color: Some(color),
            color_raw: Some(main.to_string()),
            certification,
        };
    }

    parse_positional(raw, main, group, certification)
}

fn match_special(main: &str) -> Option<(MaterialState, Species, Color)> {
    let mut candidates: Vec<&(&str, MaterialState, Species, Color)> = SPECIAL_CODES
        .iter()
        .filter(|(code, ..)| main.contains(code))
        .collect();
    candidates.sort_by_key(|(code, ..)| std::cmp::Reverse(code.len()));
    candidates.first().map(|(_, s, sp, c)| (*s, *sp, *c))
}

fn parse_positional(
    raw: &str,
    main: &str,
    group: Option<String>,
    certification: Option<String>,
) -> ArticleCode {
    let chars: Vec<char> = main.chars().collect();
    if chars.is_empty() {
        return ArticleCode {
            raw: raw.to_string(),
            group,
            state: None,
            species: None,
            color: None,
            color_raw: None,
            certification,
        };
    }

    let state = parse_state(chars[0]);

    let (species, color_part) = if main.len() >= 3 && main[1..3].eq_ignore_ascii_case("OA") {
        (Some(Species::OA), &main[3..])
    } else if chars.len() > 1 {
        (parse_species(chars[1]), &main[main.char_indices().nth(2).map(|(i, _)| i).unwrap_or(main.len())..])
    } else {
        (None, "")
    };

    let color = parse_color_flexible(color_part);

    ArticleCode {
        raw: raw.to_string(),
        group,
        state,
        species,
        color,
        color_raw: if color_part.is_empty() {
            None
        } else {
            Some(color_part.to_string())
        },
        certification,
    }
}

fn parse_state(c: char) -> Option<MaterialState> {
    match c.to_ascii_uppercase() {
        'P' => Some(MaterialState::P),
        'M' => Some(MaterialState::M),
        'S' => Some(MaterialState::S),
        'O' => Some(MaterialState::O),
        _ => None,
    }
}

fn parse_species(c: char) -> Option<Species> {
    match c.to_ascii_uppercase() {
        'O' => Some(Species::O),
        'A' => Some(Species::A),
        'C' => Some(Species::C),
        _ => None,
    }
}

/// Resolves a color fragment by the first rule that matches: exact match,
/// prefix before `.`, first 3 chars, first 2 chars, first char.
fn parse_color_flexible(part: &str) -> Option<Color> {
    if part.is_empty() {
        return None;
    }
    let upper = part.to_ascii_uppercase();

    if let Some(c) = exact_color(&upper) {
        return Some(c);
    }
    if let Some((before_dot, _)) = upper.split_once('.') {
        if let Some(c) = exact_color(before_dot) {
            return Some(c);
        }
    }
    for len in [3usize, 2, 1] {
        if upper.len() >= len {
            if let Some(c) = exact_color(&upper[..len]) {
                return Some(c);
            }
        }
    }
    None
}

fn exact_color(s: &str) -> Option<Color> {
    match s {
        "PW" => Some(Color::Pw),
        "BPW" => Some(Color::Bpw),
        "NPW" => Some(Color::Npw),
        "BNPW" => Some(Color::Bnpw),
        "G" | "GY" => Some(Color::Gy),
        "B" => Some(Color::Br),
        "R" => Some(Color::Raw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PGR")]
    #[case("PGR.GRS")]
    #[case("X|PGR|GWR")]
    fn special_code_decodes_to_oa_grey(#[case] raw: &str) {
        let code = parse(raw);
        assert_eq!(code.state, Some(MaterialState::P));
        assert_eq!(code.species, Some(Species::OA));
        assert_eq!(code.color, Some(Color::Gy));
    }

    #[rstest]
    #[case("PBR.XXX")]
    fn special_code_pbr_decodes_to_brown(#[case] raw: &str) {
        let code = parse(raw);
        assert_eq!(code.state, Some(MaterialState::P));
        assert_eq!(code.species, Some(Species::OA));
        assert_eq!(code.color, Some(Color::Br));
    }

    #[test]
    fn positional_code_decodes_state_species_color() {
        let code = parse("PAPW");
        assert_eq!(code.state, Some(MaterialState::P));
        assert_eq!(code.species, Some(Species::A));
        assert_eq!(code.color, Some(Color::Pw));
        assert!(code.is_valid());
    }

    #[test]
    fn oa_species_consumes_two_characters() {
        let code = parse("MOANPW");
        assert_eq!(code.state, Some(MaterialState::M));
        assert_eq!(code.species, Some(Species::OA));
        assert_eq!(code.color, Some(Color::Npw));
    }

    #[test]
    fn unknown_color_falls_back_to_base() {
        let code = parse("PAB.FM");
        assert_eq!(code.color, Some(Color::Br));
    }

    #[test]
    fn unresolvable_color_marks_invalid() {
        let code = parse("PAZZ");
        assert_eq!(code.color, None);
        assert!(!code.is_valid());
    }

    #[test]
    fn quality_rank_orders_pw_best() {
        let pw = parse("PAPW");
        let raw = parse("PARAW_UNUSED");
        assert!(pw.quality_rank() < raw.quality_rank());
    }
}
