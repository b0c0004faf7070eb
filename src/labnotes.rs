//! Lab-note text mining (C2).
//!
//! Free-text lab notes (Italian, informal) sometimes carry a more precise
//! estimate of DC/FP/OE than the nominal declared values. This module pulls
//! whatever structured signal it can out of that text.

use regex::Regex;
use std::sync::OnceLock;

/// Estimates extracted from a lab note, with an accumulated confidence in
/// `[0, 1]` reflecting how much signal was actually found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabEstimates {
    pub dc_estimate: Option<f64>,
    pub dc_range: Option<(f64, f64)>,
    pub fp_estimate: Option<f64>,
    pub oe_class: Option<u8>,
    pub oe_estimate: Option<f64>,
    pub confidence: f64,
    pub source: String,
}

const CLASS_TO_OE: [(u8, f64); 4] = [(1, 5.0), (2, 12.0), (3, 20.0), (4, 30.0)];

const FP_QUALITATIVE_MAP: &[(&str, f64)] = &[
    ("molto alto", 800.0),
    ("alto", 750.0),
    ("medio-alto", 700.0),
    ("medio alto", 700.0),
    ("medio", 650.0),
    ("medio-basso", 600.0),
    ("medio basso", 600.0),
    ("basso", 550.0),
    ("molto basso", 500.0),
    ("buona resa", 680.0),
    ("ottima resa", 720.0),
];

const OE_INDICATORS: &[(&str, f64)] = &[
    ("assenza", 0.5),
    ("bassa presenza", 2.0),
    ("media presenza", 4.0),
    ("alta presenza", 6.0),
    ("molto alta presenza", 8.0),
];

struct Patterns {
    dc_range: Regex,
    dc_pct: Regex,
    dc_circa_piumino: Regex,
    dc_visivamente: Regex,
    class_cl: Regex,
    class_word: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        dc_range: Regex::new(r"dc[:\s]+(\d+(?:\.\d+)?)\s*-\s*(\d+(?:\.\d+)?)\s*%").unwrap(),
        dc_pct: Regex::new(r"dc[:\s]+(\d+(?:\.\d+)?)\s*%").unwrap(),
        dc_circa_piumino: Regex::new(r"circa\s+un?\s+(\d+)\s*-\s*(\d+)\s*%\s*(?:di\s+)?piumino")
            .unwrap(),
        dc_visivamente: Regex::new(r"visivamente\s+circa\s+un?\s+(\d+)\s*%").unwrap(),
        class_cl: Regex::new(r"cl\s*(\d)").unwrap(),
        class_word: Regex::new(r"class\s*(\d)").unwrap(),
    })
}

/// Parses a lab note and extracts whatever DC/Class/FP/OE signal it can.
/// Notes shorter than 5 characters are treated as empty.
pub fn parse(lab_note: &str) -> LabEstimates {
    if lab_note.trim().len() < 5 {
        return LabEstimates::default();
    }

    let note = lab_note.to_lowercase();
    let mut estimates = LabEstimates {
        source: lab_note.chars().take(100).collect(),
        ..Default::default()
    };

    if let Some((estimate, range)) = extract_dc(&note) {
        estimates.dc_estimate = Some(estimate);
        estimates.dc_range = range;
        estimates.confidence += 0.4;
    }

    let class = extract_class(&note);
    if let Some(cl) = class {
        estimates.oe_class = Some(cl);
        estimates.oe_estimate = CLASS_TO_OE.iter().find(|(c, _)| *c == cl).map(|(_, v)| *v);
        estimates.confidence += 0.3;
    }

    if let Some(fp) = extract_fill_power(&note) {
        estimates.fp_estimate = Some(fp);
        estimates.confidence += 0.2;
    }

    if class.is_none() {
        if let Some(oe) = extract_oe_from_indicators(&note) {
            estimates.oe_estimate = Some(oe);
            estimates.confidence += 0.1;
        }
    }

    estimates
}

fn extract_dc(note: &str) -> Option<(f64, Option<(f64, f64)>)> {
    let p = patterns();

    if let Some(c) = p.dc_range.captures(note) {
        let lo: f64 = c[1].parse().ok()?;
        let hi: f64 = c[2].parse().ok()?;
        return Some(((lo + hi) / 2.0, Some((lo, hi))));
    }
    if let Some(c) = p.dc_pct.captures(note) {
        let dc: f64 = c[1].parse().ok()?;
        return Some((dc, Some((dc - 2.0, dc + 2.0))));
    }
    if let Some(c) = p.dc_circa_piumino.captures(note) {
        let lo: f64 = c[1].parse().ok()?;
        let hi: f64 = c[2].parse().ok()?;
        return Some(((lo + hi) / 2.0, Some((lo, hi))));
    }
    if let Some(c) = p.dc_visivamente.captures(note) {
        let dc: f64 = c[1].parse().ok()?;
        return Some((dc, Some((dc - 3.0, dc + 3.0))));
    }
    None
}

fn extract_class(note: &str) -> Option<u8> {
    let p = patterns();
    for re in [&p.class_cl, &p.class_word] {
        if let Some(c) = re.captures(note) {
            if let Ok(n) = c[1].parse::<u8>() {
                if (1..=4).contains(&n) {
                    return Some(n);
                }
            }
        }
    }
    None
}

/// `FP_QUALITATIVE_MAP` sorted by descending phrase length, so a longer
/// phrase (e.g. "medio-alto") is tried before a shorter one it contains
/// (e.g. "alto").
fn fp_indicators_by_length() -> &'static [(&'static str, f64)] {
    static SORTED: OnceLock<Vec<(&'static str, f64)>> = OnceLock::new();
    SORTED
        .get_or_init(|| {
            let mut sorted = FP_QUALITATIVE_MAP.to_vec();
            sorted.sort_by_key(|(indicator, _)| std::cmp::Reverse(indicator.len()));
            sorted
        })
        .as_slice()
}

fn extract_fill_power(note: &str) -> Option<f64> {
    for (indicator, value) in fp_indicators_by_length() {
        if !note.contains(indicator) {
            continue;
        }
        if note.contains("fp") {
            return Some(*value);
        }
        if indicator.contains("resa") {
            return Some(*value);
        }
    }
    None
}

fn extract_oe_from_indicators(note: &str) -> Option<f64> {
    let mut oe = 0.0;
    let mut found = 0;

    if note.contains("broken") {
        if let Some((_, value)) = OE_INDICATORS.iter().find(|(ind, _)| note.contains(ind)) {
            oe += value;
            found += 1;
        }
    }

    if note.contains("fibr") {
        if let Some((_, value)) = OE_INDICATORS.iter().find(|(ind, _)| note.contains(ind)) {
            oe += value * 0.7;
            found += 1;
        }
    }

    if note.contains("polvere") {
        oe += 1.5;
        found += 1;
    }

    if found == 0 {
        return None;
    }
    if found > 1 {
        oe *= 0.7;
    }
    Some(oe.min(15.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn short_note_yields_no_estimates() {
        let e = parse("ok");
        assert_eq!(e, LabEstimates::default());
    }

    #[rstest]
    #[case("DC 35-40%", 37.5)]
    #[case("dc: 68%", 68.0)]
    #[case("circa un 18-20% di piumino", 19.0)]
    #[case("visivamente circa un 18%", 18.0)]
    fn dc_patterns_extract_expected_estimate(#[case] note: &str, #[case] expected: f64) {
        let e = parse(note);
        assert_eq!(e.dc_estimate, Some(expected));
    }

    #[rstest]
    #[case("CL1 prodotto", 1, 5.0)]
    #[case("Class 3", 3, 20.0)]
    fn class_maps_to_oe(#[case] note: &str, #[case] class: u8, #[case] oe: f64) {
        let e = parse(note);
        assert_eq!(e.oe_class, Some(class));
        assert_eq!(e.oe_estimate, Some(oe));
    }

    #[test]
    fn fp_qualitative_requires_fp_or_resa_context() {
        let e = parse("fp alla mano medio-alto, buona qualita generale");
        assert_eq!(e.fp_estimate, Some(700.0));
    }

    #[test]
    fn oe_from_indicators_only_when_no_class() {
        let e = parse("alta presenza di broken e fibre visibili");
        assert!(e.oe_class.is_none());
        assert!(e.oe_estimate.is_some());
    }

    #[test]
    fn class_takes_priority_over_indicator_text() {
        let e = parse("CL2, alta presenza di broken");
        assert_eq!(e.oe_class, Some(2));
        assert_eq!(e.oe_estimate, Some(12.0));
    }

    #[test]
    fn confidence_accumulates_per_field() {
        let e = parse("DC 35-40%, CL2, fp medio");
        assert!((e.confidence - 0.9).abs() < 1e-9);
    }
}
