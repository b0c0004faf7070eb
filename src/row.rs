//! Typed row adapter for tabular inventory ingestion.
//!
//! Replaces the implicit-coercion row-iterator pattern with explicit
//! `Option<T>`-returning accessors and a one-shot header alias pass, so a
//! caller that feeds legacy column names never leaks ambiguity into the
//! loader (C3).

use std::collections::HashMap;

/// A single inventory row: header (as given by the source) -> raw string
/// value, in source column order. Case is preserved; lookups normalize.
#[derive(Debug, Clone, Default)]
pub struct RawRow(pub Vec<(String, String)>);

impl RawRow {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.0.push((header.into(), value.into()));
    }

    fn raw(&self, header: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }
}

/// Maps legacy/duplicate source headers to the canonical column name.
/// Built once and reused across every row.
#[derive(Debug, Clone)]
pub struct ColumnAliasMap {
    aliases: HashMap<String, String>,
}

impl ColumnAliasMap {
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into().to_uppercase(), to.into());
        self
    }

    /// Resolves a source header to its canonical column name, falling back
    /// to the header itself when no alias is registered.
    pub fn resolve<'a>(&'a self, header: &'a str) -> &'a str {
        self.aliases
            .get(&header.to_uppercase())
            .map(String::as_str)
            .unwrap_or(header)
    }

    /// Normalizes a raw row's headers through this alias map. When two
    /// source headers resolve to the same canonical column, the first one
    /// encountered wins and the collision is reported to the caller.
    pub fn normalize(&self, row: &RawRow) -> (RawRow, Vec<String>) {
        let mut out = RawRow::new();
        let mut collisions = Vec::new();
        for (header, value) in &row.0 {
            let canonical = self.resolve(header);
            if out.0.iter().any(|(h, _)| h == canonical) {
                collisions.push(canonical.to_string());
                continue;
            }
            out.insert(canonical, value.clone());
        }
        (out, collisions)
    }
}

impl Default for ColumnAliasMap {
    /// The legacy Italian-header dialect this system's inventory exports
    /// have historically used.
    fn default() -> Self {
        Self::new()
            .with_alias("DISPONIBILE", "SCO_QTA")
            .with_alias("SCO_Qty", "SCO_QTA")
            .with_alias("LOT_PrezzoUnit", "SCO_COSTO_KG")
            .with_alias("SCO_Duck_Real", "SCO_Duck")
            .with_alias("LOT_DESC", "SCO_DESC")
            .with_alias("SCO_DC_Real", "SCO_DownCluster_Real")
            .with_alias("SCO_FP_Real", "SCO_FillPower_Real")
            .with_alias("SCO_DC_Nominal", "SCO_DownCluster_Nominal")
            .with_alias("SCO_FP_Nominal", "SCO_FillPower_Nominal")
            .with_alias("SCO_OE_Real", "SCO_OE")
            .with_alias("SCO_NOTE", "SCO_NOTE_LAB")
    }
}

/// Parses a numeric field, accepting `.` or `,` as the decimal separator
/// and treating empty strings or "nan" (any case) as missing.
pub fn get_f64(row: &RawRow, header: &str) -> Option<f64> {
    let raw = row.raw(header)?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return None;
    }
    let normalized = raw.replace(',', ".");
    normalized.parse::<f64>().ok()
}

/// Returns a trimmed string field, or `None` if absent/empty.
pub fn get_str(row: &RawRow, header: &str) -> Option<String> {
    let raw = row.raw(header)?.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("12.5", Some(12.5))]
    #[case("12,5", Some(12.5))]
    #[case("", None)]
    #[case("NaN", None)]
    #[case("nan", None)]
    #[case("abc", None)]
    fn parses_locale_numbers(#[case] raw: &str, #[case] expected: Option<f64>) {
        let mut row = RawRow::new();
        row.insert("SCO_Duck", raw);
        assert_eq!(get_f64(&row, "SCO_Duck"), expected);
    }

    #[test]
    fn alias_map_resolves_legacy_headers() {
        let map = ColumnAliasMap::default();
        let mut row = RawRow::new();
        row.insert("DISPONIBILE", "100");
        row.insert("LOT_PrezzoUnit", "3.5");

        let (normalized, collisions) = map.normalize(&row);
        assert!(collisions.is_empty());
        assert_eq!(get_f64(&normalized, "SCO_QTA"), Some(100.0));
        assert_eq!(get_f64(&normalized, "SCO_COSTO_KG"), Some(3.5));
    }

    #[test]
    fn colliding_aliases_report_and_keep_first() {
        let map = ColumnAliasMap::default();
        let mut row = RawRow::new();
        row.insert("DISPONIBILE", "100");
        row.insert("SCO_Qty", "200");

        let (normalized, collisions) = map.normalize(&row);
        assert_eq!(collisions, vec!["SCO_QTA".to_string()]);
        assert_eq!(get_f64(&normalized, "SCO_QTA"), Some(100.0));
    }
}
