//! Lot loader & imputer (C3).
//!
//! Normalizes tabular rows into canonical [`Lot`] records, applying the
//! imputation chain (lab notes -> nominal declaration -> species default)
//! and flagging which fields were inferred rather than measured.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::codes::{self, ArticleCode, Species};
use crate::compat;
use crate::error::RowError;
use crate::events::EventSink;
use crate::labnotes;
use crate::row::{self, ColumnAliasMap, RawRow};

/// A single inventory item, normalized and (partially) imputed.
///
/// Constructed once by [`load_lots`]; nothing past construction mutates a
/// `Lot`, so it can be freely shared as `&[Lot]` through the search.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Lot {
    pub article_code_raw: String,
    pub lot_code: String,
    pub description: Option<String>,

    #[serde(skip)]
    pub code: ArticleCode,

    pub dc_real: Option<f64>,
    pub fp_real: Option<f64>,
    pub duck_real: Option<f64>,
    pub other_elements_real: Option<f64>,
    pub feather_real: Option<f64>,
    pub oxygen_real: Option<f64>,
    pub turbidity_real: Option<f64>,
    pub total_fibres: Option<f64>,
    pub broken: Option<f64>,
    pub landfowl: Option<f64>,

    pub dc_nominal: Option<f64>,
    pub fp_nominal: Option<f64>,
    pub quality_nominal: Option<String>,
    pub standard_nominal: Option<String>,

    pub available_kg: f64,
    pub cost_per_kg: Option<f64>,

    pub dc_was_imputed: bool,
    pub fp_was_imputed: bool,
}

impl Lot {
    /// Derived: the measurement imputation the scorer cares about. FP
    /// imputation alone does not make a lot "estimated" — DC is the
    /// parameter the whole system is built around.
    pub fn is_estimated(&self) -> bool {
        self.dc_was_imputed
    }

    /// `true` iff this lot has enough data to be used in a blend at all.
    pub fn has_sufficient_data(&self) -> bool {
        self.dc_real.is_some()
    }

    pub fn is_water_repellent(&self) -> bool {
        compat::is_water_repellent(&self.code, self.quality_nominal.as_deref())
    }

    /// Disposal/preservation quality score: higher means "dispose of this
    /// first". Shared between the candidate ranker (C5) and the blend
    /// scorer (C8).
    pub fn quality_score(&self) -> f64 {
        let mut score = 0.0;
        if let Some(dc) = self.dc_real {
            score += (100.0 - dc) * 2.0;
        }
        if let Some(duck) = self.duck_real {
            score += duck * 1.5;
        }
        if let Some(oe) = self.other_elements_real {
            score += oe * 3.0;
        }
        if let Some(feather) = self.feather_real {
            score += feather * 1.0;
        }
        if let Some(fibres) = self.total_fibres {
            score += fibres * 2.0;
        }
        if let Some(broken) = self.broken {
            score += broken * 1.5;
        }
        if let Some(landfowl) = self.landfowl {
            score += landfowl * 2.0;
        }
        if self.is_estimated() {
            score -= 50.0;
        }
        score
    }
}

const SCO_ART: &str = "SCO_ART";
const SCO_LOTT: &str = "SCO_LOTT";
const SCO_DESC: &str = "SCO_DESC";
const SCO_DC_REAL: &str = "SCO_DownCluster_Real";
const SCO_FP_REAL: &str = "SCO_FillPower_Real";
const SCO_DUCK: &str = "SCO_Duck";
const SCO_OE: &str = "SCO_OE";
const SCO_FEATHER: &str = "SCO_Feather";
const SCO_OXYGEN: &str = "SCO_Oxygen";
const SCO_TURBIDITY: &str = "SCO_Turbidity";
const SCO_TOTAL_FIBRES: &str = "SCO_TotalFibres";
const SCO_BROKEN: &str = "SCO_Broken";
const SCO_LANDFOWL: &str = "SCO_Landfowl";
const SCO_DC_NOMINAL: &str = "SCO_DownCluster_Nominal";
const SCO_FP_NOMINAL: &str = "SCO_FillPower_Nominal";
const SCO_STANDARD_NOMINAL: &str = "SCO_Standard_Nominal";
const SCO_QUALITA: &str = "SCO_QUALITA";
const SCO_QTA: &str = "SCO_QTA";
const SCO_COSTO_KG: &str = "SCO_COSTO_KG";
const SCO_NOTE_LAB: &str = "SCO_NOTE_LAB";

const PERCENTAGE_FIELDS: &[&str] = &[
    SCO_DC_REAL,
    SCO_FP_REAL,
    SCO_DUCK,
    SCO_OE,
    SCO_FEATHER,
    SCO_DC_NOMINAL,
];

/// Loads an inventory table into canonical [`Lot`]s, applying header
/// aliasing, numeric coercion, percentage validation, and the imputation
/// chain. Returns the valid lots plus one [`RowError`] per rejected row.
/// Rows with no identity (blank article code or lot code) are skipped
/// silently — an intentionally blank row is not a data error.
pub fn load_lots(
    rows: &[RawRow],
    aliases: &ColumnAliasMap,
    sink: &dyn EventSink,
) -> (Vec<Lot>, Vec<RowError>) {
    let mut lots = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw) in rows.iter().enumerate() {
        let (row, collisions) = aliases.normalize(raw);
        for column in collisions {
            sink.warn(
                "duplicate_column_after_aliasing",
                &[("row", &idx.to_string()), ("column", &column)],
            );
        }

        let article_code_raw = match row::get_str(&row, SCO_ART) {
            Some(v) => v,
            None => continue,
        };
        let lot_code = match row::get_str(&row, SCO_LOTT) {
            Some(v) => v,
            None => continue,
        };

        if let Some(err) = validate_percentages(&row, idx) {
            errors.push(err);
            continue;
        }

        let code = codes::parse(&article_code_raw);
        let lab_note = row::get_str(&row, SCO_NOTE_LAB);
        let lab_estimates = lab_note.as_deref().map(labnotes::parse);

        let mut lot = Lot {
            article_code_raw,
            lot_code,
            description: row::get_str(&row, SCO_DESC),
            code,
            dc_real: row::get_f64(&row, SCO_DC_REAL),
            fp_real: row::get_f64(&row, SCO_FP_REAL),
            duck_real: row::get_f64(&row, SCO_DUCK),
            other_elements_real: row::get_f64(&row, SCO_OE),
            feather_real: row::get_f64(&row, SCO_FEATHER),
            oxygen_real: row::get_f64(&row, SCO_OXYGEN),
            turbidity_real: row::get_f64(&row, SCO_TURBIDITY),
            total_fibres: row::get_f64(&row, SCO_TOTAL_FIBRES),
            broken: row::get_f64(&row, SCO_BROKEN),
            landfowl: row::get_f64(&row, SCO_LANDFOWL),
            dc_nominal: row::get_f64(&row, SCO_DC_NOMINAL),
            fp_nominal: row::get_f64(&row, SCO_FP_NOMINAL),
            quality_nominal: row::get_str(&row, SCO_QUALITA),
            standard_nominal: row::get_str(&row, SCO_STANDARD_NOMINAL),
            available_kg: row::get_f64(&row, SCO_QTA).unwrap_or(0.0),
            cost_per_kg: row::get_f64(&row, SCO_COSTO_KG),
            dc_was_imputed: false,
            fp_was_imputed: false,
        };

        impute(&mut lot, lab_estimates.as_ref());

        if !lot.has_sufficient_data() {
            sink.info(
                "row_dropped_insufficient_data",
                &[("row", &idx.to_string()), ("lot_code", &lot.lot_code)],
            );
            continue;
        }

        lots.push(lot);
    }

    (lots, errors)
}

fn validate_percentages(row: &RawRow, idx: usize) -> Option<RowError> {
    for field in PERCENTAGE_FIELDS {
        if let Some(v) = row::get_f64(row, field) {
            if !(0.0..=100.0).contains(&v) {
                return Some(RowError {
                    row: idx,
                    field: (*field).to_string(),
                    reason: format!("value {v} out of range [0,100]"),
                });
            }
        }
    }
    None
}

/// Applies the imputation chain in order: lab-notes DC, then nominal DC;
/// lab-notes FP, then nominal FP; species default for duck content.
fn impute(lot: &mut Lot, lab_estimates: Option<&labnotes::LabEstimates>) {
    if lot.dc_real.is_none() || lot.dc_real == Some(0.0) {
        if let Some(est) = lab_estimates.and_then(|e| e.dc_estimate) {
            lot.dc_real = Some(est);
            lot.dc_was_imputed = true;
            if lot.other_elements_real.is_none() || lot.other_elements_real == Some(0.0) {
                if let Some(oe) = lab_estimates.and_then(|e| e.oe_estimate) {
                    lot.other_elements_real = Some(oe);
                }
            }
        } else if let Some(nominal) = lot.dc_nominal {
            if nominal > 0.0 {
                lot.dc_real = Some(nominal);
                lot.dc_was_imputed = true;
            }
        }
    }

    if lot.fp_real.is_none() || lot.fp_real == Some(0.0) {
        if let Some(est) = lab_estimates.and_then(|e| e.fp_estimate) {
            lot.fp_real = Some(est);
            lot.fp_was_imputed = true;
        } else if let Some(nominal) = lot.fp_nominal {
            if nominal > 0.0 {
                lot.fp_real = Some(nominal);
                lot.fp_was_imputed = true;
            }
        }
    }

    let duck_missing = lot.duck_real.is_none() || lot.duck_real == Some(0.0);
    if duck_missing {
        lot.duck_real = match lot.code.species {
            Some(Species::A) => Some(100.0),
            Some(Species::O) => lot.duck_real.or(Some(0.0)),
            Some(Species::OA) => Some(50.0),
            _ => lot.duck_real,
        };
    }
}
