//! Blend request specification.
//!
//! # Example
//!
//! ```rust,ignore
//! use blendforge::request::BlendRequirement;
//!
//! let req = BlendRequirement {
//!     dc_target: Some(80.0),
//!     quantity_kg: 2000.0,
//!     ..BlendRequirement::default()
//! };
//! req.validate()?;
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::codes::{self, Color, MaterialState, Species};
use crate::error::OptimizerError;

/// A request for a blended recipe meeting quality targets under categorical
/// constraints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BlendRequirement {
    /// When set, parsed by C1 and takes priority over the individual
    /// `species`/`color`/`state` fields below.
    #[serde(default)]
    pub product_code: Option<String>,

    #[serde(default)]
    pub species: Option<Species>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub state: Option<MaterialState>,
    #[serde(default)]
    pub water_repellent: Option<bool>,

    #[serde(default)]
    pub dc_target: Option<f64>,
    #[serde(default)]
    pub fp_target: Option<f64>,
    #[serde(default)]
    pub duck_target: Option<f64>,
    #[serde(default)]
    pub max_oe: Option<f64>,

    #[serde(default = "default_dc_tolerance")]
    pub dc_tolerance: f64,
    #[serde(default = "default_fp_tolerance")]
    pub fp_tolerance: f64,
    #[serde(default = "default_duck_tolerance")]
    pub duck_tolerance: f64,

    #[serde(default = "default_true")]
    pub exclude_raw_materials: bool,
    #[serde(default)]
    pub allow_estimated: bool,

    pub quantity_kg: f64,

    #[serde(default = "default_num_solutions")]
    pub num_solutions: usize,
    #[serde(default = "default_max_lots")]
    pub max_lots: usize,
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
fn default_true() -> bool {
    true
}
fn default_num_solutions() -> usize {
    3
}
fn default_max_lots() -> usize {
    10
}

impl Default for BlendRequirement {
    fn default() -> Self {
        Self {
            product_code: None,
            species: None,
            color: None,
            state: None,
            water_repellent: None,
            dc_target: None,
            fp_target: None,
            duck_target: None,
            max_oe: None,
            dc_tolerance: default_dc_tolerance(),
            fp_tolerance: default_fp_tolerance(),
            duck_tolerance: default_duck_tolerance(),
            exclude_raw_materials: default_true(),
            allow_estimated: false,
            quantity_kg: 0.0,
            num_solutions: default_num_solutions(),
            max_lots: default_max_lots(),
        }
    }
}

impl BlendRequirement {
    /// Resolves `product_code`, if present, into the categorical fields,
    /// and validates every range constraint. Returns the resolved request
    /// (so a caller can inspect what a product code decoded to) or an
    /// `InvalidRequest` error naming the first violated constraint.
    pub fn validated(mut self) -> Result<Self, OptimizerError> {
        if let Some(pc) = &self.product_code {
            let code = codes::parse(pc);
            if !code.is_valid() {
                return Err(OptimizerError::InvalidRequest(format!(
                    "product_code '{pc}' did not decode to a valid state/species/color"
                )));
            }
            self.state = code.state;
            self.species = code.species;
            self.color = code.color;
        }

        if self.quantity_kg <= 0.0 {
            return Err(OptimizerError::InvalidRequest(
                "quantity_kg must be positive".into(),
            ));
        }
        if !(1..=10).contains(&self.num_solutions) {
            return Err(OptimizerError::InvalidRequest(
                "num_solutions must be in 1..=10".into(),
            ));
        }
        if !(2..=15).contains(&self.max_lots) {
            return Err(OptimizerError::InvalidRequest(
                "max_lots must be in 2..=15".into(),
            ));
        }
        for (name, value) in [
            ("dc_target", self.dc_target),
            ("duck_target", self.duck_target),
            ("max_oe", self.max_oe),
        ] {
            if let Some(v) = value {
                if !(0.0..=100.0).contains(&v) {
                    return Err(OptimizerError::InvalidRequest(format!(
                        "{name} must be within [0,100], got {v}"
                    )));
                }
            }
        }
        if let Some(fp) = self.fp_target {
            if fp < 0.0 {
                return Err(OptimizerError::InvalidRequest(
                    "fp_target must be non-negative".into(),
                ));
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_code_overrides_categorical_fields() {
        let req = BlendRequirement {
            product_code: Some("PAPW".to_string()),
            quantity_kg: 1000.0,
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(req.state, Some(MaterialState::P));
        assert_eq!(req.species, Some(Species::A));
        assert_eq!(req.color, Some(Color::Pw));
    }

    #[test]
    fn invalid_product_code_is_rejected() {
        let result = BlendRequirement {
            product_code: Some("ZZZZ".to_string()),
            quantity_kg: 1000.0,
            ..Default::default()
        }
        .validated();
        assert!(result.is_err());
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let result = BlendRequirement {
            quantity_kg: 0.0,
            ..Default::default()
        }
        .validated();
        assert!(matches!(result, Err(OptimizerError::InvalidRequest(_))));
    }

    #[test]
    fn out_of_range_target_is_rejected() {
        let result = BlendRequirement {
            quantity_kg: 1000.0,
            dc_target: Some(150.0),
            ..Default::default()
        }
        .validated();
        assert!(result.is_err());
    }
}
