// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # Blendforge — blend optimization engine
//!
//! Computes blended recipes from heterogeneous down/feather lot inventories
//! so the resulting mixture meets quality targets (Down Cluster %, Fill
//! Power, Duck %, max Other Elements) under categorical compatibility rules,
//! while minimizing a multi-criterion cost that rewards disposal of
//! lower-grade stock and preservation of premium stock.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use blendforge::{load_lots, optimize, BlendRequirement, ColumnAliasMap, OptimizeOptions};
//! use blendforge::events::NullSink;
//!
//! let (lots, row_errors) = load_lots(&rows, &ColumnAliasMap::default(), &NullSink);
//!
//! let req = BlendRequirement {
//!     dc_target: Some(80.0),
//!     quantity_kg: 2000.0,
//!     ..BlendRequirement::default()
//! }
//! .validated()?;
//!
//! let solutions = optimize(&req, &lots, &OptimizeOptions::default())?;
//! for solution in &solutions {
//!     println!("score={} dc={}", solution.score, solution.dc_avg);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  RawRow + ColumnAliasMap                                     │
//! │        │                                                     │
//! │        └──► load_lots (C3, uses C1 codes + C2 labnotes) ──► Lot │
//! │                                                              │
//! │  BlendRequirement + &[Lot]                                   │
//! │        │                                                     │
//! │        ├──► candidates::filter_and_rank (C5, uses C4 compat) │
//! │        ├──► combine::generate (C7, uses C6 allocate)         │
//! │        └──► evaluate::evaluate (C8) ──► BlendSolution        │
//! │                                                              │
//! │  optimize() orchestrates all of the above                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod allocate;
pub mod candidates;
pub mod codes;
pub mod combine;
pub mod compat;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod events;
pub mod labnotes;
pub mod lot;
pub mod optimize;
pub mod request;
pub mod row;
pub mod solution;

pub use allocate::LotAllocation;
pub use candidates::filter_and_rank;
pub use codes::{ArticleCode, Color, MaterialState, Species};
pub use combine::{CancellationToken, NeverCancel};
pub use config::{OperationalLimits, ScoringWeights, SearchParams, Tolerances, DEFAULT_SEED};
pub use error::{Error, OptimizerError, Result, RowError};
pub use evaluate::evaluate;
pub use events::{EventSink, LogSink, NullSink};
pub use labnotes::{parse as parse_lab_notes, LabEstimates};
pub use lot::{load_lots, Lot};
pub use optimize::{optimize, OptimizeOptions};
pub use request::BlendRequirement;
pub use row::{get_f64, get_str, ColumnAliasMap, RawRow};
pub use solution::{BlendSolution, BlendSolutionBuilder, LotShare};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
