//! Track finding as a QUBO: doublets → triplets/quadruplets → QUBO → tracks.
//!
//! Pipeline
//! - `graph`: index hits and doublets, expand triplets (QUBO variables) and
//!   quadruplets (inclusion couplers).
//! - `prune`: optional MaxPath or disjoint-set filtering of the graph.
//! - `weight`: per-triplet bias (constant, max-path, impact parameter).
//! - `qubo`: exclusion/inclusion couplers and the coefficient map.
//! - `recreate`: selected doublets back into disjoint tracks.
//! - `model`: the whole pipeline behind one type.
//!
//! API Policy
//! - This crate is project-internal. There is no stable public API; `api`
//!   re-exports the names most callers need.

pub mod api;
pub mod cfg;
pub mod dsets;
pub mod error;
pub mod geom;
pub mod graph;
pub mod model;
pub mod prune;
pub mod qubo;
pub mod recreate;
pub mod synth;
pub mod weight;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use cfg::Config;
pub use error::{Error, Result};
pub use model::Model;

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::cfg::Config;
    pub use crate::graph::{Hit, HitId};
    pub use crate::model::{Encoded, Model};
    pub use crate::prune::Pruning;
    pub use crate::qubo::{Qubo, QuboStats, Sample};
    pub use crate::weight::{ImpactCfg, Weighting};
}
