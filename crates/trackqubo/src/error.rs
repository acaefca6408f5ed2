//! Error taxonomy for the graph/QUBO pipeline.
//!
//! - `ConfigError`: unknown or out-of-range parameters, reported before any graph work.
//! - `InputError`: hit/doublet tables that cannot be indexed.
//! - `InvariantError`: broken internal adjacency; aborts the current event.
//!
//! Geometry anomalies (collinear hits, zero-length doublets) are not errors; they
//! are counted in `BuildStats`/`WeightTable` and logged.

use crate::graph::HitId;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown configuration key `{0}`")]
    UnknownKey(String),
    #[error("cannot parse value `{value}` for `{key}`")]
    Unparsable { key: String, value: String },
    #[error("`{key}` = {value} is out of range: {reason}")]
    OutOfRange {
        key: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("`{0}` does not apply to the active pruning/weighting strategy")]
    Inactive(String),
    #[error("unknown preset `{0}` (expected one of: base, mp, dj, d0, all)")]
    UnknownPreset(String),
}

/// Problems with the hit/doublet tables handed to the builder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("duplicate hit id {0}")]
    DuplicateHit(HitId),
    #[error("hit {0} has non-finite coordinates")]
    NonFiniteHit(HitId),
    #[error("doublet #{index} references unknown hit {hit}")]
    UnknownHit { index: usize, hit: HitId },
}

/// Internal invariant violations. These indicate a bug, not bad physics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantError {
    #[error("no quadruplet links triplets {t1} and {t2} of a connected component")]
    MissingQuadruplet { t1: String, t2: String },
    #[error("inclusion coupler ({a}, {b}) collides with an exclusion coupler")]
    CouplerCollision { a: String, b: String },
    #[error("disjoint-set component of size {0} (expected at least 2)")]
    UndersizedComponent(usize),
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantError),
}

pub type Result<T> = std::result::Result<T, Error>;
