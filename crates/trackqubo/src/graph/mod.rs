//! Candidate graph: doublets → triplets → quadruplets.
//!
//! Purpose
//! - Index hits and accepted doublets, expand compatible doublet pairs into
//!   triplets (the QUBO variables), and link compatible triplet pairs into
//!   quadruplets (the inclusion couplers).
//! - Provide the compacting rebuild (`Graph::retain_quadruplets`) and the
//!   longest-chain lengths that the pruning and weighting strategies consume.
//!
//! Layout
//! - `types.rs` (arena records and diagnostics), `build.rs` (construction and
//!   compaction), `chains.rs` (iterative longest-path evaluation).

mod build;
mod chains;
mod types;

pub use build::build_graph;
pub use chains::ChainLengths;
pub use types::{
    xplet_name, BuildStats, Doublet, DoubletId, Graph, Hit, HitId, HitIdx, HitNode, QpletId,
    Quadruplet, RejectReason, Rejection, Triplet, TripletId, XpletKind,
};

#[cfg(test)]
mod tests;
