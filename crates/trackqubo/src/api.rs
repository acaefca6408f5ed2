//! Curated internal API (UNSTABLE).
//!
//! Not a public API. A convenience surface for the CLI, benches and
//! experiments; breaking changes are allowed.

// Configuration and errors
pub use crate::cfg::Config;
pub use crate::error::{ConfigError, Error, InputError, InvariantError, Result};
// Graph
pub use crate::graph::{
    build_graph, xplet_name, BuildStats, ChainLengths, DoubletId, Graph, Hit, HitId, QpletId,
    RejectReason, Rejection, TripletId, XpletKind,
};
// Strategies
pub use crate::prune::Pruning;
pub use crate::weight::{ImpactCfg, ImpactParams, WeightTable, Weighting};
// QUBO
pub use crate::qubo::{encode, Qubo, QuboEntry, QuboStats, Sample};
// Pipeline and post-processing
pub use crate::model::{Encoded, Model, SampleReport};
pub use crate::recreate::{recreate_tracks, Recreated, DEFAULT_MIN_HITS_PER_TRACK};
// Synthetic events
pub use crate::synth::{draw_event, EventToken, SynthCfg, SynthEvent};
