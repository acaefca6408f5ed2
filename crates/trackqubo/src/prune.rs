//! Pruning strategies applied to a freshly built graph.
//!
//! Each strategy consumes the full graph and returns a compacted one; the
//! input arena is dropped. `None` keeps everything, including triplets that
//! take part in no quadruplet.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::dsets::DisjointSets;
use crate::error::{InvariantError, Result};
use crate::graph::{ChainLengths, Graph, QpletId, TripletId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pruning {
    /// Keep the full graph.
    None,
    /// Drop quadruplets whose longest chain (in quadruplets) is below the threshold.
    MaxPath { min_qplet_path: usize },
    /// Drop components of the triplet graph that consist of a single quadruplet.
    DisjointSets,
}

impl Pruning {
    /// Apply the strategy. Returns the pruned graph and the number of dropped
    /// quadruplets.
    pub fn prune(&self, graph: Graph) -> Result<(Graph, usize)> {
        let start = Instant::now();
        let n_before = graph.quadruplets.len();
        let out = match *self {
            Pruning::None => return Ok((graph, 0)),
            Pruning::MaxPath { min_qplet_path } => max_path(&graph, min_qplet_path),
            Pruning::DisjointSets => disjoint_sets(&graph)?,
        };
        let dropped = n_before - out.quadruplets.len();
        tracing::info!(
            strategy = ?self,
            doublets = out.doublets.len(),
            triplets = out.triplets.len(),
            quadruplets = out.quadruplets.len(),
            dropped,
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            "pruning done"
        );
        Ok((out, dropped))
    }
}

fn max_path(graph: &Graph, min_qplet_path: usize) -> Graph {
    let chains = ChainLengths::compute(graph);
    let keep: Vec<bool> = (0..graph.quadruplets.len())
        .map(|q| chains.qplet_path(graph, QpletId(q)) >= min_qplet_path)
        .collect();
    graph.retain_quadruplets(|q| keep[q.0])
}

fn disjoint_sets(graph: &Graph) -> Result<Graph> {
    let mut ds = DisjointSets::new(graph.chained_triplets());
    for q in &graph.quadruplets {
        let [t1, t2] = q.triplets;
        ds.merge(&t1, &t2);
    }
    let sets = ds.all_sets();
    let mut drop = vec![false; graph.quadruplets.len()];
    let mut n_small = 0usize;
    for set in &sets {
        match set.as_slice() {
            // Only triplets with a quadruplet partner are registered, so a
            // singleton set means the adjacency lists are out of sync.
            [_] => return Err(InvariantError::UndersizedComponent(set.len()).into()),
            [a, b] => {
                let q = graph
                    .find_quadruplet(*a, *b)
                    .ok_or_else(|| missing_quadruplet(graph, *a, *b))?;
                drop[q.0] = true;
                n_small += 1;
            }
            _ => {}
        }
    }
    tracing::debug!(sets = sets.len(), isolated = n_small, "disjoint sets computed");
    Ok(graph.retain_quadruplets(|q| !drop[q.0]))
}

fn missing_quadruplet(graph: &Graph, a: TripletId, b: TripletId) -> crate::error::Error {
    InvariantError::MissingQuadruplet {
        t1: graph.triplet(a).key.clone(),
        t2: graph.triplet(b).key.clone(),
    }
    .into()
}
