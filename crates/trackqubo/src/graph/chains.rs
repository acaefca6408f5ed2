//! Longest-chain lengths through the triplet/quadruplet DAG.
//!
//! Quadruplets always point outward in radius (t2 starts one hit further out
//! than t1), so sorting triplets by the radius of their first hit gives a
//! topological order. Both passes are iterative.

use super::types::{Graph, QpletId, TripletId};

/// Per-triplet chain lengths, counted in triplets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainLengths {
    /// Longest chain ending at the triplet (itself included).
    pub inner: Vec<usize>,
    /// Longest chain starting at the triplet (itself included).
    pub outer: Vec<usize>,
}

impl ChainLengths {
    pub fn compute(graph: &Graph) -> Self {
        let n = graph.triplets.len();
        let mut order: Vec<TripletId> = (0..n).map(TripletId).collect();
        order.sort_by(|a, b| {
            let ra = graph.hit(graph.triplet(*a).hits[0]).r;
            let rb = graph.hit(graph.triplet(*b).hits[0]).r;
            ra.total_cmp(&rb).then(a.cmp(b))
        });

        let mut inner = vec![1usize; n];
        for &t in &order {
            let best = graph
                .triplet(t)
                .inner
                .iter()
                .map(|&q| inner[graph.quadruplet(q).triplets[0].0])
                .max()
                .unwrap_or(0);
            inner[t.0] = best + 1;
        }
        let mut outer = vec![1usize; n];
        for &t in order.iter().rev() {
            let best = graph
                .triplet(t)
                .outer
                .iter()
                .map(|&q| outer[graph.quadruplet(q).triplets[1].0])
                .max()
                .unwrap_or(0);
            outer[t.0] = best + 1;
        }
        Self { inner, outer }
    }

    /// Longest chain through a triplet.
    #[inline]
    pub fn triplet_path(&self, t: TripletId) -> usize {
        self.inner[t.0] + self.outer[t.0] - 1
    }

    /// Longest chain through a quadruplet, counted in quadruplets.
    ///
    /// An isolated quadruplet has path length 1.
    #[inline]
    pub fn qplet_path(&self, graph: &Graph, q: QpletId) -> usize {
        let [t1, t2] = graph.quadruplet(q).triplets;
        self.inner[t1.0] + self.outer[t2.0] - 1
    }
}
