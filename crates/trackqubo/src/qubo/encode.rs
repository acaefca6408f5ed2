use std::time::Instant;

use crate::cfg::Config;
use crate::error::{InvariantError, Result};
use crate::graph::{xplet_name, DoubletId, Graph, TripletId};
use crate::weight::WeightTable;

use super::{Qubo, QuboStats};

/// Encode the (pruned) graph as a QUBO.
///
/// Order: biases, type-1 exclusions (two triplets using different doublets
/// that end, or start, at the same hit), type-2 exclusions (a triplet ending
/// at a hit and one starting there with no quadruplet bridging them), then
/// inclusion couplers. Exclusions never overwrite; an inclusion that lands on
/// an existing key is an invariant violation.
pub fn encode(graph: &Graph, weights: &WeightTable, cfg: &Config) -> Result<(Qubo, QuboStats)> {
    let start = Instant::now();
    let mut q = Qubo::new();
    let mut stats = QuboStats::default();

    for (t, w) in graph.triplets.iter().zip(&weights.weights) {
        q.insert_if_absent(&t.key, &t.key, *w);
    }
    stats.n_vars = q.len();

    let triplets_of = |d: DoubletId| -> Vec<TripletId> {
        let d = graph.doublet(d);
        d.inner.iter().chain(d.outer.iter()).copied().collect()
    };

    for node in &graph.hits {
        for conflicts in [&node.inner, &node.outer] {
            for (k, &d1) in conflicts.iter().enumerate() {
                for &d2 in &conflicts[k + 1..] {
                    let (ts1, ts2) = (triplets_of(d1), triplets_of(d2));
                    for &t1 in &ts1 {
                        for &t2 in &ts2 {
                            let (a, b) = (&graph.triplet(t1).key, &graph.triplet(t2).key);
                            if a == b {
                                tracing::warn!(triplet = %a, "triplet conflicts with itself");
                                continue;
                            }
                            if q.insert_if_absent(a, b, cfg.conflict_strength) {
                                stats.n_excl_type1 += 1;
                            }
                        }
                    }
                }
            }
        }

        for &t1 in &node.inner_tplets {
            for &t2 in &node.outer_tplets {
                let [a, b, h] = graph.hit_ids(&graph.triplet(t1).hits);
                let [_, c, d] = graph.hit_ids(&graph.triplet(t2).hits);
                let bridged = graph.qplet_keys.contains(&xplet_name(&[a, b, h, c]))
                    || graph.qplet_keys.contains(&xplet_name(&[b, h, c, d]));
                if bridged {
                    continue;
                }
                let (ka, kb) = (&graph.triplet(t1).key, &graph.triplet(t2).key);
                if q.insert_if_absent(ka, kb, cfg.conflict_strength) {
                    stats.n_excl_type2 += 1;
                }
            }
        }
    }
    stats.n_excl_couplers = stats.n_excl_type1 + stats.n_excl_type2;

    for qp in &graph.quadruplets {
        let [t1, t2] = qp.triplets;
        let (a, b) = (&graph.triplet(t1).key, &graph.triplet(t2).key);
        if !q.insert_if_absent(a, b, qp.strength) {
            return Err(InvariantError::CouplerCollision {
                a: a.clone(),
                b: b.clone(),
            }
            .into());
        }
        stats.n_incl_couplers += 1;
    }

    tracing::info!(
        size = q.len(),
        vars = stats.n_vars,
        excl = stats.n_excl_couplers,
        excl_type2 = stats.n_excl_type2,
        incl = stats.n_incl_couplers,
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        "qubo generated"
    );
    Ok((q, stats))
}
