//! End-to-end model: validated config → graph → pruning → weights → QUBO,
//! and the way back from a solver sample to tracks.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::cfg::Config;
use crate::error::Result;
use crate::graph::{build_graph, BuildStats, Graph, Hit, HitId};
use crate::qubo::{encode, Qubo, QuboStats, Sample};
use crate::recreate::{recreate_tracks, Recreated};
use crate::weight::WeightTable;

/// A built (and pruned) model for one event.
#[derive(Clone, Debug)]
pub struct Model {
    cfg: Config,
    graph: Graph,
    stats: BuildStats,
}

/// Everything `Model::to_qubo` produces.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    pub qubo: Qubo,
    pub stats: QuboStats,
    pub weights: WeightTable,
}

/// Summary of a processed sample.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleReport {
    pub n_selected: usize,
    pub energy: f64,
    pub recreated: Recreated,
}

impl Model {
    /// Validate the config, build the graph, and apply the pruning strategy.
    pub fn build(cfg: Config, hits: &[Hit], doublets: &[(HitId, HitId)]) -> Result<Self> {
        cfg.validate()?;
        let (graph, mut stats) = build_graph(hits, doublets, &cfg)?;
        let (graph, dropped) = cfg.pruning.prune(graph)?;
        stats.dropped_qplets = dropped;
        Ok(Self { cfg, graph, stats })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn weights(&self) -> WeightTable {
        self.cfg.weighting.compute_weights(&self.graph)
    }

    pub fn to_qubo(&self) -> Result<Encoded> {
        let weights = self.weights();
        let (qubo, stats) = encode(&self.graph, &weights, &self.cfg)?;
        Ok(Encoded {
            qubo,
            stats,
            weights,
        })
    }

    /// Doublets of every triplet set to 1, deduplicated and sorted.
    pub fn sample_to_doublets(&self, sample: &Sample) -> Vec<(HitId, HitId)> {
        let mut out = BTreeSet::new();
        for t in &self.graph.triplets {
            if sample.get(&t.key).copied().unwrap_or(0) == 0 {
                continue;
            }
            for &d in &t.doublets {
                out.insert(self.graph.doublet_ids(d));
            }
        }
        out.into_iter().collect()
    }

    /// Selected doublets → tracks.
    pub fn process_sample(&self, sample: &Sample) -> Recreated {
        recreate_tracks(&self.sample_to_doublets(sample))
    }

    /// Like `process_sample`, plus the sample's energy under `qubo`.
    pub fn report_sample(&self, qubo: &Qubo, sample: &Sample) -> SampleReport {
        SampleReport {
            n_selected: sample.values().filter(|&&v| v != 0).count(),
            energy: qubo.energy(sample),
            recreated: self.process_sample(sample),
        }
    }

    /// Sample selecting exactly the triplets made of consecutive hits of the
    /// given tracks; every other variable is 0.
    pub fn ideal_sample(&self, tracks: &[Vec<HitId>]) -> Sample {
        let pairs: HashSet<(HitId, HitId)> = tracks
            .iter()
            .flat_map(|t| t.windows(2).map(|w| (w[0], w[1])))
            .collect();
        self.graph
            .triplets
            .iter()
            .map(|t| {
                let on = t
                    .doublets
                    .iter()
                    .all(|&d| pairs.contains(&self.graph.doublet_ids(d)));
                (t.key.clone(), u8::from(on))
            })
            .collect()
    }
}
