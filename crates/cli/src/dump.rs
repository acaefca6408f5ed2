//! JSON dumps of a built model: the QUBO, the surviving xplets, and the build
//! statistics.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use trackqubo::api::{
    BuildStats, DoubletId, Encoded, Graph, ImpactParams, Model, QuboEntry, QuboStats, RejectReason,
    XpletKind,
};

#[derive(Serialize)]
struct QuboDump<'a> {
    stats: &'a QuboStats,
    entries: Vec<QuboEntry>,
}

#[derive(Serialize)]
struct TripletRow<'a> {
    key: &'a str,
    hits: [u64; 3],
    curvature: f64,
    drz: f64,
    weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    impact: Option<ImpactParams>,
}

#[derive(Serialize)]
struct QpletRow<'a> {
    key: &'a str,
    t1: &'a str,
    t2: &'a str,
    delta_curvature: f64,
    delta_rz: f64,
    holes: u32,
    strength: f64,
}

#[derive(Serialize)]
struct XpletDump<'a> {
    doublets: Vec<(u64, u64)>,
    triplets: Vec<TripletRow<'a>>,
    quadruplets: Vec<QpletRow<'a>>,
}

#[derive(Serialize)]
struct RejectCount {
    kind: XpletKind,
    reason: RejectReason,
    count: usize,
}

#[derive(Serialize)]
struct StatsDump<'a> {
    build: &'a BuildStats,
    rejected: Vec<RejectCount>,
}

fn xplets<'a>(graph: &'a Graph, enc: &Encoded) -> XpletDump<'a> {
    let w = &enc.weights;
    XpletDump {
        doublets: (0..graph.doublets.len())
            .map(|d| graph.doublet_ids(DoubletId(d)))
            .collect(),
        triplets: graph
            .triplets
            .iter()
            .enumerate()
            .map(|(k, t)| TripletRow {
                key: &t.key,
                hits: graph.hit_ids(&t.hits),
                curvature: t.curvature,
                drz: t.drz,
                weight: w.weights[k],
                path: w.paths.get(k).copied(),
                impact: w.impact.get(k).copied().flatten(),
            })
            .collect(),
        quadruplets: graph
            .quadruplets
            .iter()
            .map(|q| QpletRow {
                key: &q.key,
                t1: &graph.triplet(q.triplets[0]).key,
                t2: &graph.triplet(q.triplets[1]).key,
                delta_curvature: q.delta_curvature,
                delta_rz: q.delta_rz,
                holes: q.holes,
                strength: q.strength,
            })
            .collect(),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Write `qubo.json`, `xplets.json` and `stats.json` under `dir`.
pub fn dump_model(dir: &Path, model: &Model, enc: &Encoded) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let qubo_path = dir.join("qubo.json");
    write_json(
        &qubo_path,
        &QuboDump {
            stats: &enc.stats,
            entries: enc.qubo.entries(),
        },
    )?;
    let xplets_path = dir.join("xplets.json");
    write_json(&xplets_path, &xplets(model.graph(), enc))?;
    let stats_path = dir.join("stats.json");
    let stats = model.stats();
    write_json(
        &stats_path,
        &StatsDump {
            build: stats,
            rejected: stats
                .rejected
                .iter()
                .map(|(&(kind, reason), &count)| RejectCount {
                    kind,
                    reason,
                    count,
                })
                .collect(),
        },
    )?;
    Ok(vec![qubo_path, xplets_path, stats_path])
}
