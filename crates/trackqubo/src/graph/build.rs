//! Graph construction: hit index, triplet expansion, quadruplet linking, and
//! the compacting rebuild used by the pruning strategies.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::cfg::Config;
use crate::error::{InputError, Result};
use crate::geom::signed_curvature;

use super::types::{
    xplet_name, BuildStats, Doublet, DoubletId, Graph, Hit, HitId, HitIdx, HitNode, QpletId,
    Quadruplet, RejectReason, Triplet, TripletId, XpletKind,
};

/// Doublets whose radii differ by less than this are treated as zero-length.
const MIN_DOUBLET_DR: f64 = 1e-9;

/// Build the full candidate graph from hits and accepted doublets.
///
/// Doublets may be given in either orientation; they are stored inner → outer.
/// Geometry anomalies are counted in the returned `BuildStats`; malformed input
/// (unknown or duplicate hit ids, non-finite coordinates) is an error.
pub fn build_graph(
    hits: &[Hit],
    doublets: &[(HitId, HitId)],
    cfg: &Config,
) -> Result<(Graph, BuildStats)> {
    let start = Instant::now();
    let mut b = GraphBuilder::new(cfg);
    b.index_hits(hits)?;
    b.create_doublets(doublets)?;
    b.create_triplets();
    b.create_quadruplets();
    let GraphBuilder {
        graph, mut stats, ..
    } = b;
    stats.n_hits = graph.hits.len();
    stats.n_doublets = graph.doublets.len();
    stats.n_triplets = graph.triplets.len();
    stats.n_quadruplets = graph.quadruplets.len();
    tracing::info!(
        hits = stats.n_hits,
        doublets = stats.n_doublets,
        triplets = stats.n_triplets,
        quadruplets = stats.n_quadruplets,
        rejected_triplets = stats.rejected_count(XpletKind::Triplet),
        rejected_qplets = stats.rejected_count(XpletKind::Quadruplet),
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        "graph built"
    );
    Ok((graph, stats))
}

/// Builder carrying the config, the arena under construction, and counters.
struct GraphBuilder<'a> {
    cfg: &'a Config,
    graph: Graph,
    stats: BuildStats,
    by_id: HashMap<HitId, HitIdx>,
}

impl<'a> GraphBuilder<'a> {
    fn new(cfg: &'a Config) -> Self {
        Self {
            cfg,
            graph: Graph::default(),
            stats: BuildStats::default(),
            by_id: HashMap::new(),
        }
    }

    fn index_hits(&mut self, hits: &[Hit]) -> Result<()> {
        self.graph.hits.reserve(hits.len());
        for hit in hits {
            if !(hit.x.is_finite() && hit.y.is_finite() && hit.z.is_finite()) {
                return Err(InputError::NonFiniteHit(hit.id).into());
            }
            let idx = HitIdx(self.graph.hits.len());
            if self.by_id.insert(hit.id, idx).is_some() {
                return Err(InputError::DuplicateHit(hit.id).into());
            }
            self.graph.hits.push(HitNode::new(*hit));
        }
        Ok(())
    }

    fn lookup(&self, index: usize, hit: HitId) -> Result<HitIdx> {
        self.by_id
            .get(&hit)
            .copied()
            .ok_or_else(|| InputError::UnknownHit { index, hit }.into())
    }

    fn create_doublets(&mut self, doublets: &[(HitId, HitId)]) -> Result<()> {
        let mut seen: HashSet<(HitIdx, HitIdx)> = HashSet::with_capacity(doublets.len());
        for (index, &(a, b)) in doublets.iter().enumerate() {
            let (mut h1, mut h2) = (self.lookup(index, a)?, self.lookup(index, b)?);
            if self.graph.hits[h1.0].r > self.graph.hits[h2.0].r {
                std::mem::swap(&mut h1, &mut h2);
            }
            let (n1, n2) = (&self.graph.hits[h1.0], &self.graph.hits[h2.0]);
            let dr = n2.r - n1.r;
            if dr < MIN_DOUBLET_DR {
                tracing::debug!(a, b, dr, "zero-length doublet skipped");
                let key = xplet_name(&[n1.hit.id, n2.hit.id]);
                self.stats
                    .reject(XpletKind::Doublet, key, RejectReason::ZeroLength, dr);
                continue;
            }
            if !seen.insert((h1, h2)) {
                let key = xplet_name(&[n1.hit.id, n2.hit.id]);
                self.stats
                    .reject(XpletKind::Doublet, key, RejectReason::Duplicate, 0.0);
                continue;
            }
            let dz = n2.hit.z - n1.hit.z;
            let id = DoubletId(self.graph.doublets.len());
            self.graph.doublets.push(Doublet {
                hits: [h1, h2],
                dz,
                dr,
                rz_angle: dr.atan2(dz),
                inner: Vec::new(),
                outer: Vec::new(),
            });
            self.graph.hits[h1.0].outer.push(id);
            self.graph.hits[h2.0].inner.push(id);
        }
        Ok(())
    }

    /// For every hit, pair each incoming doublet with each outgoing doublet.
    fn create_triplets(&mut self) {
        for h in 0..self.graph.hits.len() {
            let incoming = self.graph.hits[h].inner.clone();
            let outgoing = self.graph.hits[h].outer.clone();
            for &d1 in &incoming {
                for &d2 in &outgoing {
                    self.try_triplet(d1, d2);
                }
            }
        }
    }

    fn try_triplet(&mut self, d1: DoubletId, d2: DoubletId) {
        let g = &self.graph;
        let (da, db) = (&g.doublets[d1.0], &g.doublets[d2.0]);
        debug_assert_eq!(da.hits[1], db.hits[0], "triplet doublets must share a hit");
        let hits = [da.hits[0], da.hits[1], db.hits[1]];
        let key = xplet_name(&g.hit_ids(&hits));
        if g.triplet_index.contains_key(&key) {
            return;
        }
        let [n0, n1, n2] = hits.map(|h| &g.hits[h.0]);
        if !(n0.r < n1.r && n1.r < n2.r) {
            self.stats
                .reject(XpletKind::Triplet, key, RejectReason::RadiusOrder, n1.r);
            return;
        }
        let Some(curvature) =
            signed_curvature(n0.hit.coord_2d(), n1.hit.coord_2d(), n2.hit.coord_2d())
        else {
            self.stats
                .reject(XpletKind::Triplet, key, RejectReason::Degenerate, 0.0);
            return;
        };
        if curvature.abs() > self.cfg.tplet_max_curv {
            self.stats
                .reject(XpletKind::Triplet, key, RejectReason::Curvature, curvature);
            return;
        }
        let drz = (da.rz_angle - db.rz_angle).abs();
        if drz > self.cfg.tplet_max_drz {
            self.stats
                .reject(XpletKind::Triplet, key, RejectReason::Drz, drz);
            return;
        }
        let id = TripletId(self.graph.triplets.len());
        self.graph.triplet_index.insert(key.clone(), id);
        self.graph.triplets.push(Triplet {
            key,
            hits,
            doublets: [d1, d2],
            curvature,
            drz,
            inner: Vec::new(),
            outer: Vec::new(),
        });
        self.graph.doublets[d1.0].outer.push(id);
        self.graph.doublets[d2.0].inner.push(id);
        self.graph.hits[hits[0].0].outer_tplets.push(id);
        self.graph.hits[hits[2].0].inner_tplets.push(id);
    }

    /// For every triplet, pair it with each triplet starting on its last doublet.
    fn create_quadruplets(&mut self) {
        for t in 0..self.graph.triplets.len() {
            let t1 = TripletId(t);
            let shared = self.graph.triplets[t].doublets[1];
            let nexts = self.graph.doublets[shared.0].outer.clone();
            for t2 in nexts {
                self.try_quadruplet(t1, t2);
            }
        }
    }

    fn try_quadruplet(&mut self, t1: TripletId, t2: TripletId) {
        let g = &self.graph;
        let (ta, tb) = (&g.triplets[t1.0], &g.triplets[t2.0]);
        let hits = [ta.hits[0], ta.hits[1], ta.hits[2], tb.hits[2]];
        let key = xplet_name(&g.hit_ids(&hits));
        let delta_curvature = (ta.curvature - tb.curvature).abs();
        if delta_curvature > self.cfg.qplet_max_dcurv {
            self.stats.reject(
                XpletKind::Quadruplet,
                key,
                RejectReason::DeltaCurvature,
                delta_curvature,
            );
            return;
        }
        let first = &g.doublets[ta.doublets[0].0];
        let last = &g.doublets[tb.doublets[1].0];
        let delta_rz = (first.rz_angle - last.rz_angle).abs();
        let holes = match (
            g.hits[hits[0].0].hit.volayer,
            g.hits[hits[3].0].hit.volayer,
        ) {
            (Some(a), Some(b)) => b.abs_diff(a).saturating_sub(3),
            _ => 0,
        };
        let strength = coupling_strength(self.cfg, delta_curvature, delta_rz, holes);
        if !(strength <= self.cfg.qplet_max_strength) {
            self.stats
                .reject(XpletKind::Quadruplet, key, RejectReason::Strength, strength);
            return;
        }
        let id = QpletId(self.graph.quadruplets.len());
        self.graph.qplet_keys.insert(key.clone());
        self.graph.quadruplets.push(Quadruplet {
            key,
            hits,
            triplets: [t1, t2],
            delta_curvature,
            delta_rz,
            holes,
            strength,
        });
        self.graph.triplets[t1.0].outer.push(id);
        self.graph.triplets[t2.0].inner.push(id);
    }
}

/// Inclusion strength from curvature continuity, rz continuity and holes.
///
/// Both continuity terms are 1 for a perfect chain and fall towards 0 at the
/// cut values; the result is scaled by `num_multiplier` (negative = reward).
pub(crate) fn coupling_strength(cfg: &Config, dcurv: f64, drz: f64, holes: u32) -> f64 {
    let xy = 1.0 - (dcurv / cfg.qplet_max_dcurv).powf(cfg.xy_power);
    let rz = 1.0 - (drz / (2.0 * cfg.tplet_max_drz)).powf(cfg.rz_power);
    let w = cfg.xy_relative_strength;
    let continuity = w * xy + (1.0 - w) * rz;
    cfg.num_multiplier * continuity / (1.0 + holes as f64).powf(cfg.volayer_power)
}

impl Graph {
    /// Compact copy keeping only the given quadruplets, their triplets, and the
    /// doublets/hits those triplets use. Adjacency is rebuilt from scratch.
    pub fn retain_quadruplets(&self, keep: impl Fn(QpletId) -> bool) -> Graph {
        let mut out = Graph::default();
        let mut hit_map: HashMap<HitIdx, HitIdx> = HashMap::new();
        let mut doublet_map: HashMap<DoubletId, DoubletId> = HashMap::new();
        let mut triplet_map: HashMap<TripletId, TripletId> = HashMap::new();

        let mut intern_hit = |out: &mut Graph, h: HitIdx| -> HitIdx {
            *hit_map.entry(h).or_insert_with(|| {
                out.hits.push(HitNode::new(self.hits[h.0].hit));
                HitIdx(out.hits.len() - 1)
            })
        };
        let mut intern_doublet = |out: &mut Graph, d: DoubletId| -> DoubletId {
            if let Some(&nd) = doublet_map.get(&d) {
                return nd;
            }
            let src = &self.doublets[d.0];
            let hits = [intern_hit(out, src.hits[0]), intern_hit(out, src.hits[1])];
            let nd = DoubletId(out.doublets.len());
            out.doublets.push(Doublet {
                hits,
                inner: Vec::new(),
                outer: Vec::new(),
                ..src.clone()
            });
            out.hits[hits[0].0].outer.push(nd);
            out.hits[hits[1].0].inner.push(nd);
            doublet_map.insert(d, nd);
            nd
        };
        let mut intern_triplet = |out: &mut Graph, t: TripletId| -> TripletId {
            if let Some(&nt) = triplet_map.get(&t) {
                return nt;
            }
            let src = &self.triplets[t.0];
            let d1 = intern_doublet(out, src.doublets[0]);
            let d2 = intern_doublet(out, src.doublets[1]);
            let hits = [
                out.doublets[d1.0].hits[0],
                out.doublets[d1.0].hits[1],
                out.doublets[d2.0].hits[1],
            ];
            let nt = TripletId(out.triplets.len());
            out.triplet_index.insert(src.key.clone(), nt);
            out.triplets.push(Triplet {
                hits,
                doublets: [d1, d2],
                inner: Vec::new(),
                outer: Vec::new(),
                ..src.clone()
            });
            out.doublets[d1.0].outer.push(nt);
            out.doublets[d2.0].inner.push(nt);
            out.hits[hits[0].0].outer_tplets.push(nt);
            out.hits[hits[2].0].inner_tplets.push(nt);
            triplet_map.insert(t, nt);
            nt
        };

        for (q, src) in self.quadruplets.iter().enumerate() {
            if !keep(QpletId(q)) {
                continue;
            }
            let t1 = intern_triplet(&mut out, src.triplets[0]);
            let t2 = intern_triplet(&mut out, src.triplets[1]);
            let nq = QpletId(out.quadruplets.len());
            let hits = [
                out.triplets[t1.0].hits[0],
                out.triplets[t1.0].hits[1],
                out.triplets[t1.0].hits[2],
                out.triplets[t2.0].hits[2],
            ];
            out.qplet_keys.insert(src.key.clone());
            out.quadruplets.push(Quadruplet {
                hits,
                triplets: [t1, t2],
                ..src.clone()
            });
            out.triplets[t1.0].outer.push(nq);
            out.triplets[t2.0].inner.push(nq);
        }
        out
    }
}
