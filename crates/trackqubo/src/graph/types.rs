//! Data types for the candidate graph (hits, doublets, triplets, quadruplets).
//!
//! Arena layout: every xplet lives in a `Vec` on `Graph` and is addressed by a
//! typed index. Back-references (`inner`/`outer`, per-hit adjacency) are index
//! lists, so pruning can rebuild a graph without dangling references.

use std::collections::{BTreeMap, HashMap, HashSet};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// External hit identifier (as found in the input tables).
pub type HitId = u64;

/// Identifier types for arena slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HitIdx(pub usize);
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoubletId(pub usize);
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripletId(pub usize);
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QpletId(pub usize);

/// Canonical xplet name: hit ids joined by `_` (e.g. `12_40_77`).
pub fn xplet_name(ids: &[HitId]) -> String {
    let mut out = String::with_capacity(ids.len() * 8);
    for (k, id) in ids.iter().enumerate() {
        if k > 0 {
            out.push('_');
        }
        out.push_str(&id.to_string());
    }
    out
}

/// One detector measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: HitId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Global layer index; consecutive layers differ by one.
    #[serde(default)]
    pub volayer: Option<u32>,
}

impl Hit {
    #[inline]
    pub fn new(id: HitId, x: f64, y: f64, z: f64) -> Self {
        Self {
            id,
            x,
            y,
            z,
            volayer: None,
        }
    }
    #[inline]
    pub fn with_volayer(self, volayer: u32) -> Self {
        Self {
            volayer: Some(volayer),
            ..self
        }
    }
    /// Transverse radius `√(x²+y²)`.
    #[inline]
    pub fn r(&self) -> f64 {
        self.x.hypot(self.y)
    }
    #[inline]
    pub fn coord_2d(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

/// Hit slot plus adjacency.
#[derive(Clone, Debug)]
pub struct HitNode {
    pub hit: Hit,
    pub r: f64,
    /// Doublets ending at this hit (hit is the outer end).
    pub inner: Vec<DoubletId>,
    /// Doublets starting at this hit (hit is the inner end).
    pub outer: Vec<DoubletId>,
    /// Triplets whose last hit is this hit.
    pub inner_tplets: Vec<TripletId>,
    /// Triplets whose first hit is this hit.
    pub outer_tplets: Vec<TripletId>,
}

impl HitNode {
    pub(crate) fn new(hit: Hit) -> Self {
        Self {
            r: hit.r(),
            hit,
            inner: Vec::new(),
            outer: Vec::new(),
            inner_tplets: Vec::new(),
            outer_tplets: Vec::new(),
        }
    }
}

/// Directed hit pair, inner hit first.
#[derive(Clone, Debug)]
pub struct Doublet {
    pub hits: [HitIdx; 2],
    pub dz: f64,
    pub dr: f64,
    /// `atan2(dr, dz)`.
    pub rz_angle: f64,
    /// Triplets using this doublet as their second doublet.
    pub inner: Vec<TripletId>,
    /// Triplets using this doublet as their first doublet.
    pub outer: Vec<TripletId>,
}

/// Two doublets sharing the middle hit; one QUBO variable.
#[derive(Clone, Debug)]
pub struct Triplet {
    pub key: String,
    pub hits: [HitIdx; 3],
    pub doublets: [DoubletId; 2],
    /// Signed transverse curvature (1/mm).
    pub curvature: f64,
    /// Absolute rz-angle bend between the two doublets.
    pub drz: f64,
    /// Quadruplets where this triplet is `t2`.
    pub inner: Vec<QpletId>,
    /// Quadruplets where this triplet is `t1`.
    pub outer: Vec<QpletId>,
}

/// Two triplets sharing a doublet; one inclusion coupler.
#[derive(Clone, Debug)]
pub struct Quadruplet {
    pub key: String,
    pub hits: [HitIdx; 4],
    pub triplets: [TripletId; 2],
    pub delta_curvature: f64,
    pub delta_rz: f64,
    /// Layers skipped between the first and last hit.
    pub holes: u32,
    /// Inclusion coupler weight (negative rewards the chain).
    pub strength: f64,
}

/// Candidate graph for one event.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub hits: Vec<HitNode>,
    pub doublets: Vec<Doublet>,
    pub triplets: Vec<Triplet>,
    pub quadruplets: Vec<Quadruplet>,
    /// Keys of all quadruplets (valid chain continuations).
    pub qplet_keys: HashSet<String>,
    pub(crate) triplet_index: HashMap<String, TripletId>,
}

impl Graph {
    #[inline]
    pub fn hit(&self, idx: HitIdx) -> &HitNode {
        &self.hits[idx.0]
    }
    #[inline]
    pub fn doublet(&self, id: DoubletId) -> &Doublet {
        &self.doublets[id.0]
    }
    #[inline]
    pub fn triplet(&self, id: TripletId) -> &Triplet {
        &self.triplets[id.0]
    }
    #[inline]
    pub fn quadruplet(&self, id: QpletId) -> &Quadruplet {
        &self.quadruplets[id.0]
    }

    /// External ids for a hit sequence.
    pub fn hit_ids<const N: usize>(&self, hits: &[HitIdx; N]) -> [HitId; N] {
        hits.map(|h| self.hits[h.0].hit.id)
    }

    /// `(inner, outer)` external ids of a doublet.
    pub fn doublet_ids(&self, id: DoubletId) -> (HitId, HitId) {
        let [a, b] = self.hit_ids(&self.doublets[id.0].hits);
        (a, b)
    }

    pub fn triplet_by_key(&self, key: &str) -> Option<TripletId> {
        self.triplet_index.get(key).copied()
    }

    /// Quadruplet linking two triplets, in either order.
    pub fn find_quadruplet(&self, a: TripletId, b: TripletId) -> Option<QpletId> {
        let ta = &self.triplets[a.0];
        ta.outer
            .iter()
            .chain(ta.inner.iter())
            .copied()
            .find(|&q| {
                let [t1, t2] = self.quadruplets[q.0].triplets;
                (t1 == a && t2 == b) || (t1 == b && t2 == a)
            })
    }

    /// Triplets that take part in at least one quadruplet, in id order.
    pub fn chained_triplets(&self) -> Vec<TripletId> {
        (0..self.triplets.len())
            .map(TripletId)
            .filter(|&t| {
                let tp = &self.triplets[t.0];
                !tp.inner.is_empty() || !tp.outer.is_empty()
            })
            .collect()
    }
}

/// Kind of xplet, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum XpletKind {
    Doublet,
    Triplet,
    Quadruplet,
}

/// Why a candidate was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Doublet whose hits share the same radius.
    ZeroLength,
    /// Doublet listed more than once.
    Duplicate,
    /// Hits not strictly increasing in radius.
    RadiusOrder,
    /// Coincident transverse points; curvature undefined.
    Degenerate,
    Curvature,
    Drz,
    DeltaCurvature,
    Strength,
}

/// One recorded rejection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rejection {
    pub kind: XpletKind,
    pub key: String,
    pub reason: RejectReason,
    pub value: f64,
}

/// Counters collected while building and pruning.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub n_hits: usize,
    pub n_doublets: usize,
    pub n_triplets: usize,
    pub n_quadruplets: usize,
    /// Exact counts per (kind, reason).
    #[serde(skip)]
    pub rejected: BTreeMap<(XpletKind, RejectReason), usize>,
    /// First `REJECTION_LOG_CAP` rejections, in order.
    pub rejections: Vec<Rejection>,
    /// Quadruplets removed by the pruning strategy.
    pub dropped_qplets: usize,
}

impl BuildStats {
    pub const REJECTION_LOG_CAP: usize = 10_000;

    pub(crate) fn reject(&mut self, kind: XpletKind, key: String, reason: RejectReason, value: f64) {
        *self.rejected.entry((kind, reason)).or_insert(0) += 1;
        if self.rejections.len() < Self::REJECTION_LOG_CAP {
            self.rejections.push(Rejection {
                kind,
                key,
                reason,
                value,
            });
        }
    }

    /// Total rejections for one kind of xplet.
    pub fn rejected_count(&self, kind: XpletKind) -> usize {
        self.rejected
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, n)| n)
            .sum()
    }
}
