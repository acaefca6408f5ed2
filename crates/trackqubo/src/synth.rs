//! Synthetic events: helix tracks through a barrel of cylindrical layers.
//!
//! Model
//! - Each track starts at `(0, 0, z0)` and follows a helix whose transverse
//!   projection is a circle of radius `R` through the origin. At layer radius
//!   `r` the track has turned by `α = 2·asin(r / 2R)` around the circle
//!   center and travelled an arc length `R·α`; `z = z0 + cot·R·α`.
//! - True doublets join a track's hits on adjacent layers. Fake doublets join
//!   random hits on adjacent layers that lie within `fake_max_dphi` in azimuth.
//! - Determinism uses a replay token `(seed, index)` mixed into a single RNG.

use std::collections::HashSet;
use std::f64::consts::{PI, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::graph::{Hit, HitId};

/// Generator configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthCfg {
    pub n_tracks: usize,
    /// Barrel layer radii (mm), increasing. The layer index is the hit's volayer.
    pub layer_radii: Vec<f64>,
    /// Tracks leave the barrel once `|z|` exceeds this (mm).
    pub barrel_half_length: f64,
    /// Transverse radius range (mm) of the track circles.
    pub min_radius: f64,
    pub max_radius: f64,
    /// `|cot θ|` upper bound.
    pub max_cot: f64,
    /// `z0` is drawn uniformly in `[-z0_width, z0_width]`.
    pub z0_width: f64,
    /// Fake doublets per true doublet.
    pub fake_ratio: f64,
    pub fake_max_dphi: f64,
}

impl Default for SynthCfg {
    fn default() -> Self {
        Self {
            n_tracks: 20,
            layer_radii: vec![
                32.0, 72.0, 116.0, 172.0, 260.0, 360.0, 500.0, 660.0, 820.0, 1020.0,
            ],
            barrel_half_length: 1100.0,
            min_radius: 2000.0,
            max_radius: 20000.0,
            max_cot: 1.0,
            z0_width: 27.5,
            fake_ratio: 0.5,
            fake_max_dphi: 0.05,
        }
    }
}

/// Replay token to make draws reproducible and indexable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventToken {
    pub seed: u64,
    pub index: u64,
}

impl EventToken {
    pub fn new(seed: u64) -> Self {
        Self { seed, index: 0 }
    }

    fn to_std_rng(self) -> StdRng {
        // SplitMix64 finalizer.
        fn mix(mut x: u64) -> u64 {
            x ^= x >> 30;
            x = x.wrapping_mul(0xbf58476d1ce4e5b9);
            x ^= x >> 27;
            x = x.wrapping_mul(0x94d049bb133111eb);
            x ^ (x >> 31)
        }
        StdRng::seed_from_u64(mix(self.seed ^ mix(self.index.wrapping_add(0x9e3779b97f4a7c15))))
    }
}

/// One generated event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SynthEvent {
    pub hits: Vec<Hit>,
    /// True doublets first, then fakes; inner hit first.
    pub doublets: Vec<(HitId, HitId)>,
    pub n_fake_doublets: usize,
    /// Hit ids of every track with at least two hits, inner to outer.
    pub truth: Vec<Vec<HitId>>,
}

pub fn draw_event(cfg: &SynthCfg, tok: EventToken) -> SynthEvent {
    let mut rng = tok.to_std_rng();
    let mut ev = SynthEvent::default();
    let mut per_layer: Vec<Vec<usize>> = vec![Vec::new(); cfg.layer_radii.len()];
    let mut next_id: HitId = 1;
    let (r_lo, r_hi) = (cfg.min_radius.min(cfg.max_radius), cfg.min_radius.max(cfg.max_radius));
    let (max_cot, z0_width) = (cfg.max_cot.abs(), cfg.z0_width.abs());

    for _ in 0..cfg.n_tracks {
        let big_r = rng.gen_range(r_lo..=r_hi);
        let phi_c = rng.gen::<f64>() * TAU;
        let charge = if rng.gen::<bool>() { 1.0 } else { -1.0 };
        let cot = rng.gen_range(-max_cot..=max_cot);
        let z0 = rng.gen_range(-z0_width..=z0_width);
        let (cx, cy) = (big_r * phi_c.cos(), big_r * phi_c.sin());

        let mut track = Vec::new();
        for (layer, &r) in cfg.layer_radii.iter().enumerate() {
            if r >= 2.0 * big_r {
                break;
            }
            let alpha = 2.0 * (r / (2.0 * big_r)).asin();
            let z = z0 + cot * big_r * alpha;
            if z.abs() > cfg.barrel_half_length {
                break;
            }
            let ang = phi_c + PI + charge * alpha;
            let hit = Hit::new(next_id, cx + big_r * ang.cos(), cy + big_r * ang.sin(), z)
                .with_volayer(layer as u32);
            next_id += 1;
            per_layer[layer].push(ev.hits.len());
            ev.hits.push(hit);
            track.push(hit.id);
        }
        ev.doublets.extend(track.windows(2).map(|w| (w[0], w[1])));
        if track.len() >= 2 {
            ev.truth.push(track);
        }
    }

    let n_fakes = (ev.doublets.len() as f64 * cfg.fake_ratio).round() as usize;
    let mut taken: HashSet<(HitId, HitId)> = ev.doublets.iter().copied().collect();
    let phi = |h: &Hit| h.y.atan2(h.x);
    // Bounded attempts: sparse layers may not have enough close pairs.
    for _ in 0..n_fakes * 20 {
        if ev.n_fake_doublets == n_fakes || per_layer.len() < 2 {
            break;
        }
        let layer = rng.gen_range(0..per_layer.len() - 1);
        let (inner, outer) = (&per_layer[layer], &per_layer[layer + 1]);
        if inner.is_empty() || outer.is_empty() {
            continue;
        }
        let a = &ev.hits[inner[rng.gen_range(0..inner.len())]];
        let b = &ev.hits[outer[rng.gen_range(0..outer.len())]];
        let dphi = (phi(a) - phi(b) + PI).rem_euclid(TAU) - PI;
        if dphi.abs() > cfg.fake_max_dphi || !taken.insert((a.id, b.id)) {
            continue;
        }
        ev.doublets.push((a.id, b.id));
        ev.n_fake_doublets += 1;
    }
    tracing::debug!(
        hits = ev.hits.len(),
        doublets = ev.doublets.len(),
        fakes = ev.n_fake_doublets,
        tracks = ev.truth.len(),
        "synthetic event drawn"
    );
    ev
}
