//! Graph construction tests: structural invariants on synthetic events, input
//! validation, rejection bookkeeping, and the compacting rebuild.

use super::build::coupling_strength;
use super::*;
use crate::cfg::Config;
use crate::error::{Error, InputError};
use crate::synth::{draw_event, EventToken, SynthCfg};
use proptest::prelude::*;

fn dense_cfg() -> SynthCfg {
    SynthCfg {
        n_tracks: 30,
        fake_ratio: 1.0,
        fake_max_dphi: 0.1,
        ..SynthCfg::default()
    }
}

fn assert_invariants(g: &Graph) {
    for t in &g.triplets {
        let [a, b, c] = t.hits.map(|h| g.hit(h).r);
        assert!(a < b && b < c, "triplet {} not radially ordered", t.key);
        let [d1, d2] = t.doublets;
        assert_eq!(g.doublet(d1).hits[1], g.doublet(d2).hits[0]);
        assert_eq!(g.triplet_by_key(&t.key).map(|id| &g.triplet(id).key), Some(&t.key));
        assert_eq!(xplet_name(&g.hit_ids(&t.hits)), t.key);
    }
    for (k, q) in g.quadruplets.iter().enumerate() {
        let [t1, t2] = q.triplets;
        assert_eq!(g.triplet(t1).doublets[1], g.triplet(t2).doublets[0]);
        assert!(g.triplet(t1).outer.contains(&QpletId(k)));
        assert!(g.triplet(t2).inner.contains(&QpletId(k)));
        assert!(g.qplet_keys.contains(&q.key));
    }
    assert_eq!(g.qplet_keys.len(), g.quadruplets.len());
    for d in &g.doublets {
        assert!(g.hit(d.hits[0]).r < g.hit(d.hits[1]).r);
    }
}

#[test]
fn synthetic_event_graph_holds_invariants() {
    let ev = draw_event(&dense_cfg(), EventToken::new(1));
    let (g, stats) = build_graph(&ev.hits, &ev.doublets, &Config::default()).unwrap();
    assert_invariants(&g);
    assert_eq!(stats.n_triplets, g.triplets.len());
    assert_eq!(stats.n_doublets, ev.doublets.len());
    // Every true 3-hit window is a triplet.
    for t in &ev.truth {
        for w in t.windows(3) {
            assert!(g.triplet_by_key(&xplet_name(w)).is_some(), "missing {w:?}");
        }
        for w in t.windows(4) {
            assert!(g.qplet_keys.contains(&xplet_name(w)), "missing {w:?}");
        }
    }
}

#[test]
fn retain_rebuilds_consistent_adjacency() {
    let ev = draw_event(&dense_cfg(), EventToken::new(2));
    let (g, _) = build_graph(&ev.hits, &ev.doublets, &Config::default()).unwrap();
    let kept = g.retain_quadruplets(|q| q.0 % 2 == 0);
    assert_invariants(&kept);
    assert_eq!(kept.quadruplets.len(), (g.quadruplets.len() + 1) / 2);
    for q in &kept.quadruplets {
        let orig = g.quadruplets.iter().find(|o| o.key == q.key).unwrap();
        assert_eq!(orig.strength, q.strength);
    }
    let all = g.retain_quadruplets(|_| true);
    assert_eq!(all.quadruplets.len(), g.quadruplets.len());
    assert_eq!(all.triplets.len(), g.chained_triplets().len());
}

#[test]
fn reversed_and_duplicate_doublets_are_normalized() {
    let hits = [
        Hit::new(1, 30.0, 0.0, 0.0),
        Hit::new(2, 70.0, 0.0, 0.0),
        Hit::new(3, 0.0, 70.0, 0.0),
    ];
    let (g, stats) = build_graph(&hits, &[(2, 1), (1, 2), (2, 3)], &Config::default()).unwrap();
    assert_eq!(g.doublets.len(), 1);
    assert_eq!(g.doublet_ids(DoubletId(0)), (1, 2));
    assert_eq!(stats.rejected[&(XpletKind::Doublet, RejectReason::Duplicate)], 1);
    assert_eq!(stats.rejected[&(XpletKind::Doublet, RejectReason::ZeroLength)], 1);
    assert_eq!(stats.rejected_count(XpletKind::Doublet), 2);
}

#[test]
fn curvature_and_drz_cuts_reject_triplets() {
    // Sharp kink in the transverse plane.
    let kink = [
        Hit::new(1, 30.0, 0.0, 0.0),
        Hit::new(2, 70.0, 0.0, 0.0),
        Hit::new(3, 100.0, 60.0, 0.0),
    ];
    let (g, stats) = build_graph(&kink, &[(1, 2), (2, 3)], &Config::default()).unwrap();
    assert!(g.triplets.is_empty());
    assert_eq!(stats.rejections[0].reason, RejectReason::Curvature);
    assert_eq!(stats.rejections[0].key, "1_2_3");

    // Straight in xy, bent in rz.
    let bend = [
        Hit::new(1, 30.0, 0.0, 0.0),
        Hit::new(2, 70.0, 0.0, 0.0),
        Hit::new(3, 110.0, 0.0, 40.0),
    ];
    let (g, stats) = build_graph(&bend, &[(1, 2), (2, 3)], &Config::default()).unwrap();
    assert!(g.triplets.is_empty());
    assert_eq!(stats.rejected_count(XpletKind::Triplet), 1);
    assert_eq!(stats.rejections[0].reason, RejectReason::Drz);
}

#[test]
fn malformed_input_is_an_error() {
    let hits = [Hit::new(1, 30.0, 0.0, 0.0), Hit::new(2, 70.0, 0.0, 0.0)];
    let err = build_graph(&hits, &[(1, 9)], &Config::default()).unwrap_err();
    assert_eq!(err, Error::Input(InputError::UnknownHit { index: 0, hit: 9 }));

    let dup = [hits[0], hits[0]];
    let err = build_graph(&dup, &[], &Config::default()).unwrap_err();
    assert_eq!(err, Error::Input(InputError::DuplicateHit(1)));

    let nan = [Hit::new(4, f64::NAN, 0.0, 0.0)];
    let err = build_graph(&nan, &[], &Config::default()).unwrap_err();
    assert_eq!(err, Error::Input(InputError::NonFiniteHit(4)));
}

#[test]
fn holes_weaken_the_coupling() {
    let cfg = Config::default();
    let full = coupling_strength(&cfg, 0.0, 0.0, 0);
    assert_eq!(full, -1.0);
    assert_eq!(coupling_strength(&cfg, 0.0, 0.0, 1), -0.25);
    let half = coupling_strength(&cfg, 0.5 * cfg.qplet_max_dcurv, 0.0, 0);
    assert!((half + 0.75).abs() < 1e-12);
}

#[test]
fn chain_lengths_count_triplets_and_quadruplets() {
    let hits: Vec<Hit> = (0..6)
        .map(|k| Hit::new(k, 40.0 + 50.0 * k as f64, 0.0, 0.0))
        .collect();
    let doublets: Vec<(HitId, HitId)> = (0..5).map(|k| (k, k + 1)).collect();
    let (g, _) = build_graph(&hits, &doublets, &Config::default()).unwrap();
    let chains = ChainLengths::compute(&g);
    assert_eq!(g.triplets.len(), 4);
    for t in 0..4 {
        assert_eq!(chains.triplet_path(TripletId(t)), 4);
    }
    for q in 0..g.quadruplets.len() {
        assert_eq!(chains.qplet_path(&g, QpletId(q)), 3);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn invariants_hold_for_any_seed(seed in 0u64..10_000) {
        let ev = draw_event(&dense_cfg(), EventToken::new(seed));
        let (g, _) = build_graph(&ev.hits, &ev.doublets, &Config::default()).unwrap();
        assert_invariants(&g);
    }
}
