//! Selected doublets → disjoint tracks.
//!
//! A sampler's answer rarely satisfies every exclusion coupler, so a hit can
//! end up with several selected successors or predecessors. Such hits are
//! counted as conflicts; tracks are then extracted greedily, longest chain
//! first, and each extracted chain removes its hits from further use. Chains
//! never leave a weakly connected component, so extraction runs per component
//! and the cost scales with component size rather than with the track count.
//!
//! Ties are broken towards the smallest hit id, both for the chain start and
//! for every next hop, so the result depends only on the doublet set.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::dsets::DisjointSets;
use crate::graph::HitId;

pub const DEFAULT_MIN_HITS_PER_TRACK: usize = 5;

/// Output of `recreate_tracks`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Recreated {
    /// Disjoint tracks, inner hit first, in extraction order.
    pub tracks: Vec<Vec<HitId>>,
    /// Consecutive hit pairs of all tracks.
    pub doublets: Vec<(HitId, HitId)>,
    /// Hits with more than one selected successor or predecessor.
    pub n_conflicts: usize,
}

impl Recreated {
    /// Drop tracks with fewer than `min_hits` hits.
    pub fn retain_min_hits(&mut self, min_hits: usize) {
        self.tracks.retain(|t| t.len() >= min_hits);
        self.doublets = flatten(&self.tracks);
    }
}

fn flatten(tracks: &[Vec<HitId>]) -> Vec<(HitId, HitId)> {
    tracks
        .iter()
        .flat_map(|t| t.windows(2).map(|w| (w[0], w[1])))
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Open,
    Active,
    Done,
}

/// Longest chain starting at each remaining hit: `(length in hits, next hop)`.
fn longest_chains(
    succ: &BTreeMap<HitId, BTreeSet<HitId>>,
    remaining: &BTreeSet<HitId>,
) -> BTreeMap<HitId, (usize, Option<HitId>)> {
    let mut best: BTreeMap<HitId, (usize, Option<HitId>)> = BTreeMap::new();
    let mut mark: BTreeMap<HitId, Mark> = remaining.iter().map(|&h| (h, Mark::Open)).collect();
    let empty = BTreeSet::new();

    for &root in remaining {
        if mark[&root] != Mark::Open {
            continue;
        }
        // (hit, children pushed)
        let mut stack = vec![(root, false)];
        while let Some((h, expanded)) = stack.pop() {
            if expanded {
                let mut top = (1, None);
                for &s in succ.get(&h).unwrap_or(&empty) {
                    if let Some(&(len, _)) = best.get(&s) {
                        if len + 1 > top.0 {
                            top = (len + 1, Some(s));
                        }
                    }
                }
                best.insert(h, top);
                mark.insert(h, Mark::Done);
                continue;
            }
            if mark[&h] != Mark::Open {
                continue;
            }
            mark.insert(h, Mark::Active);
            stack.push((h, true));
            for &s in succ.get(&h).unwrap_or(&empty).iter().rev() {
                // Active successors close a cycle; that edge is ignored.
                if mark.get(&s) == Some(&Mark::Open) {
                    stack.push((s, false));
                }
            }
        }
    }
    best
}

/// Rebuild disjoint tracks from selected `(inner, outer)` doublets.
pub fn recreate_tracks(doublets: &[(HitId, HitId)]) -> Recreated {
    recreate_counted(doublets).0
}

/// `recreate_tracks` plus the number of hit evaluations spent in
/// `longest_chains`.
fn recreate_counted(doublets: &[(HitId, HitId)]) -> (Recreated, usize) {
    let mut succ: BTreeMap<HitId, BTreeSet<HitId>> = BTreeMap::new();
    let mut pred: BTreeMap<HitId, BTreeSet<HitId>> = BTreeMap::new();
    let mut hits: BTreeSet<HitId> = BTreeSet::new();
    for &(a, b) in doublets {
        if a == b {
            continue;
        }
        succ.entry(a).or_default().insert(b);
        pred.entry(b).or_default().insert(a);
        hits.insert(a);
        hits.insert(b);
    }
    let n_conflicts = hits
        .iter()
        .filter(|&&h| {
            succ.get(&h).map_or(0, BTreeSet::len) > 1 || pred.get(&h).map_or(0, BTreeSet::len) > 1
        })
        .count();

    // Extraction never crosses a weakly connected component.
    let mut components = DisjointSets::new(hits.iter().copied());
    for (a, outs) in &succ {
        for b in outs {
            components.merge(a, b);
        }
    }
    let mut tracks = Vec::new();
    let mut visited = 0;
    for members in components.all_sets() {
        if members.len() < 2 {
            continue;
        }
        visited += extract_component(&succ, members.into_iter().collect(), &mut tracks);
    }
    // Longest first, then smallest first hit.
    tracks.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

    let doublets = flatten(&tracks);
    tracing::debug!(tracks = tracks.len(), n_conflicts, visited, "tracks recreated");
    let rec = Recreated {
        tracks,
        doublets,
        n_conflicts,
    };
    (rec, visited)
}

/// Repeated longest-chain extraction inside one component.
fn extract_component(
    succ: &BTreeMap<HitId, BTreeSet<HitId>>,
    mut remaining: BTreeSet<HitId>,
    tracks: &mut Vec<Vec<HitId>>,
) -> usize {
    let mut visited = 0;
    loop {
        let best = longest_chains(succ, &remaining);
        visited += best.len();
        let mut start: Option<(HitId, usize)> = None;
        for (&h, &(len, _)) in &best {
            if start.map_or(true, |(_, l)| len > l) {
                start = Some((h, len));
            }
        }
        let Some((mut h, len)) = start else { break };
        if len < 2 {
            break;
        }
        let mut track = Vec::with_capacity(len);
        loop {
            track.push(h);
            match best.get(&h).and_then(|&(_, next)| next) {
                Some(n) => h = n,
                None => break,
            }
        }
        for h in &track {
            remaining.remove(h);
        }
        tracks.push(track);
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn clean_chains_become_tracks() {
        let mut rec = recreate_tracks(&[(1, 2), (2, 3), (3, 4), (10, 11), (11, 12)]);
        assert_eq!(rec.tracks, vec![vec![1, 2, 3, 4], vec![10, 11, 12]]);
        assert_eq!(rec.n_conflicts, 0);
        assert_eq!(rec.doublets.len(), 5);
        rec.retain_min_hits(4);
        assert_eq!(rec.tracks, vec![vec![1, 2, 3, 4]]);
        assert_eq!(rec.doublets, vec![(1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn forks_are_counted_and_resolved_towards_longer_branch() {
        // 2 forks into 3→4→5 and 6; 7 also feeds 3.
        let rec = recreate_tracks(&[(1, 2), (2, 3), (3, 4), (4, 5), (2, 6), (7, 3)]);
        assert_eq!(rec.n_conflicts, 2);
        assert_eq!(rec.tracks[0], vec![1, 2, 3, 4, 5]);
        // 7 and 6 are left without partners.
        assert_eq!(rec.tracks.len(), 1);
    }

    #[test]
    fn ties_prefer_smaller_hit_ids_and_cycles_terminate() {
        let rec = recreate_tracks(&[(5, 6), (1, 2)]);
        assert_eq!(rec.tracks, vec![vec![1, 2], vec![5, 6]]);
        let rec = recreate_tracks(&[(1, 2), (2, 3), (3, 1)]);
        assert_eq!(rec.tracks.len(), 1);
        assert_eq!(rec.tracks[0].len(), 3);
    }

    #[test]
    fn work_stays_linear_in_disjoint_chains() {
        let n_tracks = 4000u64;
        let doublets: Vec<(HitId, HitId)> = (0..n_tracks)
            .flat_map(|t| (0..4).map(move |k| (10 * t + k, 10 * t + k + 1)))
            .collect();
        let (rec, visited) = recreate_counted(&doublets);
        assert_eq!(rec.tracks.len(), n_tracks as usize);
        assert!(rec.tracks.iter().all(|t| t.len() == 5));
        assert_eq!(rec.tracks[0], vec![0, 1, 2, 3, 4]);
        assert_eq!(rec.tracks[1][0], 10);
        // One pass per component plus one empty pass to stop.
        assert_eq!(visited, 5 * n_tracks as usize);
    }

    #[test]
    fn tracks_from_separate_components_are_ordered_by_length() {
        let rec = recreate_tracks(&[(1, 2), (2, 3), (20, 21), (21, 22), (22, 23), (5, 6)]);
        assert_eq!(rec.tracks, vec![vec![20, 21, 22, 23], vec![1, 2, 3], vec![5, 6]]);
    }

    proptest! {
        #[test]
        fn tracks_are_disjoint_and_use_selected_doublets(
            pairs in prop::collection::vec((0u64..30, 0u64..30), 0..60),
        ) {
            let doublets: Vec<(u64, u64)> = pairs
                .into_iter()
                .filter(|(a, b)| a < b)
                .collect();
            let input: HashSet<(u64, u64)> = doublets.iter().copied().collect();
            let rec = recreate_tracks(&doublets);
            let mut seen = HashSet::new();
            for t in &rec.tracks {
                prop_assert!(t.len() >= 2);
                for h in t {
                    prop_assert!(seen.insert(*h), "hit {} used twice", h);
                }
            }
            for d in &rec.doublets {
                prop_assert!(input.contains(d));
            }
            let again = recreate_tracks(&doublets);
            prop_assert_eq!(again, rec);
        }
    }
}
