//! Union-find over arbitrary hashable items.
//!
//! Union by size with path compression on `root`. Items are registered up
//! front; operations on unknown items return `None` instead of panicking.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Clone, Debug)]
pub struct DisjointSets<T> {
    items: Vec<T>,
    index: HashMap<T, usize>,
    parent: Vec<usize>,
    size: Vec<usize>,
    n_sets: usize,
}

impl<T: Clone + Eq + Hash> DisjointSets<T> {
    /// One singleton set per distinct item; duplicates are ignored.
    pub fn new<I: IntoIterator<Item = T>>(items: I) -> Self {
        let mut ds = Self {
            items: Vec::new(),
            index: HashMap::new(),
            parent: Vec::new(),
            size: Vec::new(),
            n_sets: 0,
        };
        for item in items {
            if ds.index.contains_key(&item) {
                continue;
            }
            let k = ds.items.len();
            ds.index.insert(item.clone(), k);
            ds.items.push(item);
            ds.parent.push(k);
            ds.size.push(1);
            ds.n_sets += 1;
        }
        ds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn n_sets(&self) -> usize {
        self.n_sets
    }

    fn root(&mut self, mut k: usize) -> usize {
        let mut top = k;
        while self.parent[top] != top {
            top = self.parent[top];
        }
        while self.parent[k] != top {
            let next = self.parent[k];
            self.parent[k] = top;
            k = next;
        }
        top
    }

    /// Merge the sets of `a` and `b`. Returns `Some(true)` if two sets were
    /// joined, `Some(false)` if they already were one, `None` for unknown items.
    pub fn merge(&mut self, a: &T, b: &T) -> Option<bool> {
        let (ka, kb) = (*self.index.get(a)?, *self.index.get(b)?);
        let (mut ra, mut rb) = (self.root(ka), self.root(kb));
        if ra == rb {
            return Some(false);
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        self.n_sets -= 1;
        Some(true)
    }

    pub fn are_together(&mut self, a: &T, b: &T) -> Option<bool> {
        let (ka, kb) = (*self.index.get(a)?, *self.index.get(b)?);
        Some(self.root(ka) == self.root(kb))
    }

    /// Size of the set containing `a`.
    pub fn set_size(&mut self, a: &T) -> Option<usize> {
        let k = *self.index.get(a)?;
        let r = self.root(k);
        Some(self.size[r])
    }

    /// All sets, each listing its members in insertion order; sets are ordered
    /// by their first member.
    pub fn all_sets(&mut self) -> Vec<Vec<T>> {
        let mut slot: HashMap<usize, usize> = HashMap::with_capacity(self.n_sets);
        let mut out: Vec<Vec<T>> = Vec::with_capacity(self.n_sets);
        for k in 0..self.items.len() {
            let r = self.root(k);
            let s = *slot.entry(r).or_insert_with(|| {
                out.push(Vec::new());
                out.len() - 1
            });
            out[s].push(self.items[k].clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn merge_is_idempotent_and_counts_sets() {
        let mut ds = DisjointSets::new(["a", "b", "c", "d"]);
        assert_eq!(ds.n_sets(), 4);
        assert_eq!(ds.merge(&"a", &"b"), Some(true));
        assert_eq!(ds.merge(&"b", &"a"), Some(false));
        assert_eq!(ds.n_sets(), 3);
        assert_eq!(ds.are_together(&"a", &"b"), Some(true));
        assert_eq!(ds.are_together(&"a", &"c"), Some(false));
        assert_eq!(ds.merge(&"a", &"zz"), None);
        assert_eq!(ds.set_size(&"b"), Some(2));
        assert_eq!(ds.all_sets(), vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
    }

    proptest! {
        #[test]
        fn all_sets_partitions_items(
            n in 1usize..60,
            pairs in prop::collection::vec((0usize..60, 0usize..60), 0..80),
        ) {
            let mut ds = DisjointSets::new(0..n);
            let mut effective = 0;
            for (a, b) in pairs.iter().map(|&(a, b)| (a % n, b % n)) {
                if ds.merge(&a, &b) == Some(true) {
                    effective += 1;
                }
                prop_assert_eq!(ds.are_together(&a, &b), Some(true));
            }
            prop_assert_eq!(ds.n_sets(), n - effective);
            let sets = ds.all_sets();
            prop_assert_eq!(sets.len(), ds.n_sets());
            let mut seen: Vec<usize> = sets.iter().flatten().copied().collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
            for set in &sets {
                prop_assert_eq!(ds.set_size(&set[0]), Some(set.len()));
                for x in set {
                    prop_assert_eq!(ds.are_together(&set[0], x), Some(true));
                }
            }
        }
    }
}
