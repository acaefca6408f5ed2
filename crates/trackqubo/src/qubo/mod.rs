//! QUBO container and encoder.
//!
//! Purpose
//! - Hold the coefficient map of one event: biases on the diagonal, exclusion
//!   and inclusion couplers off the diagonal, keyed by triplet name.
//! - Keys are canonical (lexicographically ordered pair), so `(i, j)` and
//!   `(j, i)` can never both be present.
//!
//! Layout
//! - `mod.rs` (container, samples, energy), `encode.rs` (graph → QUBO).

mod encode;

pub use encode::encode;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Binary assignment: variable name → 0/1. Missing variables read as 0.
pub type Sample = BTreeMap<String, u8>;

/// Counts reported with each encoded QUBO.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuboStats {
    pub n_vars: usize,
    pub n_incl_couplers: usize,
    pub n_excl_couplers: usize,
    pub n_excl_type1: usize,
    pub n_excl_type2: usize,
}

/// Flat coefficient record, the on-disk QUBO format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuboEntry {
    pub i: String,
    pub j: String,
    pub value: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Qubo {
    coeffs: BTreeMap<(String, String), f64>,
}

fn canonical(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl Qubo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.coeffs.get(&canonical(a, b)).copied()
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.coeffs.contains_key(&canonical(a, b))
    }

    /// Insert only if the unordered pair is absent. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, a: &str, b: &str, value: f64) -> bool {
        match self.coeffs.entry(canonical(a, b)) {
            Entry::Vacant(e) => {
                e.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Diagonal entries in key order.
    pub fn biases(&self) -> impl Iterator<Item = (&str, f64)> {
        self.coeffs
            .iter()
            .filter(|((i, j), _)| i == j)
            .map(|((i, _), v)| (i.as_str(), *v))
    }

    /// All entries in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.coeffs
            .iter()
            .map(|((i, j), v)| (i.as_str(), j.as_str(), *v))
    }

    pub fn entries(&self) -> Vec<QuboEntry> {
        self.iter()
            .map(|(i, j, value)| QuboEntry {
                i: i.to_string(),
                j: j.to_string(),
                value,
            })
            .collect()
    }

    /// Rebuild from flat entries; a later duplicate of an unordered pair is ignored.
    pub fn from_entries<I: IntoIterator<Item = QuboEntry>>(entries: I) -> Self {
        let mut q = Self::new();
        for e in entries {
            q.insert_if_absent(&e.i, &e.j, e.value);
        }
        q
    }

    /// `Σ value · x_i · x_j` over the sample.
    pub fn energy(&self, sample: &Sample) -> f64 {
        let on = |k: &str| sample.get(k).copied().unwrap_or(0) != 0;
        self.coeffs
            .iter()
            .filter(|((i, j), _)| on(i.as_str()) && on(j.as_str()))
            .map(|(_, v)| v)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unordered() {
        let mut q = Qubo::new();
        assert!(q.insert_if_absent("b", "a", 1.0));
        assert!(!q.insert_if_absent("a", "b", 2.0));
        assert_eq!(q.get("a", "b"), Some(1.0));
        assert_eq!(q.get("b", "a"), Some(1.0));
        assert_eq!(q.len(), 1);
        let e = q.entries();
        assert_eq!((e[0].i.as_str(), e[0].j.as_str()), ("a", "b"));
    }

    #[test]
    fn energy_sums_active_terms() {
        let mut q = Qubo::new();
        q.insert_if_absent("x", "x", 0.5);
        q.insert_if_absent("y", "y", 0.25);
        q.insert_if_absent("x", "y", -1.0);
        q.insert_if_absent("y", "z", 3.0);
        let sample: Sample = [("x".to_string(), 1), ("y".to_string(), 1), ("z".to_string(), 0)]
            .into_iter()
            .collect();
        assert_eq!(q.energy(&sample), -0.25);
        assert_eq!(q.energy(&Sample::new()), 0.0);
        let back = Qubo::from_entries(q.entries());
        assert_eq!(back, q);
    }
}
