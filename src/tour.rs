//! Tour representation: an ordered permutation of cities with its
//! cached total distance.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::city::Graph;

/// A candidate Hamiltonian cycle. Tours are value objects; ants produce
/// a fresh one each iteration and local search returns a new (or
/// unchanged) one rather than mutating shared state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    pub sequence: Vec<usize>,
    pub distance: f64,
}

impl Tour {
    pub fn new(sequence: Vec<usize>, distance: f64) -> Self {
        Tour { sequence, distance }
    }

    /// Build a tour from a sequence, computing its distance against `graph`.
    pub fn from_sequence(graph: &Graph, sequence: Vec<usize>) -> Self {
        let distance = graph.tour_length(&sequence);
        Tour { sequence, distance }
    }

    /// True iff `sequence` is exactly a permutation of `0..n`.
    ///
    /// Creation never auto-validates; this is an explicit test property.
    pub fn validate(&self, n: usize) -> bool {
        if self.sequence.len() != n {
            return false;
        }
        if self.sequence.iter().any(|&c| c >= n) {
            return false;
        }
        let unique: HashSet<usize> = self.sequence.iter().copied().collect();
        unique.len() == n
    }

    /// Recompute `distance` from scratch against `graph`.
    pub fn recompute_distance(&mut self, graph: &Graph) {
        self.distance = graph.tour_length(&self.sequence);
    }
}

impl Default for Tour {
    fn default() -> Self {
        Tour {
            sequence: Vec::new(),
            distance: f64::INFINITY,
        }
    }
}
