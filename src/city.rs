//! City and graph model for the symmetric TSP.
//!
//! Holds city coordinates and a precomputed, symmetric, integer-rounded
//! distance matrix (TSPLIB EUC_2D convention). The graph is built once
//! and is read-only for the rest of a colony's lifetime.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// A single city: a 0-based index and its 2D coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: usize,
    pub x: f64,
    pub y: f64,
}

impl City {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        City { id, x, y }
    }
}

/// An immutable problem instance: N cities and their pairwise distances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub cities: Vec<City>,
    #[serde(skip)]
    distance_matrix: Vec<Vec<f64>>,
}

impl Graph {
    /// Build a graph from a city list, computing the distance matrix once.
    ///
    /// Fails with `InvalidGraph` when there are fewer than 2 cities or
    /// any coordinate is non-finite.
    pub fn new(cities: Vec<City>) -> Result<Self, SolverError> {
        if cities.len() < 2 {
            return Err(SolverError::InvalidGraph(format!(
                "graph needs at least 2 cities, got {}",
                cities.len()
            )));
        }
        for city in &cities {
            if !city.x.is_finite() || !city.y.is_finite() {
                return Err(SolverError::InvalidGraph(format!(
                    "city {} has non-finite coordinates",
                    city.id
                )));
            }
        }

        let distance_matrix = Self::compute_distance_matrix(&cities);
        Ok(Graph {
            cities,
            distance_matrix,
        })
    }

    /// Euclidean distance rounded to the nearest integer, per TSPLIB's
    /// EUC_2D convention.
    fn compute_distance_matrix(cities: &[City]) -> Vec<Vec<f64>> {
        let n = cities.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = cities[i].x - cities[j].x;
                let dy = cities[i].y - cities[j].y;
                let d = (dx * dx + dy * dy).sqrt().round();
                matrix[i][j] = d;
                matrix[j][i] = d;
            }
        }
        matrix
    }

    #[inline]
    pub fn num_cities(&self) -> usize {
        self.cities.len()
    }

    /// `D[i][j]`. Symmetric; `D[i][i] == 0`.
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    /// Total length of a closed tour over the given city sequence.
    pub fn tour_length(&self, sequence: &[usize]) -> f64 {
        let n = sequence.len();
        if n < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        for k in 0..n {
            total += self.distance(sequence[k], sequence[(k + 1) % n]);
        }
        total
    }

    /// Nearest-neighbor tour length starting at city 0.
    ///
    /// Used only to seed the initial pheromone level `tau0 = M / L_nn`;
    /// it is not itself a candidate solution.
    pub fn nearest_neighbor_tour_length(&self) -> f64 {
        let n = self.num_cities();
        let mut visited = vec![false; n];
        visited[0] = true;
        let mut current = 0;
        let mut total = 0.0;

        for _ in 1..n {
            let next = (0..n)
                .filter(|&j| !visited[j])
                .min_by_key(|&j| OrderedFloat(self.distance(current, j)))
                .expect("at least one unvisited city remains while tour is incomplete");
            total += self.distance(current, next);
            visited[next] = true;
            current = next;
        }

        total += self.distance(current, 0);
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Graph {
        Graph::new(vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 0.0),
            City::new(2, 1.0, 1.0),
            City::new(3, 0.0, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_diagonal() {
        let g = square();
        for i in 0..4 {
            assert_eq!(g.distance(i, i), 0.0);
            for j in 0..4 {
                assert_eq!(g.distance(i, j), g.distance(j, i));
            }
        }
    }

    #[test]
    fn rejects_fewer_than_two_cities() {
        let err = Graph::new(vec![City::new(0, 0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, SolverError::InvalidGraph(_)));
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let err = Graph::new(vec![City::new(0, f64::NAN, 0.0), City::new(1, 1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, SolverError::InvalidGraph(_)));
    }

    #[test]
    fn nearest_neighbor_tour_visits_every_city() {
        let g = square();
        // Unit square: nearest-neighbor from 0 should trace the perimeter, length 4.
        assert!((g.nearest_neighbor_tour_length() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn tour_length_matches_manual_sum() {
        let g = square();
        let len = g.tour_length(&[0, 1, 2, 3]);
        assert!((len - 4.0).abs() < 1e-9);
    }
}
