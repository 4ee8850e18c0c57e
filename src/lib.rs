//! Ant Colony Optimization solver core for the symmetric Travelling
//! Salesman Problem.
//!
//! # Features
//!
//! - TSPLIB EUC_2D instance loading
//! - Pheromone-matrix-driven stochastic tour construction, parallelized
//!   per ant with `rayon`
//! - 2-opt and 3-opt local search
//! - Classic, elitist, and rank-based pheromone deposit variants
//! - Convergence tracking, progress callbacks, and cancellation
//! - A benchmark runner for sweeping instances/variants/modes
//!
//! # Example
//!
//! ```no_run
//! use aco_tsp_solver::loader::load_tsplib_file;
//! use aco_tsp_solver::colony::{Colony, ColonyConfig};
//!
//! let graph = load_tsplib_file(std::path::Path::new("instance.tsp")).unwrap();
//! let mut colony = Colony::new(graph, ColonyConfig::default()).unwrap();
//! colony.initialize();
//! let outcome = colony.solve(100).unwrap();
//! println!("best distance: {:.2}", outcome.best_tour.distance);
//! ```

pub mod ant;
pub mod benchmark;
pub mod city;
pub mod colony;
pub mod error;
pub mod loader;
pub mod local_search;
pub mod pheromone;
pub mod tour;

pub use city::{City, Graph};
pub use colony::{Colony, ColonyConfig, SolveOutcome, Variant};
pub use error::SolverError;
pub use tour::Tour;
