//! The ant colony iteration controller: parallel construction, global
//! best tracking, pheromone update, convergence tracking, and progress
//! reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ant::{ant_seed, Ant};
use crate::city::Graph;
use crate::error::SolverError;
use crate::local_search::{self, LocalSearchMode};
use crate::pheromone::PheromoneMatrix;
use crate::tour::Tour;

/// Which ants contribute extra pheromone beyond the base AS deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// Every ant deposits `Q / L_a` on its own tour's edges.
    AS,
    /// AS, plus the global-best tour additionally deposits `e * Q / L_gb`.
    Elitist,
    /// The top `r` ants by tour length deposit `(r - rank) * Q / L_a`;
    /// the global-best tour additionally deposits `r * Q / L_gb`.
    Rank,
}

/// A progress snapshot handed to the caller's callback.
pub struct ProgressEvent<'a> {
    pub iteration: u64,
    pub best_distance: f64,
    pub best_sequence: &'a [usize],
    pub history: &'a [f64],
}

type ProgressCallback = Box<dyn Fn(ProgressEvent<'_>) + Send + Sync>;

/// Tunable parameters for one colony run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColonyConfig {
    pub num_ants: usize,
    pub alpha: f64,
    pub beta: f64,
    pub rho: f64,
    pub q: f64,
    pub use_parallel: bool,
    pub num_threads: usize,
    pub use_local_search: bool,
    pub use_3opt: bool,
    pub local_search_mode: LocalSearchMode,
    pub variant: Variant,
    pub elitist_weight: f64,
    pub rank_size: usize,
    pub convergence_threshold: u64,
    pub callback_interval: u64,
    pub seed: u64,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        ColonyConfig {
            num_ants: 20,
            alpha: 1.0,
            beta: 2.0,
            rho: 0.5,
            q: 100.0,
            use_parallel: true,
            num_threads: 0,
            use_local_search: false,
            use_3opt: true,
            local_search_mode: LocalSearchMode::Best,
            variant: Variant::AS,
            elitist_weight: 1.0,
            rank_size: 6,
            convergence_threshold: 200,
            callback_interval: 10,
            seed: 0,
        }
    }
}

impl ColonyConfig {
    fn validate(&self) -> Result<(), SolverError> {
        if self.num_ants < 1 {
            return Err(SolverError::InvalidParameter(format!(
                "num_ants must be >= 1, got {}",
                self.num_ants
            )));
        }
        if self.alpha < 0.0 {
            return Err(SolverError::InvalidParameter(format!("alpha must be >= 0, got {}", self.alpha)));
        }
        if self.beta < 0.0 {
            return Err(SolverError::InvalidParameter(format!("beta must be >= 0, got {}", self.beta)));
        }
        if !(0.0..=1.0).contains(&self.rho) {
            return Err(SolverError::InvalidParameter(format!("rho must be in [0, 1], got {}", self.rho)));
        }
        if self.q <= 0.0 {
            return Err(SolverError::InvalidParameter(format!("q must be > 0, got {}", self.q)));
        }
        if self.rank_size < 1 {
            return Err(SolverError::InvalidParameter(format!(
                "rank_size must be >= 1, got {}",
                self.rank_size
            )));
        }
        if self.elitist_weight < 0.0 {
            return Err(SolverError::InvalidParameter(format!(
                "elitist_weight must be >= 0, got {}",
                self.elitist_weight
            )));
        }
        if self.callback_interval < 1 {
            return Err(SolverError::InvalidParameter(format!(
                "callback_interval must be >= 1, got {}",
                self.callback_interval
            )));
        }
        Ok(())
    }
}

/// The result of a `solve` call: the best tour found and whether the
/// run ended via external cancellation rather than reaching its
/// termination condition naturally.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub best_tour: Tour,
    pub cancelled: bool,
}

/// Owns the graph, pheromone matrix, and iteration state for one colony
/// run. Not `Clone`: a colony's pheromone matrix and convergence
/// history are mutated in place across `solve`.
pub struct Colony {
    graph: Graph,
    config: ColonyConfig,
    pheromone: Option<PheromoneMatrix>,
    global_best: Tour,
    convergence_history: Vec<f64>,
    iteration: u64,
    no_improve: u64,
    cancel_flag: Arc<AtomicBool>,
    progress_callback: Option<ProgressCallback>,
    initialized: bool,
}

impl Colony {
    /// Build a colony for `graph` with the given configuration.
    /// Validates parameters eagerly so a caller never discovers a bad
    /// `num_ants` or `rho` only after burning an iteration.
    pub fn new(graph: Graph, config: ColonyConfig) -> Result<Self, SolverError> {
        config.validate()?;
        Ok(Colony {
            graph,
            config,
            pheromone: None,
            global_best: Tour::default(),
            convergence_history: Vec::new(),
            iteration: 0,
            no_improve: 0,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            progress_callback: None,
            initialized: false,
        })
    }

    pub fn set_use_parallel(&mut self, use_parallel: bool) {
        self.config.use_parallel = use_parallel;
    }

    pub fn set_num_threads(&mut self, num_threads: usize) {
        self.config.num_threads = num_threads;
    }

    pub fn set_use_local_search(&mut self, use_local_search: bool) {
        self.config.use_local_search = use_local_search;
    }

    pub fn set_use_3opt(&mut self, use_3opt: bool) {
        self.config.use_3opt = use_3opt;
    }

    pub fn set_local_search_mode(&mut self, mode: LocalSearchMode) {
        self.config.local_search_mode = mode;
    }

    pub fn set_variant(&mut self, variant: Variant) {
        self.config.variant = variant;
    }

    pub fn set_elitist_weight(&mut self, weight: f64) -> Result<(), SolverError> {
        if weight < 0.0 {
            return Err(SolverError::InvalidParameter(format!("elitist_weight must be >= 0, got {weight}")));
        }
        self.config.elitist_weight = weight;
        Ok(())
    }

    pub fn set_rank_size(&mut self, rank_size: usize) -> Result<(), SolverError> {
        if rank_size < 1 {
            return Err(SolverError::InvalidParameter(format!("rank_size must be >= 1, got {rank_size}")));
        }
        self.config.rank_size = rank_size;
        Ok(())
    }

    pub fn set_convergence_threshold(&mut self, threshold: u64) {
        self.config.convergence_threshold = threshold;
    }

    pub fn set_callback_interval(&mut self, interval: u64) -> Result<(), SolverError> {
        if interval < 1 {
            return Err(SolverError::InvalidParameter(format!("callback_interval must be >= 1, got {interval}")));
        }
        self.config.callback_interval = interval;
        Ok(())
    }

    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(ProgressEvent<'_>) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
    }

    /// A cloneable handle the caller can flip from another thread to
    /// request termination.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_flag)
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Reset pheromone to `tau0 = M / L_nn` and clear all iteration
    /// state. Must be called before `solve`.
    pub fn initialize(&mut self) {
        let l_nn = self.graph.nearest_neighbor_tour_length();
        let tau0 = if l_nn > 0.0 {
            self.config.num_ants as f64 / l_nn
        } else {
            self.config.num_ants as f64
        };
        self.pheromone = Some(PheromoneMatrix::new(self.graph.num_cities(), tau0));
        self.global_best = Tour::default();
        self.convergence_history.clear();
        self.iteration = 0;
        self.no_improve = 0;
        self.cancel_flag.store(false, Ordering::SeqCst);
        self.initialized = true;
    }

    pub fn get_convergence_data(&self) -> &[f64] {
        &self.convergence_history
    }

    /// Run `f` inside a scoped pool of `num_threads` workers when that
    /// count is non-zero, so multiple colonies in the same process with
    /// different thread counts don't contend over rayon's global pool.
    /// `num_threads == 0` means "auto": fall through to the global pool.
    fn with_thread_pool<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        if self.config.num_threads == 0 {
            return f();
        }
        match rayon::ThreadPoolBuilder::new().num_threads(self.config.num_threads).build() {
            Ok(pool) => pool.install(f),
            Err(e) => {
                log::warn!("failed to build a {}-thread pool, falling back to global pool: {e}", self.config.num_threads);
                f()
            }
        }
    }

    fn construct_all_tours(&self, pheromone: &PheromoneMatrix, iteration: u64) -> Vec<Tour> {
        let n = self.config.num_ants;
        let graph = &self.graph;
        let alpha = self.config.alpha;
        let beta = self.config.beta;
        let colony_seed = self.config.seed;

        let build = |ant_index: usize| -> Tour {
            let seed = ant_seed(colony_seed, iteration, ant_index as u64);
            let mut ant = Ant::new(seed);
            ant.construct(graph, pheromone, alpha, beta)
        };

        if self.config.use_parallel {
            self.with_thread_pool(|| (0..n).into_par_iter().map(build).collect())
        } else {
            (0..n).map(build).collect()
        }
    }

    /// Index of the shortest tour, breaking ties by the lower ant
    /// index so the min-reduction is independent of scheduling order.
    fn best_index(tours: &[Tour]) -> usize {
        let mut best = 0;
        for i in 1..tours.len() {
            if tours[i].distance < tours[best].distance {
                best = i;
            }
        }
        best
    }

    fn apply_local_search(&self, tours: &mut [Tour]) {
        if !self.config.use_local_search {
            return;
        }
        match self.config.local_search_mode {
            LocalSearchMode::None => {}
            LocalSearchMode::Best => {
                let idx = Self::best_index(tours);
                local_search::improve(&self.graph, &mut tours[idx], self.config.use_3opt);
            }
            LocalSearchMode::All => {
                let use_3opt = self.config.use_3opt;
                if self.config.use_parallel {
                    let graph = &self.graph;
                    self.with_thread_pool(|| {
                        tours.par_iter_mut().for_each(|t| {
                            local_search::improve(graph, t, use_3opt);
                        });
                    });
                } else {
                    for t in tours.iter_mut() {
                        local_search::improve(&self.graph, t, use_3opt);
                    }
                }
            }
        }
    }

    fn deposit(&self, pheromone: &mut PheromoneMatrix, tours: &[Tour], global_best: &Tour) {
        match self.config.variant {
            Variant::AS => {
                for tour in tours {
                    let delta = self.config.q / tour.distance;
                    pheromone.deposit_tour(&tour.sequence, delta);
                }
            }
            Variant::Elitist => {
                for tour in tours {
                    let delta = self.config.q / tour.distance;
                    pheromone.deposit_tour(&tour.sequence, delta);
                }
                let elite_delta = self.config.elitist_weight * self.config.q / global_best.distance;
                pheromone.deposit_tour(&global_best.sequence, elite_delta);
            }
            Variant::Rank => {
                let mut ranked: Vec<&Tour> = tours.iter().collect();
                ranked.sort_by(|a, b| a.distance.partial_cmp(&b.distance).expect("tour distances are always finite"));
                let r = self.config.rank_size.min(ranked.len());
                for (rank, tour) in ranked.iter().take(r).enumerate() {
                    let weight = (r - rank) as f64;
                    let delta = weight * self.config.q / tour.distance;
                    pheromone.deposit_tour(&tour.sequence, delta);
                }
                let rank_delta = r as f64 * self.config.q / global_best.distance;
                pheromone.deposit_tour(&global_best.sequence, rank_delta);
            }
        }
    }

    /// Run up to `max_iters` iterations (fixed mode, `max_iters >= 0`)
    /// or until `no_improve` reaches the convergence threshold
    /// (`max_iters < 0`). Returns the best tour found; `cancelled` is
    /// set if an external cancel request ended the run early.
    pub fn solve(&mut self, max_iters: i64) -> Result<SolveOutcome, SolverError> {
        if !self.initialized {
            return Err(SolverError::NotInitialized);
        }

        let convergence_mode = max_iters < 0;
        let mut pheromone = self.pheromone.take().ok_or(SolverError::NotInitialized)?;

        let run_result = (|| -> Result<(), SolverError> {
            loop {
                if self.cancel_flag.load(Ordering::SeqCst) {
                    return Ok(());
                }
                if !convergence_mode && self.iteration >= max_iters as u64 {
                    return Ok(());
                }
                if convergence_mode && self.no_improve >= self.config.convergence_threshold {
                    return Ok(());
                }

                let mut tours = self.construct_all_tours(&pheromone, self.iteration);
                if tours.iter().any(|t| !t.distance.is_finite()) {
                    return Err(SolverError::InternalError(
                        "ant construction produced a non-finite tour distance".to_string(),
                    ));
                }

                self.apply_local_search(&mut tours);

                let best_idx = Self::best_index(&tours);
                let iteration_best = tours[best_idx].clone();

                if iteration_best.distance < self.global_best.distance {
                    self.global_best = iteration_best.clone();
                    self.no_improve = 0;
                } else {
                    self.no_improve += 1;
                }

                self.convergence_history.push(self.global_best.distance);

                pheromone.evaporate(self.config.rho);
                self.deposit(&mut pheromone, &tours, &self.global_best);

                self.iteration += 1;

                if self.iteration % self.config.callback_interval == 0 {
                    if let Some(callback) = &self.progress_callback {
                        callback(ProgressEvent {
                            iteration: self.iteration,
                            best_distance: self.global_best.distance,
                            best_sequence: &self.global_best.sequence,
                            history: &self.convergence_history,
                        });
                    }
                }

                log::info!(
                    "iteration {} best={:.2} global_best={:.2} no_improve={}",
                    self.iteration,
                    iteration_best.distance,
                    self.global_best.distance,
                    self.no_improve
                );
            }
        })();

        self.pheromone = Some(pheromone);
        run_result?;

        Ok(SolveOutcome {
            best_tour: self.global_best.clone(),
            cancelled: self.cancel_flag.load(Ordering::SeqCst),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::City;

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
    fn solve_before_initialize_is_an_error() {
        let g = square();
        let mut colony = Colony::new(g, ColonyConfig::default()).unwrap();
        let err = colony.solve(10).unwrap_err();
        assert!(matches!(err, SolverError::NotInitialized));
    }

    #[test]
    fn rejects_invalid_parameters_at_construction() {
        let g = square();
        let config = ColonyConfig {
            num_ants: 0,
            ..ColonyConfig::default()
        };
        let err = Colony::new(g, config).unwrap_err();
        assert!(matches!(err, SolverError::InvalidParameter(_)));
    }

    #[test]
    fn solve_finds_the_perimeter_tour_on_a_square() {
        let g = square();
        let config = ColonyConfig {
            num_ants: 8,
            use_parallel: false,
            seed: 1,
            ..ColonyConfig::default()
        };
        let mut colony = Colony::new(g, config).unwrap();
        colony.initialize();
        let outcome = colony.solve(30).unwrap();
        assert!((outcome.best_tour.distance - 4.0).abs() < 1e-6);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn global_best_distance_never_increases_across_iterations() {
        let g = square();
        let config = ColonyConfig {
            num_ants: 6,
            use_parallel: false,
            seed: 2,
            ..ColonyConfig::default()
        };
        let mut colony = Colony::new(g, config).unwrap();
        colony.initialize();
        colony.solve(20).unwrap();
        let history = colony.get_convergence_data();
        for window in history.windows(2) {
            assert!(window[1] <= window[0] + 1e-9);
        }
    }

    #[test]
    fn serial_runs_with_identical_seed_are_bit_identical() {
        let build = || {
            let g = square();
            let config = ColonyConfig {
                num_ants: 10,
                use_parallel: false,
                seed: 77,
                ..ColonyConfig::default()
            };
            let mut colony = Colony::new(g, config).unwrap();
            colony.initialize();
            colony.solve(15).unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a.best_tour.sequence, b.best_tour.sequence);
        assert_eq!(a.best_tour.distance, b.best_tour.distance);
    }

    #[test]
    fn parallel_and_serial_runs_agree_on_best_distance() {
        let build = |parallel: bool| {
            let g = square();
            let config = ColonyConfig {
                num_ants: 10,
                use_parallel: parallel,
                seed: 55,
                ..ColonyConfig::default()
            };
            let mut colony = Colony::new(g, config).unwrap();
            colony.initialize();
            colony.solve(15).unwrap()
        };
        let serial = build(false);
        let parallel = build(true);
        assert_eq!(serial.best_tour.distance, parallel.best_tour.distance);
    }

    #[test]
    fn convergence_mode_terminates_on_a_four_city_square() {
        let g = square();
        let config = ColonyConfig {
            num_ants: 6,
            use_parallel: false,
            seed: 3,
            convergence_threshold: 50,
            ..ColonyConfig::default()
        };
        let mut colony = Colony::new(g, config).unwrap();
        colony.initialize();
        let outcome = colony.solve(-1).unwrap();
        assert!((outcome.best_tour.distance - 4.0).abs() < 1e-6);
    }

    #[test]
    fn cancelling_before_the_first_iteration_returns_immediately() {
        let g = square();
        let config = ColonyConfig {
            num_ants: 6,
            use_parallel: false,
            seed: 4,
            ..ColonyConfig::default()
        };
        let mut colony = Colony::new(g, config).unwrap();
        colony.initialize();
        colony.cancel();
        let outcome = colony.solve(100).unwrap();
        assert!(outcome.cancelled);
        assert_eq!(colony.get_convergence_data().len(), 0);
    }

    #[test]
    fn elitist_variant_converges_on_a_square() {
        let g = square();
        let config = ColonyConfig {
            num_ants: 8,
            use_parallel: false,
            seed: 5,
            variant: Variant::Elitist,
            elitist_weight: 2.0,
            ..ColonyConfig::default()
        };
        let mut colony = Colony::new(g, config).unwrap();
        colony.initialize();
        let outcome = colony.solve(30).unwrap();
        assert!((outcome.best_tour.distance - 4.0).abs() < 1e-6);
    }

    #[test]
    fn rank_variant_converges_on_a_square() {
        let g = square();
        let config = ColonyConfig {
            num_ants: 8,
            use_parallel: false,
            seed: 6,
            variant: Variant::Rank,
            rank_size: 3,
            ..ColonyConfig::default()
        };
        let mut colony = Colony::new(g, config).unwrap();
        colony.initialize();
        let outcome = colony.solve(30).unwrap();
        assert!((outcome.best_tour.distance - 4.0).abs() < 1e-6);
    }

    #[test]
    fn progress_callback_fires_at_the_configured_interval() {
        use std::sync::Mutex;

        let g = square();
        let config = ColonyConfig {
            num_ants: 6,
            use_parallel: false,
            seed: 9,
            callback_interval: 5,
            ..ColonyConfig::default()
        };
        let mut colony = Colony::new(g, config).unwrap();
        colony.initialize();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = Arc::clone(&calls);
        colony.set_progress_callback(move |event| {
            calls_clone.lock().unwrap().push(event.iteration);
        });
        colony.solve(12).unwrap();
        let recorded = calls.lock().unwrap();
        assert_eq!(*recorded, vec![5, 10]);
    }
}
