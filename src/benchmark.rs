//! Benchmark runner: sweeps variant x local-search-mode combinations
//! across a directory of TSPLIB instances and aggregates repeated-seed
//! statistics into a CSV report.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::colony::{Colony, ColonyConfig, Variant};
use crate::error::SolverError;
use crate::loader::load_tsplib_file;
use crate::local_search::LocalSearchMode;

/// One row of the benchmark CSV: a single (instance, variant, mode,
/// seed) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub timestamp: String,
    pub instance: String,
    pub dimension: usize,
    pub variant: String,
    pub local_search_mode: String,
    pub seed: u64,
    pub iterations: u64,
    pub best_distance: f64,
    pub cancelled: bool,
}

/// Mean and population standard deviation of `best_distance` across
/// the repeated seeds of one (instance, variant, mode) combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub instance: String,
    pub variant: String,
    pub local_search_mode: String,
    pub num_runs: usize,
    pub mean_distance: f64,
    pub std_dev_distance: f64,
    pub best_distance: f64,
}

/// Sweep parameters for [`run_benchmark`].
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub num_runs: usize,
    pub iterations: i64,
    pub num_ants: usize,
    pub base_seed: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            iterations: 100,
            num_ants: 20,
            base_seed: 0,
        }
    }
}

const VARIANTS: [(&str, Variant); 3] = [("AS", Variant::AS), ("Elitist", Variant::Elitist), ("Rank", Variant::Rank)];
const MODES: [(&str, LocalSearchMode); 2] = [("best", LocalSearchMode::Best), ("all", LocalSearchMode::All)];

/// Number of deposit variants swept by [`run_benchmark`]; exposed so a
/// caller can size a progress bar without duplicating the sweep list.
pub const VARIANT_COUNT: usize = VARIANTS.len();
/// Number of local-search modes swept by [`run_benchmark`].
pub const MODE_COUNT: usize = MODES.len();

/// Load every `.tsp` file in `dir`, sorted by name, skipping files that
/// fail to parse (logged as a warning rather than aborting the sweep).
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<(String, PathBuf)> {
    let mut entries = Vec::new();
    if let Ok(read_dir) = std::fs::read_dir(dir) {
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "tsp").unwrap_or(false) {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                entries.push((name, path));
            }
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// Run the full variant x mode x seed sweep over every instance found
/// in `dir`. `on_progress` is called once per completed run, for a
/// caller-driven progress bar.
pub fn run_benchmark(
    dir: &Path,
    config: &BenchmarkConfig,
    timestamp: &str,
    mut on_progress: impl FnMut(&str),
) -> Result<Vec<BenchmarkRow>, SolverError> {
    let instances = load_instances_from_dir(dir);
    let mut rows = Vec::new();

    for (name, path) in &instances {
        let graph = match load_tsplib_file(path) {
            Ok(g) => g,
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                continue;
            }
        };

        for (variant_name, variant) in VARIANTS {
            for (mode_name, mode) in MODES {
                for run in 0..config.num_runs {
                    let seed = config.base_seed.wrapping_add(run as u64);
                    let colony_config = ColonyConfig {
                        num_ants: config.num_ants,
                        variant,
                        local_search_mode: mode,
                        use_local_search: true,
                        seed,
                        ..ColonyConfig::default()
                    };
                    let mut colony = Colony::new(graph.clone(), colony_config)?;
                    colony.initialize();
                    let outcome = colony.solve(config.iterations)?;

                    rows.push(BenchmarkRow {
                        timestamp: timestamp.to_string(),
                        instance: name.clone(),
                        dimension: graph.num_cities(),
                        variant: variant_name.to_string(),
                        local_search_mode: mode_name.to_string(),
                        seed,
                        iterations: config.iterations.max(0) as u64,
                        best_distance: outcome.best_tour.distance,
                        cancelled: outcome.cancelled,
                    });

                    on_progress(name);
                }
            }
        }
    }

    Ok(rows)
}

/// Aggregate per-(instance, variant, mode) mean/stddev across the
/// repeated-seed rows produced by [`run_benchmark`].
pub fn summarize(rows: &[BenchmarkRow]) -> Vec<BenchmarkSummary> {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(String, String, String), Vec<f64>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.instance.clone(), row.variant.clone(), row.local_search_mode.clone()))
            .or_default()
            .push(row.best_distance);
    }

    let mut summaries = Vec::with_capacity(groups.len());
    for ((instance, variant, mode), distances) in groups {
        let mean_distance = distances.clone().mean();
        let std_dev_distance = distances.clone().population_std_dev();
        let best_distance = distances.iter().cloned().fold(f64::INFINITY, f64::min);
        summaries.push(BenchmarkSummary {
            instance,
            variant,
            local_search_mode: mode,
            num_runs: distances.len(),
            mean_distance,
            std_dev_distance,
            best_distance,
        });
    }
    summaries
}

/// Write benchmark rows to a CSV file.
pub fn export_rows_csv<P: AsRef<Path>>(rows: &[BenchmarkRow], path: P) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()
}

/// Write summary statistics to a CSV file.
pub fn export_summaries_csv<P: AsRef<Path>>(summaries: &[BenchmarkSummary], path: P) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer.flush()
}
