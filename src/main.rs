//! Ant Colony Optimization TSP solver - Command Line Interface

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use aco_tsp_solver::benchmark::{self, BenchmarkConfig};
use aco_tsp_solver::colony::{Colony, ColonyConfig, ProgressEvent, Variant};
use aco_tsp_solver::loader::load_tsplib_file;
use aco_tsp_solver::local_search::LocalSearchMode;

#[derive(Parser)]
#[command(name = "aco-tsp-solver")]
#[command(author = "Etudiant M2 AI2D")]
#[command(version = "0.1.0")]
#[command(about = "An Ant Colony Optimization solver for the symmetric Travelling Salesman Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single TSPLIB instance
    Solve {
        /// Path to the TSPLIB instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Number of ants
        #[arg(long, default_value = "20")]
        ants: usize,

        /// Number of iterations (negative for convergence mode)
        #[arg(long, default_value = "100")]
        iterations: i64,

        /// Pheromone exponent
        #[arg(long, default_value = "1.0")]
        alpha: f64,

        /// Heuristic exponent
        #[arg(long, default_value = "2.0")]
        beta: f64,

        /// Evaporation rate
        #[arg(long, default_value = "0.5")]
        rho: f64,

        /// Deposit scale
        #[arg(long, default_value = "100.0")]
        q: f64,

        /// Deposit variant
        #[arg(long, value_enum, default_value = "as")]
        variant: VariantArg,

        /// Enable local search
        #[arg(long)]
        local_search: bool,

        /// Enable 3-opt in addition to 2-opt (only when local search is enabled)
        #[arg(long, default_value = "true")]
        use_3opt: bool,

        /// Which ants' tours local search is applied to
        #[arg(long, value_enum, default_value = "best")]
        local_search_mode: LocalSearchModeArg,

        /// Number of worker threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Write the solution to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the variant x local-search-mode sweep over a directory of instances
    Bench {
        /// Directory containing `.tsp` instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Number of repeated seeds per (instance, variant, mode) combination
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Iterations per run
        #[arg(long, default_value = "100")]
        iterations: i64,

        /// Write the row-level CSV to this path
        #[arg(short, long, default_value = "benchmark.csv")]
        output: PathBuf,

        /// Write the summary CSV to this path
        #[arg(long, default_value = "benchmark_summary.csv")]
        summary_output: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum VariantArg {
    As,
    Elitist,
    Rank,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::As => Variant::AS,
            VariantArg::Elitist => Variant::Elitist,
            VariantArg::Rank => Variant::Rank,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum LocalSearchModeArg {
    None,
    Best,
    All,
}

impl From<LocalSearchModeArg> for LocalSearchMode {
    fn from(arg: LocalSearchModeArg) -> Self {
        match arg {
            LocalSearchModeArg::None => LocalSearchMode::None,
            LocalSearchModeArg::Best => LocalSearchMode::Best,
            LocalSearchModeArg::All => LocalSearchMode::All,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            ants,
            iterations,
            alpha,
            beta,
            rho,
            q,
            variant,
            local_search,
            use_3opt,
            local_search_mode,
            threads,
            seed,
            output,
        } => solve_instance(
            &instance,
            ants,
            iterations,
            alpha,
            beta,
            rho,
            q,
            variant.into(),
            local_search,
            use_3opt,
            local_search_mode.into(),
            threads,
            seed,
            output,
        ),

        Commands::Bench {
            dir,
            runs,
            iterations,
            output,
            summary_output,
        } => run_bench(&dir, runs, iterations, &output, &summary_output),
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    path: &PathBuf,
    ants: usize,
    iterations: i64,
    alpha: f64,
    beta: f64,
    rho: f64,
    q: f64,
    variant: Variant,
    local_search: bool,
    use_3opt: bool,
    local_search_mode: LocalSearchMode,
    threads: usize,
    seed: u64,
    output: Option<PathBuf>,
) {
    println!("Loading instance from {:?}...", path);

    let graph = match load_tsplib_file(path) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error loading instance: {e}");
            std::process::exit(1);
        }
    };
    println!("Loaded {} cities.", graph.num_cities());

    let config = ColonyConfig {
        num_ants: ants,
        alpha,
        beta,
        rho,
        q,
        variant,
        use_local_search: local_search,
        use_3opt,
        local_search_mode,
        num_threads: threads,
        seed,
        ..ColonyConfig::default()
    };

    let mut colony = match Colony::new(graph, config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid parameters: {e}");
            std::process::exit(1);
        }
    };
    colony.initialize();
    colony.set_progress_callback(|event: ProgressEvent<'_>| {
        println!("iteration {:>5}  best = {:.2}", event.iteration, event.best_distance);
    });

    println!("Solving...");
    let start = Instant::now();
    let outcome = match colony.solve(iterations) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Solve failed: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    println!(
        "Best distance: {:.2} (cancelled: {}, elapsed: {:.3}s)",
        outcome.best_tour.distance, outcome.cancelled, elapsed
    );

    if let Some(path) = output {
        match serde_json::to_string_pretty(&outcome.best_tour) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    eprintln!("Failed to write output: {e}");
                    std::process::exit(1);
                }
                println!("Wrote solution to {:?}", path);
            }
            Err(e) => eprintln!("Failed to serialize solution: {e}"),
        }
    }
}

fn run_bench(dir: &PathBuf, runs: usize, iterations: i64, output: &PathBuf, summary_output: &PathBuf) {
    let instances = benchmark::load_instances_from_dir(dir);
    if instances.is_empty() {
        eprintln!("No .tsp files found in {:?}", dir);
        std::process::exit(1);
    }

    let total_runs = instances.len() * benchmark::VARIANT_COUNT * benchmark::MODE_COUNT * runs;
    let progress = ProgressBar::new(total_runs as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("progress bar template is valid"),
    );

    let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let config = BenchmarkConfig {
        num_runs: runs,
        iterations,
        ..BenchmarkConfig::default()
    };

    let rows = match benchmark::run_benchmark(dir, &config, &timestamp, |name| {
        progress.set_message(name.to_string());
        progress.inc(1);
    }) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("Benchmark failed: {e}");
            std::process::exit(1);
        }
    };
    progress.finish_with_message("done");

    if let Err(e) = benchmark::export_rows_csv(&rows, output) {
        eprintln!("Failed to write {:?}: {e}", output);
        std::process::exit(1);
    }
    println!("Wrote {} rows to {:?}", rows.len(), output);

    let summaries = benchmark::summarize(&rows);
    if let Err(e) = benchmark::export_summaries_csv(&summaries, summary_output) {
        eprintln!("Failed to write {:?}: {e}", summary_output);
        std::process::exit(1);
    }
    println!("Wrote {} summary rows to {:?}", summaries.len(), summary_output);

    for summary in &summaries {
        println!(
            "{:<12} {:<8} {:<5} mean={:.2} std={:.2} best={:.2}",
            summary.instance,
            summary.variant,
            summary.local_search_mode,
            summary.mean_distance,
            summary.std_dev_distance,
            summary.best_distance
        );
    }
}
