//! dca: advantage estimation for RLVR batches
//!
//! Provides subcommands around the library:
//!
//! - `advantage` -- Compute advantages for a JSON batch
//! - `reward`    -- Shape scalar rewards for a JSON batch
//! - `verify`    -- Run the numeric sanity checks
//! - `simulate`  -- Toy CPU validation of DCA vs the coupled length penalty,
//!   at one seed or over a seed list
//! - `pass-at-k` -- Mean pass@k over per-problem correct counts
//! - `aes`       -- Accuracy-efficiency score against a base model

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use dca::adapter::BatchAdapter;
use dca::advantage::Mode;
use dca::config::DcaConfig;
use dca::{metrics, simulate, verify};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// dca: Decoupled Conditional Advantage for RLVR
#[derive(Parser)]
#[command(name = "dca", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute advantages for a batch file.
    Advantage {
        /// JSON object with per-response rewards and lengths.
        #[arg(long)]
        input: PathBuf,

        /// Estimator mode: vanilla, grpo_lp, dca or dca_rloo.
        #[arg(long)]
        mode: Option<Mode>,

        /// Length weight for DCA.
        #[arg(long)]
        beta: Option<f64>,

        /// Length penalty for grpo_lp.
        #[arg(long)]
        gamma: Option<f64>,

        /// Use the leave-one-out baseline for `dca`.
        #[arg(long)]
        rloo: bool,

        /// Disable pass-rate scaling of the length term (plain DCA).
        #[arg(long)]
        static_length: bool,

        /// Responses per prompt for flat batches.
        #[arg(long)]
        group_size: Option<usize>,

        /// Write advantages here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Shape scalar rewards for a batch file.
    Reward {
        /// JSON object with per-response rewards (or correctness) and lengths.
        #[arg(long)]
        input: PathBuf,

        /// Shaping mode.
        #[arg(long)]
        mode: Option<Mode>,

        /// Length penalty for grpo_lp.
        #[arg(long)]
        gamma: Option<f64>,
    },

    /// Run the numeric sanity checks.
    Verify,

    /// Toy CPU validation: DCA vs coupled length penalty.
    Simulate {
        /// Number of update steps.
        #[arg(long)]
        steps: Option<usize>,

        /// RNG seed.
        #[arg(long, conflicts_with_all = ["seeds", "multi"])]
        seed: Option<u64>,

        /// Comma-separated seeds; runs the comparison once per seed.
        #[arg(long, value_delimiter = ',')]
        seeds: Vec<u64>,

        /// Run over the default seed list (42 to 51).
        #[arg(long)]
        multi: bool,
    },

    /// Mean pass@k over problems.
    PassAtK {
        /// Samples per problem.
        #[arg(long)]
        n: usize,

        /// k.
        #[arg(long, default_value_t = 1)]
        k: usize,

        /// Correct count for each problem.
        #[arg(required = true)]
        correct: Vec<usize>,
    },

    /// Accuracy-efficiency score.
    Aes {
        #[arg(long)]
        pass1: f64,
        #[arg(long)]
        pass1_base: f64,
        #[arg(long)]
        tokens: f64,
        #[arg(long)]
        tokens_base: f64,
    },
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DcaConfig::load_from_file(path)?,
        None => DcaConfig::default(),
    };

    match cli.command {
        Commands::Advantage {
            input,
            mode,
            beta,
            gamma,
            rloo,
            static_length,
            group_size,
            output,
        } => {
            let adv = &mut config.advantage;
            if let Some(mode) = mode {
                adv.mode = mode;
            }
            if let Some(beta) = beta {
                adv.beta = beta;
            }
            if let Some(gamma) = gamma {
                adv.gamma = gamma;
            }
            adv.use_rloo |= rloo;
            if static_length {
                adv.use_dynamic = false;
            }
            if group_size.is_some() {
                config.adapter.group_size = group_size;
            }
            cmd_advantage(&config, &input, output.as_deref())
        }
        Commands::Reward { input, mode, gamma } => {
            let mode = mode.unwrap_or(config.advantage.mode);
            let gamma = gamma.unwrap_or(config.advantage.gamma);
            cmd_reward(&config, &input, mode, gamma)
        }
        Commands::Verify => cmd_verify(),
        Commands::Simulate {
            steps,
            seed,
            seeds,
            multi,
        } => {
            if let Some(steps) = steps {
                config.simulation.steps = steps;
            }
            if let Some(seed) = seed {
                config.simulation.seed = seed;
            }
            if !seeds.is_empty() {
                cmd_simulate_seeds(&config, &seeds)
            } else if multi {
                cmd_simulate_seeds(&config, &simulate::DEFAULT_SEEDS)
            } else {
                cmd_simulate(&config)
            }
        }
        Commands::PassAtK { n, k, correct } => {
            println!("{:.6}", metrics::pass_at_k_multi(n, &correct, k));
            Ok(())
        }
        Commands::Aes {
            pass1,
            pass1_base,
            tokens,
            tokens_base,
        } => {
            println!("{:.6}", metrics::aes_score(pass1, pass1_base, tokens, tokens_base));
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn read_batch(path: &Path) -> Result<Map<String, Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch from {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse batch from {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("Batch in {} must be a JSON object", path.display()),
    }
}

fn cmd_advantage(config: &DcaConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    tracing::info!(
        mode = %config.advantage.mode,
        beta = config.advantage.beta,
        dynamic = config.advantage.use_dynamic,
        "Computing advantages"
    );

    let batch = read_batch(input)?;
    let adapter = BatchAdapter::new(config.adapter.clone());
    let advantages = adapter
        .compute(&batch, &config.advantage)
        .context("Advantage computation failed")?;

    let json = serde_json::to_string_pretty(&advantages)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "Saved advantages");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_reward(config: &DcaConfig, input: &Path, mode: Mode, gamma: f64) -> Result<()> {
    tracing::info!(%mode, gamma, "Shaping rewards");

    let batch = read_batch(input)?;
    let rewards = BatchAdapter::new(config.adapter.clone())
        .shape(&batch, mode, gamma)
        .context("Reward shaping failed")?;

    println!("{}", serde_json::to_string_pretty(&rewards)?);
    Ok(())
}

fn cmd_verify() -> Result<()> {
    let outcomes = verify::run_all();
    for outcome in &outcomes {
        let tag = if outcome.passed { "PASS" } else { "FAIL" };
        println!("[{tag}] {}: {}", outcome.name, outcome.detail);
    }

    let failed = outcomes.iter().filter(|o| !o.passed).count();
    if failed > 0 {
        bail!("{failed} verification check(s) failed");
    }
    println!("\nAll verification checks passed.");
    Ok(())
}

fn cmd_simulate(config: &DcaConfig) -> Result<()> {
    let sim = &config.simulation;
    tracing::info!(steps = sim.steps, seed = sim.seed, group_size = sim.group_size, "Running toy simulation");

    let comparison = simulate::compare(sim)?;

    println!("  Method        | final lambda | acc (last 20) | lambda trend");
    println!("  --------------|--------------|---------------|-------------");
    for (label, history) in [("DCA", &comparison.dca), ("Coupled LP", &comparison.coupled)] {
        let first = history.lambdas.first().copied().unwrap_or_default();
        println!(
            "  {label:<13} | {:>12.1} | {:>13.3} | {:+.1}",
            history.final_lambda(),
            history.recent_accuracy(20),
            history.final_lambda() - first,
        );
    }

    if !comparison.passed() {
        bail!(
            "lambda left the healthy range [{}, {}]",
            simulate::HEALTHY_LAMBDA.0,
            simulate::HEALTHY_LAMBDA.1
        );
    }
    println!("\n  [PASS] both estimators kept lambda in range");
    Ok(())
}

fn cmd_simulate_seeds(config: &DcaConfig, seeds: &[u64]) -> Result<()> {
    let sim = &config.simulation;
    tracing::info!(runs = seeds.len(), steps = sim.steps, group_size = sim.group_size, "Running multi-seed simulation");

    let reports = simulate::compare_seeds(sim, seeds)?;

    println!("  Seed  | DCA lambda | Coupled LP lambda | status");
    println!("  ------|------------|-------------------|----------");
    for report in &reports {
        let c = &report.comparison;
        println!(
            "  {:<5} | {:>10.1} | {:>17.1} | {}",
            report.seed,
            c.dca.final_lambda(),
            c.coupled.final_lambda(),
            if report.passed() { "healthy" } else { "UNHEALTHY" },
        );
    }

    let failed: Vec<u64> = reports.iter().filter(|r| !r.passed()).map(|r| r.seed).collect();
    if !failed.is_empty() {
        bail!(
            "lambda left the healthy range [{}, {}] for seeds {failed:?}",
            simulate::HEALTHY_LAMBDA.0,
            simulate::HEALTHY_LAMBDA.1
        );
    }
    println!("\n  [PASS] {} of {} seeds healthy", reports.len(), reports.len());
    Ok(())
}
