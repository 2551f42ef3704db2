//! RegimeGate CLI: run, optimize and inspect validators.
//!
//! Commands:
//! - `run`: baseline vs regime-adaptive evaluation on the synthetic market
//! - `optimize`: random search over validator parameters and position sizes
//! - `simulate`: one validator over synthetic or CSV prices
//! - `validators`: list validator kinds and their default parameters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use regimegate_core::domain::prices;
use regimegate_core::market::labeled_scenarios;
use regimegate_core::validator::{default_params, ValidatorKind};
use regimegate_runner::export::{save_artifacts, save_search_outcome, save_validator_run};
use regimegate_runner::{
    load_prices, parse_param, random_search, run_to_file, short_run_id, Decider,
    FallbackDecider, PipelineConfig, PipelineResult, RuleBasedDecider, SearchSpace,
    SystemClock, ValidatorRun, ValidatorRunResult,
};

#[derive(Parser)]
#[command(
    name = "regimegate",
    about = "RegimeGate: validator evaluation with regime-adaptive selection"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the baseline and the regime-adaptive pipeline once.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the market seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of ticks.
        #[arg(long)]
        n_ticks: Option<usize>,

        /// Decision log path (truncated at start).
        #[arg(long, default_value = "logs/decisions.jsonl")]
        log: PathBuf,

        /// Output directory for summary.csv, per_regime.csv and result.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Substitute a Persistence decision when the decider fails.
        #[arg(long, default_value_t = false)]
        harden_decisions: bool,
    },
    /// Random search over validator parameters and position sizes.
    Optimize {
        /// Path to a TOML config file providing the base configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of candidates to evaluate.
        #[arg(long, default_value_t = 12)]
        iters: usize,

        /// Seed for candidate sampling.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Where to write the search outcome JSON.
        #[arg(long, default_value = "results/best_params.json")]
        output: PathBuf,
    },
    /// Run one validator over a price series.
    Simulate {
        /// Validator kind: EWMA, Volatility or Persistence.
        #[arg(long)]
        validator: String,

        /// Validator or execution parameter as KEY=VALUE (repeatable).
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, f64)>,

        /// CSV file with a price, close or last column. Synthetic prices
        /// when omitted.
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Synthetic series length.
        #[arg(long, default_value_t = 3000)]
        n_ticks: usize,

        /// Synthetic series seed.
        #[arg(long, default_value_t = 123)]
        seed: u64,

        /// Where to write the result JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List validator kinds and their default parameters.
    Validators,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            seed,
            n_ticks,
            log,
            output_dir,
            harden_decisions,
        } => run_cmd(
            config.as_deref(),
            seed,
            n_ticks,
            &log,
            &output_dir,
            harden_decisions,
        ),
        Commands::Optimize {
            config,
            iters,
            seed,
            output,
        } => optimize_cmd(config.as_deref(), iters, seed, &output),
        Commands::Simulate {
            validator,
            params,
            prices,
            n_ticks,
            seed,
            output,
        } => simulate_cmd(
            &validator,
            params,
            prices.as_deref(),
            n_ticks,
            seed,
            output.as_deref(),
        ),
        Commands::Validators => {
            list_validators();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn run_cmd(
    config_path: Option<&Path>,
    seed: Option<u64>,
    n_ticks: Option<usize>,
    log_path: &Path,
    output_dir: &Path,
    harden: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(seed) = seed {
        config.market.seed = seed;
    }
    if let Some(n) = n_ticks {
        config.market.n_ticks = n;
    }

    let ticks = labeled_scenarios(config.market.n_ticks, config.market.seed);
    let rules = RuleBasedDecider::new(config.validators.clone());
    let decider: Box<dyn Decider> = if harden {
        Box::new(FallbackDecider::with_persistence(rules, &config.validators))
    } else {
        Box::new(rules)
    };

    let result = run_to_file(&config, &ticks, &decider, log_path, &SystemClock)
        .context("pipeline run failed")?;

    print_summary(&result);

    let dir = save_artifacts(&result, output_dir)?;
    println!("Decision log: {}", log_path.display());
    println!("Artifacts saved to: {}", dir.display());
    Ok(())
}

fn optimize_cmd(config_path: Option<&Path>, iters: usize, seed: u64, output: &Path) -> Result<()> {
    let base = load_config(config_path)?;
    let outcome = random_search(&base, &SearchSpace::default(), iters, seed)
        .context("random search failed")?;

    match &outcome.best {
        Some(best) => {
            println!("Best candidate: iteration {} (score {:.4})", best.iteration, best.score);
            println!(
                "{}",
                serde_json::to_string_pretty(&best.candidate)
                    .context("failed to serialize candidate")?
            );
        }
        None => println!("No candidates evaluated."),
    }

    save_search_outcome(&outcome, output)?;
    info!(path = %output.display(), "search outcome written");
    println!("Search outcome saved to: {}", output.display());
    Ok(())
}

fn simulate_cmd(
    kind: &str,
    params: Vec<(String, f64)>,
    prices_path: Option<&Path>,
    n_ticks: usize,
    seed: u64,
    output: Option<&Path>,
) -> Result<()> {
    let run = ValidatorRun::from_params(kind, params.into_iter().collect())
        .context("invalid validator run")?;
    let (series, source) = match prices_path {
        Some(path) => (load_prices(path)?, path.display().to_string()),
        None => (
            prices(&labeled_scenarios(n_ticks, seed)),
            format!("synthetic (n_ticks={n_ticks}, seed={seed})"),
        ),
    };
    info!(validator = %run.validator_kind, ticks = series.len(), %source, "single validator run");

    let out = run.run(&series).context("validator run failed")?;
    print_validator_run(&out, &source);

    if let Some(path) = output {
        save_validator_run(&out, path)?;
        println!("Result saved to: {}", path.display());
    }
    Ok(())
}

fn list_validators() {
    for kind in ValidatorKind::ALL {
        let params: Vec<String> = default_params(kind)
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("{:<12} {}", kind.as_str(), params.join(" "));
    }
}

fn print_summary(result: &PipelineResult) {
    let b = &result.baseline;
    let a = &result.aggregate;

    println!();
    println!("=== RegimeGate Run {} ===", short_run_id(&result.run_id));
    println!("{:<24} {:>14} {:>14}", "metric", "baseline", "agent");
    println!("{:<24} {:>14.4} {:>14.4}", "total_pnl", b.total_pnl, a.total_pnl);
    println!("{:<24} {:>14} {:>14}", "trades", b.trade_count, a.trade_count);
    println!(
        "{:<24} {:>14.4} {:>14.4}",
        "fsr", b.false_signal_rate, a.false_signal_rate
    );
    println!(
        "{:<24} {:>14.4} {:>14.4}",
        "sharpe_like", b.sharpe_like, a.sharpe_like
    );
    println!(
        "{:<24} {:>14} {:>14}",
        "dd_recovery_ticks", b.drawdown_recovery_ticks, a.drawdown_recovery_ticks
    );
    println!(
        "{:<24} {:>14} {:>14}",
        "adaptive_switch_count", 0, a.adaptive_switch_count
    );
    println!();
    for run in &result.per_regime {
        println!(
            "  {:<12} {:<12} trades={:<5} pnl={:>10.4}  {}",
            run.segment.regime,
            run.decision.validator,
            run.result.trade_count,
            run.result.total_pnl,
            run.decision.reason
        );
    }
    println!();
}

fn print_validator_run(out: &ValidatorRunResult, source: &str) {
    let r = &out.result;
    let p = &out.sim_params;

    println!();
    println!("=== {} (confirm {}) on {} ===", out.validator_kind, out.confirm, source);
    println!(
        "latency={} cost_bps={} slip_bps={} position={} min_interval={} max_per_100={}",
        p.latency_ticks, p.cost_bps, p.slip_bps, p.position, p.min_interval_ticks,
        p.max_trades_per_100
    );
    println!("{:<24} {:>14.4}", "total_pnl", r.total_pnl);
    println!("{:<24} {:>14}", "trades", r.trade_count);
    println!("{:<24} {:>14.4}", "fsr", r.false_signal_rate);
    println!("{:<24} {:>14.4}", "sharpe_like", r.sharpe_like);
    println!("{:<24} {:>14}", "dd_recovery_ticks", r.drawdown_recovery_ticks);
    println!("{:<24} {:>14.4}", "max_drawdown", r.max_drawdown);
    println!();
}
