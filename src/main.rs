mod compare;
mod config;
mod driver;
mod error;
mod i18n;
mod pool;
mod report;
mod rng;
mod schedule;
mod sim; // Pull engine and trial runners
mod stats;
mod worker;

use clap::{Parser, Subcommand};
use config::Config;
use driver::SimulationDriver;
use error::GachaResult;
use i18n::{I18n, Language};
use log::{error, info, warn};
use rng::Rng;
use sim::{pair_trial, single_trial, CostMetric, SimulationResult};
use stats::{PercentileMethod, Summary};
use worker::GoodJobWorker;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "data/config.json")]
    config: String,

    /// Random seed (optional)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Trials per run, overriding the config file
    #[arg(short = 'n', long)]
    simulations: Option<usize>,

    /// Worker threads; 0 runs every trial on the main thread
    #[arg(short, long)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Pulls needed to own N UP items from one pool
    Pool {
        #[arg(short, long)]
        variant: String,
        /// Comma-separated UP targets (defaults to the config's)
        #[arg(long, value_delimiter = ',')]
        targets: Option<Vec<u32>>,
    },
    /// Two pools pulled together, tickets flowing from primary to secondary
    Mix {
        #[arg(long)]
        primary: String,
        #[arg(long)]
        secondary: String,
        #[arg(long, default_value_t = 1)]
        primary_target: u64,
        #[arg(long, default_value_t = 1)]
        secondary_target: u64,
        /// Report each pool separately as well as the total
        #[arg(long)]
        per_pool: bool,
    },
    /// Single pulls against ten-pulls over many banners
    Compare {
        #[arg(short, long)]
        variant: String,
        /// Banners to simulate (defaults to the simulation count)
        #[arg(short, long)]
        banners: Option<usize>,
    },
    /// Show variant parameters
    Info {
        #[arg(short, long)]
        variant: Option<String>,
    },
}

fn build_worker(config: &Config, threads: Option<usize>) -> Option<GoodJobWorker> {
    let built = match threads {
        Some(0) => return None,
        Some(n) => GoodJobWorker::with_threads(n),
        None => GoodJobWorker::new_with_config(config),
    };
    match built {
        Ok(worker) => Some(worker),
        Err(e) => {
            warn!("[System] {}; trials will run sequentially", e);
            None
        }
    }
}

fn run_pool(
    variant_name: &str,
    targets: &[u32],
    config: &Config,
    driver: &SimulationDriver,
    lang: Language,
) -> GachaResult<String> {
    let variant = config.variant(variant_name)?;
    let mut out = String::new();
    for &target in targets {
        let target = target as u64;
        info!("[Pool] '{}' target {}: {} trials", variant.name, target, config.simulations);
        let pulls = driver.run(config.simulations, |rng: &mut Rng| {
            single_trial(&variant, target, config.max_draws_per_trial, rng).map(|r| r.total())
        })?;
        let summary = Summary::from_values(&stats::to_f64(&pulls), &config.percentiles, PercentileMethod::NearestRank)?;
        let hist = stats::histogram(&pulls, config.bin_width as u64)?;
        out.push_str(&report::render_pool_report(&variant.name, target, &summary, &hist, lang));
        out.push('\n');
    }
    Ok(out)
}

/// Labelled summaries for a coupled run: one per pool when the results were
/// kept apart, always one for the combined cost.
fn mix_sections(
    results: &[SimulationResult],
    percentiles: &[f64],
    lang: Language,
) -> GachaResult<Vec<(String, Summary)>> {
    let mut sections = Vec::new();
    let per_pool: Vec<(u64, u64)> = results
        .iter()
        .filter_map(|r| match *r {
            SimulationResult::PerPool { primary, secondary } => Some((primary, secondary)),
            SimulationResult::Pulls(_) => None,
        })
        .collect();
    if !per_pool.is_empty() {
        let primary: Vec<f64> = per_pool.iter().map(|&(p, _)| p as f64).collect();
        let secondary: Vec<f64> = per_pool.iter().map(|&(_, s)| s as f64).collect();
        sections.push((I18n::get(lang, "lbl_primary"), Summary::from_values(&primary, percentiles, PercentileMethod::NearestRank)?));
        sections.push((I18n::get(lang, "lbl_secondary"), Summary::from_values(&secondary, percentiles, PercentileMethod::NearestRank)?));
    }
    let totals: Vec<f64> = results.iter().map(|r| r.total() as f64).collect();
    sections.push((I18n::get(lang, "lbl_combined"), Summary::from_values(&totals, percentiles, PercentileMethod::NearestRank)?));
    Ok(sections)
}

#[allow(clippy::too_many_arguments)]
fn run_mix(
    primary_name: &str,
    secondary_name: &str,
    primary_target: u64,
    secondary_target: u64,
    per_pool: bool,
    config: &Config,
    driver: &SimulationDriver,
    lang: Language,
) -> GachaResult<String> {
    let primary = config.variant(primary_name)?;
    let secondary = config.variant(secondary_name)?;
    let metric = if per_pool { CostMetric::PerPool } else { CostMetric::Combined };
    info!(
        "[Mix] '{}' x{} + '{}' x{}: {} trials",
        primary.name, primary_target, secondary.name, secondary_target, config.simulations
    );

    let results = driver.run(config.simulations, |rng: &mut Rng| {
        pair_trial(
            (&primary, primary_target),
            (&secondary, secondary_target),
            metric,
            config.max_draws_per_trial,
            rng,
        )
    })?;

    let sections = mix_sections(&results, &config.percentiles, lang)?;
    let totals: Vec<u64> = results.iter().map(|r| r.total()).collect();
    let hist = stats::histogram(&totals, config.bin_width as u64)?;
    Ok(report::render_mix_report(&primary.name, &secondary.name, &sections, &hist, lang))
}

fn run_info(variant: Option<&str>, config: &Config, lang: Language) -> GachaResult<String> {
    let names = match variant {
        Some(name) => vec![name.to_string()],
        None => config.variant_names(),
    };
    let mut out = I18n::get(lang, "info_header");
    out.push('\n');
    for name in names {
        out.push_str(&report::render_variant_info(&config.variant(&name)?, lang));
    }
    Ok(out)
}

fn run(args: Args) -> GachaResult<()> {
    let mut config = Config::load(&args.config)?;
    if let Some(n) = args.simulations {
        config.simulations = n;
        config.validate()?;
    }
    let lang = Language::from_config(&config);

    let seed = args.seed.unwrap_or_else(rand::random);
    let worker = match args.command {
        Commands::Info { .. } => None,
        _ => {
            info!("[System] PRNG xoshiro256** seeded with {}", seed);
            build_worker(&config, args.threads)
        }
    };
    let driver = SimulationDriver::new(worker.as_ref(), seed);

    let output = match args.command {
        Commands::Pool { variant, targets } => {
            let targets = targets.unwrap_or_else(|| config.targets.clone());
            run_pool(&variant, &targets, &config, &driver, lang)?
        }
        Commands::Mix { primary, secondary, primary_target, secondary_target, per_pool } => run_mix(
            &primary,
            &secondary,
            primary_target,
            secondary_target,
            per_pool,
            &config,
            &driver,
            lang,
        )?,
        Commands::Compare { variant, banners } => {
            let variant = config.variant(&variant)?;
            let banners = banners.unwrap_or(config.simulations);
            let mut bootstrap_rng = Rng::for_stream(seed, u64::MAX);
            let cmp = compare::compare(&variant, banners, &config, &driver, &mut bootstrap_rng)?;
            report::render_comparison(&cmp, lang)
        }
        Commands::Info { variant } => run_info(variant.as_deref(), &config, lang)?,
    };
    println!("{}", output);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
