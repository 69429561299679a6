use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use racetrack::report::write_summaries_to_path;
use racetrack::{Driver, GridTrack, LearningStrategy, RaceConfig, ResetPolicy, TrainingStats};

/// Solve a racetrack by value iteration, then drive it with online learning.
#[derive(Debug, Parser)]
#[command(name = "racetrack", version)]
struct Args {
    /// Track file: a `ROWS,COLS` header followed by the grid.
    #[arg(short, long)]
    track: PathBuf,

    /// Online update rule: `q` (Q-learning) or `sarsa`.
    #[arg(short, long, default_value = "q")]
    strategy: LearningStrategy,

    /// After a crash: `stop` in place or `reset` to a start cell.
    #[arg(short, long, default_value = "stop")]
    reset: ResetPolicy,

    #[arg(short, long, default_value_t = 1)]
    episodes: usize,

    #[arg(long, default_value_t = 0.9)]
    discount_rate: f64,

    #[arg(long, default_value_t = 0.001)]
    convergence_delta: f64,

    #[arg(long, default_value_t = 0.9)]
    learning_rate: f64,

    #[arg(long, default_value_t = 0.2)]
    failure_probability: f64,

    #[arg(long, default_value_t = 10_000)]
    max_sweeps: usize,

    #[arg(long, default_value_t = 10_000)]
    max_steps: usize,

    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Write one CSV row per episode here.
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> RaceConfig {
        RaceConfig {
            reset_policy: self.reset,
            learning_strategy: self.strategy,
            discount_rate: self.discount_rate,
            convergence_delta: self.convergence_delta,
            learning_rate: self.learning_rate,
            failure_probability: self.failure_probability,
            random_seed: self.seed,
            max_sweeps: self.max_sweeps,
            max_steps: self.max_steps,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.episodes == 0 {
        bail!("--episodes must be at least 1");
    }

    let track = GridTrack::from_path(&args.track)
        .with_context(|| format!("loading {}", args.track.display()))?;
    let config = args.config();
    info!("{:?}", config);

    let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);
    let mut driver = Driver::new(&track, config).context("configuring driver")?;
    let summaries = driver
        .train(&track, args.episodes, &mut rng)
        .context("driving the track")?;

    let stats = TrainingStats::from_summaries(&summaries);
    match stats.mean_finish_time {
        Some(mean) => info!(
            "{}/{} episodes finished, mean time {:.1}, best {}",
            stats.finished,
            stats.episodes,
            mean,
            stats.best_finish_time.unwrap_or_default()
        ),
        None => info!("0/{} episodes finished", stats.episodes),
    }

    if let Some(path) = &args.csv {
        write_summaries_to_path(path, &summaries)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {} episode rows to {}", summaries.len(), path.display());
    }
    Ok(())
}
