use apexsim_arcade::{
    config::RaceConfig,
    data::{format_race_time, RaceResult},
    race::Race,
};
use clap::Parser;
use rand::Rng;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to race.toml configuration file
    #[arg(short, long, default_value = "./race.toml")]
    config: String,

    /// Track seed in [0, 1); overrides the config
    #[arg(short, long)]
    seed: Option<f64>,

    /// Number of laps; overrides the config
    #[arg(long)]
    laps: Option<u32>,

    /// Number of AI opponents; overrides the config
    #[arg(long)]
    ai: Option<usize>,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the final results as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn print_results(results: &[RaceResult]) {
    println!("{:<4} {:<10} {:>4}  {}", "Pos", "Car", "Laps", "Time");
    for result in results {
        let name = if result.is_player {
            format!("{} *", result.color)
        } else {
            result.color.clone()
        };
        let time = result
            .finish_time_ms
            .map(format_race_time)
            .unwrap_or_else(|| "DNF".to_string());
        println!("{:<4} {:<10} {:>4}  {}", result.position, name, result.laps, time);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logging is configured from the file, so load it before the subscriber
    // exists and report any failure afterwards.
    let (mut config, load_error) = match RaceConfig::load(&args.config) {
        Ok(config) => (config, None),
        Err(e) => (RaceConfig::default(), Some(e)),
    };

    let log_level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&log_level, config.logging.json);

    match load_error {
        Some(e) => warn!("Failed to load config from {}: {}, using defaults", args.config, e),
        None => info!("Configuration loaded from: {}", args.config),
    }

    if let Some(laps) = args.laps {
        config.race.laps = laps;
    }
    if let Some(ai) = args.ai {
        config.race.ai_count = ai;
    }
    let seed = args
        .seed
        .or(config.race.seed)
        .unwrap_or_else(|| rand::thread_rng().gen::<f64>());

    info!(
        "Headless race: seed {:.4}, {} lap(s), {} AI opponent(s)",
        seed, config.race.laps, config.race.ai_count
    );

    let tick_rate = config.race.tick_rate_hz;
    let mut race = Race::new(config, seed)?.with_autopilot();
    let ticks = race.run_to_finish();
    info!(
        "Simulated {} ticks ({} of racing at {}Hz)",
        ticks,
        format_race_time(race.elapsed_ms()),
        tick_rate
    );

    let results = race.results();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }

    Ok(())
}
