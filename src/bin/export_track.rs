/// Track Export Tool
///
/// Generates the track for a seed and writes its geometry (center path,
/// walls, checkpoint gates, start line) as JSON or YAML for external
/// renderers.
///
/// Usage:
///   cargo run --bin export-track -- --seed 0.42 --output track.json
///   cargo run --bin export-track -- --seed 0.42 --config race.toml --output track.yaml

use std::fs::File;
use std::path::{Path, PathBuf};
use clap::Parser;
use apexsim_arcade::config::RaceConfig;
use apexsim_arcade::track::Track;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Track seed in [0, 1)
    #[arg(short = 's', long)]
    seed: f64,

    /// Output file path (.json, .yaml or .yml)
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Take track parameters from this race.toml instead of the defaults
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Output format: json or yaml (auto-detected from extension if not specified)
    #[arg(short = 'f', long)]
    format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Yaml,
}

/// Pick the format from `--format`, else from the output extension, else JSON.
fn resolve_format(flag: Option<&str>, output: &Path) -> Result<OutputFormat, String> {
    let format = match flag {
        Some(fmt) => fmt.to_lowercase(),
        None => output
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("json")
            .to_lowercase(),
    };

    match format.as_str() {
        "json" => Ok(OutputFormat::Json),
        "yaml" | "yml" => Ok(OutputFormat::Yaml),
        _ => Err(format!("Unsupported output format: {}", format)),
    }
}

fn export(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    // Checked before anything touches the output path
    let format = resolve_format(args.format.as_deref(), &args.output)?;

    let params = match args.config {
        Some(ref path) => {
            println!("Reading track parameters from: {}", path.display());
            RaceConfig::load(path)?.track
        }
        None => Default::default(),
    };

    println!("Generating track for seed {}", args.seed);
    let track = Track::generate_with(args.seed, &params)?;

    let length: f64 = (0..track.path_len())
        .map(|i| {
            let path = track.center_path();
            path[i].distance_to(&path[(i + 1) % path.len()])
        })
        .sum();
    println!("  {} path points, {} checkpoints", track.path_len(), track.checkpoints().len());
    println!("  Center line length: {:.1} units", length);

    println!("Writing to: {}", args.output.display());
    let output_file = File::create(&args.output)?;

    match format {
        OutputFormat::Json => serde_json::to_writer_pretty(output_file, &track)?,
        OutputFormat::Yaml => serde_yaml::to_writer(output_file, &track)?,
    }

    println!("✓ Export completed successfully!");
    println!("  Output: {}", args.output.display());

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    export(&args)
}
