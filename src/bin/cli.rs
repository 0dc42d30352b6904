//! summit-cli - Debug tool for summit detection
//!
//! Usage:
//!   summit-cli detect <file> [--json] [--preset <name>] [--config <file>]
//!   summit-cli scan <folder> [--preset <name>] [--config <file>]
//!
//! Runs the detection pipeline over GPX (or JSON fix) files and prints the
//! ranked candidates, with the pipeline's own log output alongside.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use summit_detector::{
    detect_peaks_batch, detect_peaks_from_path, DetectedPeak, DetectionConfig, DetectionResult,
    SummitError,
};

#[derive(Parser)]
#[command(name = "summit-cli")]
#[command(about = "Debug tool for stop-based summit detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Detection preset ("default", "sensitive" or "conservative")
    #[arg(short, long, global = true, default_value = "default")]
    preset: String,

    /// JSON config file; overrides --preset
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect summit candidates in a single track
    Detect {
        /// GPX or JSON track file
        file: PathBuf,

        /// Print the full result as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Only show candidates at or above this score
        #[arg(long, default_value = "0")]
        min_score: f64,

        /// Show at most this many candidates
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run detection over every track in a folder
    Scan {
        /// Folder containing GPX or JSON files
        folder: PathBuf,

        /// Only count candidates at or above this score
        #[arg(long, default_value = "0")]
        min_score: f64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let config = match load_config(cli.config.as_deref(), &cli.preset) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Commands::Detect {
            file,
            json,
            min_score,
            limit,
        } => run_detect(&file, &config, json, min_score, limit),
        Commands::Scan { folder, min_score } => run_scan(&folder, &config, min_score),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>, preset: &str) -> Result<DetectionConfig, String> {
    if let Some(path) = path {
        return DetectionConfig::from_json_file(path).map_err(|e| e.to_string());
    }
    DetectionConfig::preset(preset).ok_or_else(|| format!("Unknown preset '{}'", preset))
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

fn print_peak(peak: &DetectedPeak) {
    println!(
        "  #{:<3} {:>9.5},{:>10.5}  {:>7.1}m  {:>5.1}min  prom {:>6.1}m  score {:>5.1} (d={:.0} e={:.0} p={:.0})",
        peak.rank,
        peak.latitude,
        peak.longitude,
        peak.elevation,
        peak.duration_minutes,
        peak.prominence,
        peak.score,
        peak.duration_score,
        peak.elevation_score,
        peak.prominence_score,
    );
    if let (Some(start), Some(end)) = (peak.start_time, peak.end_time) {
        println!(
            "        {} - {} ({} segment{})",
            start.format("%H:%M:%S"),
            end.format("%H:%M:%S"),
            peak.segment_count,
            if peak.segment_count == 1 { "" } else { "s" }
        );
    }
}

fn print_result(result: &DetectionResult, min_score: f64, limit: Option<usize>) {
    let stats = &result.stats;
    println!(
        "  Points: {}  Stops: {}  Clusters: {} ({} discarded)",
        stats.point_count, stats.segment_count, stats.cluster_count, stats.discarded_clusters
    );
    match stats.elevation_threshold {
        Some(t) => println!("  Elevation threshold: {:.1}m", t),
        None => println!("  Elevation threshold: n/a (no elevation data)"),
    }

    let shown: Vec<&DetectedPeak> = result
        .peaks_above(min_score)
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    if shown.is_empty() {
        println!("\n  No summit candidates");
        return;
    }

    println!();
    for peak in shown {
        print_peak(peak);
    }
}

/// Detect and print candidates for one track
fn run_detect(
    file: &Path,
    config: &DetectionConfig,
    json: bool,
    min_score: f64,
    limit: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let mut result = detect_peaks_from_path(file, config)?;

    if json {
        result.peaks.retain(|p| p.score >= min_score);
        if let Some(limit) = limit {
            result.peaks.truncate(limit);
        }
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_header(&format!("SUMMIT CANDIDATES: {}", file.display()));
    print_result(&result, min_score, limit);
    Ok(())
}

/// Load every track file in a folder
fn load_tracks(folder: &Path) -> Result<Vec<(String, Vec<u8>)>, SummitError> {
    let io_error = |e: std::io::Error| SummitError::Io {
        path: folder.display().to_string(),
        message: e.to_string(),
    };

    let mut paths: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(io_error)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("gpx") || ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    paths.sort();

    let mut tracks = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        match fs::read(&path) {
            Ok(bytes) => tracks.push((name, bytes)),
            Err(e) => println!("  [WARN] Could not read {}: {}", path.display(), e),
        }
    }
    Ok(tracks)
}

/// Run detection across a folder and print a per-track summary
fn run_scan(folder: &Path, config: &DetectionConfig, min_score: f64) -> Result<(), Box<dyn Error>> {
    print_header(&format!("Scanning: {}", folder.display()));

    let tracks = load_tracks(folder)?;
    if tracks.is_empty() {
        println!("No track files to process");
        return Ok(());
    }
    println!("  Found {} track files", tracks.len());

    let results = detect_peaks_batch(&tracks, config);

    print_header("RESULTS");
    let mut failed = 0;
    let mut total_peaks = 0;
    for (name, result) in &results {
        match result {
            Ok(result) => {
                let count = result.peaks_above(min_score).count();
                total_peaks += count;
                match result.peaks.first() {
                    Some(best) => println!(
                        "  {:<40} {:>3} candidates, best {:.1}m score {:.1}",
                        name, count, best.elevation, best.score
                    ),
                    None => println!("  {:<40}   0 candidates", name),
                }
            }
            Err(e) => {
                failed += 1;
                println!("  {:<40} [ERROR] {}", name, e);
            }
        }
    }

    println!(
        "\n  {} tracks, {} candidates, {} failed",
        results.len(),
        total_peaks,
        failed
    );
    Ok(())
}
