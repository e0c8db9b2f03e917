use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use exif_transfer::{GpsCoords, MetadataSnapshot, Tag, config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "exif-transfer",
    version,
    about = "Copy EXIF metadata from an original image onto its processed copy"
)]
struct Cli {
    /// Source image, then the destination image to write into
    /// (with --show: images to display)
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Display the transferable EXIF tags of the image(s) and exit
    #[arg(long)]
    show: bool,

    /// Mark the destination as upright (its pixels were already rotated)
    #[arg(long)]
    reset_orientation: bool,

    /// Do not copy GPS tags
    #[arg(long)]
    strip_gps: bool,

    /// Write this position to the destination, in decimal degrees
    #[arg(
        long,
        num_args = 2,
        value_names = ["LAT", "LON"],
        allow_negative_numbers = true
    )]
    gps: Option<Vec<f64>>,

    /// Preview changes without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Do not back up the destination before writing
    #[arg(long)]
    no_backup: bool,

    /// Output the result as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files specified. Use --help for usage.");
    }

    // Handle --show
    if cli.show {
        for path in &cli.paths {
            let snapshot = pipeline::read_metadata(path)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(path, &snapshot);
            }
        }
        return Ok(());
    }

    let [source, destination] = cli.paths.as_slice() else {
        anyhow::bail!(
            "Expected exactly two paths (source and destination), got {}",
            cli.paths.len()
        );
    };

    // Load config, then let flags override it
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.reset_orientation {
        config.transfer.reset_orientation = true;
    }
    if cli.strip_gps {
        config.transfer.strip_gps = true;
    }
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if cli.no_backup {
        config.output.backup_originals = false;
    }

    let gps = match cli.gps.as_deref() {
        Some(&[latitude, longitude]) => Some(parse_coords(latitude, longitude)?),
        Some(_) => anyhow::bail!("--gps takes a latitude and a longitude"),
        None => None,
    };

    log::info!("{} → {}", source.display(), destination.display());
    let report = pipeline::transfer_file(source, destination, &config, gps)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.dry_run {
        print_snapshot(destination, &report.fields);
    } else if let Some(ref backup) = report.backup_path {
        log::info!("  Backup: {}", backup.display());
    }

    Ok(())
}

fn parse_coords(latitude: f64, longitude: f64) -> Result<GpsCoords> {
    if !(-90.0..=90.0).contains(&latitude) {
        anyhow::bail!("Latitude out of range: {latitude}");
    }
    if !(-180.0..=180.0).contains(&longitude) {
        anyhow::bail!("Longitude out of range: {longitude}");
    }
    Ok(GpsCoords {
        latitude,
        longitude,
    })
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print every transferable tag, marking the absent ones.
fn print_snapshot(path: &Path, snapshot: &MetadataSnapshot) {
    println!();
    println!("  {BOLD}{}{RESET}", path.display());
    println!("  {DIM}{}{RESET}", "─".repeat(72));

    for tag in Tag::ALL {
        match snapshot.get(tag) {
            Some(value) => println!("  {:<22} {GREEN}{value}{RESET}", tag.name()),
            None => println!("  {DIM}{:<22} -{RESET}", tag.name()),
        }
    }

    println!("  {DIM}{}{RESET}", "─".repeat(72));
}
