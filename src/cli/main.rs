use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::Parser;
use std::path::PathBuf;

use exif_attrs::codec::{CodecGuard, JpegCodec};
use exif_attrs::interface::ExifFile;
use exif_attrs::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "exif-attrs",
    version,
    about = "Show and edit EXIF attributes of JPEG images"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Set a tag (repeatable), e.g. --set Orientation=6
    #[arg(long = "set", value_name = "TAG=VALUE", value_parser = pipeline::parse_assignment)]
    set: Vec<(String, String)>,

    /// Preview changes without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Write the embedded thumbnail of a single image to FILE
    #[arg(long, value_name = "FILE")]
    thumbnail: Option<PathBuf>,

    /// Output results as JSON
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
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Load config
    let mut config = config::Config::load(cli.config.as_deref())?;

    // Override from CLI flags
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if cli.json {
        config.output.json = true;
    }

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // One codec and one lock for the whole run
    let codec = CodecGuard::new(JpegCodec::new().with_backups(config.output.backup_originals));

    // Handle --thumbnail
    if let Some(ref out) = cli.thumbnail {
        if images.len() != 1 {
            anyhow::bail!("--thumbnail needs exactly one image, found {}", images.len());
        }
        let file = ExifFile::open(&images[0], codec)?;
        match file.thumbnail()? {
            Some(bytes) => {
                std::fs::write(out, &bytes)?;
                println!("Thumbnail ({} bytes) written to {}", bytes.len(), out.display());
            }
            None => log::warn!("{} has no embedded thumbnail", images[0].display()),
        }
        return Ok(());
    }

    log::info!("Found {} image(s)", images.len());
    if !cli.set.is_empty() && config.output.dry_run {
        log::info!("DRY RUN — no files will be modified");
    }

    let mut reports = Vec::new();
    let total = images.len();

    for (i, image_path) in images.iter().enumerate() {
        log::debug!("[{}/{}] {}", i + 1, total, image_path.display());

        let report = if cli.set.is_empty() {
            pipeline::inspect_image(image_path, &codec)
        } else {
            pipeline::update_image(image_path, &codec, &cli.set, &config)
        };

        if let Some(ref err) = report.error {
            log::error!("{}: {err}", image_path.display());
        }
        if !config.output.json {
            print_report(&report, &config);
        }

        reports.push(report);
    }

    // JSON output
    if config.output.json {
        let json_reports: Vec<serde_json::Value> = reports
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.path.display().to_string(),
                    "attributes": r.attributes,
                    "has_thumbnail": r.has_thumbnail,
                    "orientation": r.orientation,
                    "white_balance": r.white_balance,
                    "lat_long": r.lat_long,
                    "date_time": r.date_time,
                    "updated": r.updated,
                    "pending": r.pending_wire,
                    "error": r.error,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    }

    // Summary
    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    log::info!(
        "Done: {} succeeded, {failed} failed out of {total} images",
        total - failed
    );

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

const VAL_WIDTH: usize = 46;
// Width of "  " + 22-char tag column + " : "
const INDENT: &str = "                           ";

/// Print one image's attributes and typed values as a table.
fn print_report(report: &pipeline::ImageReport, config: &config::Config) {
    println!();
    println!("{BOLD}File:{RESET} {}", report.path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    if report.error.is_some() {
        println!();
        return;
    }

    if report.attributes.is_empty() {
        println!("  {DIM}(no EXIF metadata found){RESET}");
    }
    for (tag, value) in &report.attributes {
        if report.updated.contains(tag) {
            print_row_colored(tag, value);
        } else {
            print_row(tag, value);
        }
    }

    println!("  {DIM}{}{RESET}", "─".repeat(70));
    print_row("Thumbnail", if report.has_thumbnail { "yes" } else { "no" });
    if !report.orientation.is_empty() {
        print_row("Orientation (label)", &report.orientation);
    }
    if !report.white_balance.is_empty() {
        print_row("White balance (label)", &report.white_balance);
    }
    if let Some(pos) = report.lat_long {
        let precision = config.display.coordinate_precision;
        print_row(
            "Position",
            &format!("{:.precision$}, {:.precision$}", pos.latitude, pos.longitude),
        );
    }
    if let Some(millis) = report.date_time {
        if let Some(t) = Local.timestamp_millis_opt(millis).single() {
            print_row("Taken (local)", &t.format("%Y-%m-%d %H:%M:%S").to_string());
        }
    }
    if let Some(ref wire) = report.pending_wire {
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        print_row("Would commit", wire);
    }
    println!();
}

/// Print a single row in the attribute table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Print a row for a tag changed in this run.
fn print_row_colored(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {GREEN}{tag_col} : {line}{RESET}");
        } else {
            println!("  {GREEN}{INDENT}{line}{RESET}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
