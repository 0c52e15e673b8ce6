use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use geotag_squeeze::coords::{self, CoordinatesError};
use geotag_squeeze::pipeline::{self, ProcessError, ProcessResult};
use geotag_squeeze::{config, exif};

#[derive(Parser, Debug)]
#[command(
    name = "geotag-squeeze",
    version,
    about = "Write GPS coordinates into a JPEG's EXIF and re-encode it under a size limit"
)]
struct Cli {
    /// JPEG image to geotag
    #[arg(value_name = "INPUT", required_unless_present = "init")]
    input: Option<PathBuf>,

    /// Latitude, decimal (18.463916) or DMS (18°27'50.1" N)
    #[arg(
        long,
        value_name = "TEXT",
        allow_hyphen_values = true,
        required_unless_present_any = ["init", "show_exif"]
    )]
    lat: Option<String>,

    /// Longitude, decimal (-73.835866) or DMS (73°50'9.1" W)
    #[arg(
        long,
        value_name = "TEXT",
        allow_hyphen_values = true,
        required_unless_present_any = ["init", "show_exif"]
    )]
    lon: Option<String>,

    /// Output file (default: <stem>_geotagged.jpg next to the input)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output must be smaller than this many bytes
    #[arg(long, value_name = "BYTES")]
    max_size: Option<u64>,

    /// Quality of the first encode (1-100)
    #[arg(long, value_name = "Q", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Lowest quality to try (1-100)
    #[arg(long, value_name = "Q", value_parser = clap::value_parser!(u8).range(1..=100))]
    min_quality: Option<u8>,

    /// Quality decrease between attempts
    #[arg(long, value_name = "S", value_parser = clap::value_parser!(u8).range(1..=100))]
    step: Option<u8>,

    /// Process the image without writing the output
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Display the input's existing EXIF metadata and exit
    #[arg(long = "show-exif")]
    show_exif: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

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

    let input = cli
        .input
        .as_deref()
        .context("No input image specified. Use --help for usage.")?;

    // Handle --show-exif
    if cli.show_exif {
        return print_full_exif(input);
    }

    let (Some(lat_text), Some(lon_text)) = (cli.lat.as_deref(), cli.lon.as_deref()) else {
        anyhow::bail!("Both --lat and --lon are required. Use --help for usage.");
    };

    // Load config, then let flags override it
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(max) = cli.max_size {
        config.policy.max_size_bytes = max;
    }
    if let Some(q) = cli.quality {
        config.policy.initial_quality = q;
    }
    if let Some(q) = cli.min_quality {
        config.policy.quality_floor = q;
    }
    if let Some(s) = cli.step {
        config.policy.quality_step = s;
    }
    if cli.dry_run {
        config.output.dry_run = true;
    }
    config.policy.validate()?;

    let (lat, lon) = match coords::parse_pair(lat_text, lon_text) {
        Ok(pair) => pair,
        Err(e) => {
            print_coordinate_error(&e);
            std::process::exit(2);
        }
    };
    log::info!("Latitude:  {lat:.6}  ({lat_text})");
    log::info!("Longitude: {lon:.6}  ({lon_text})");

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| pipeline::default_output_path(input, &config.output.suffix));

    if config.output.dry_run {
        log::info!("DRY RUN: no files will be modified");
    }
    log::info!(
        "Processing {} (target < {} bytes, quality {} down to {} in steps of {})",
        input.display(),
        config.policy.max_size_bytes,
        config.policy.initial_quality,
        config.policy.quality_floor,
        config.policy.quality_step
    );

    let result = match pipeline::process_file(input, &output, lat_text, lon_text, &config) {
        Ok(r) => r,
        Err(ProcessError::Coordinates(e)) => {
            print_coordinate_error(&e);
            std::process::exit(2);
        }
        Err(ProcessError::Image(e)) => return Err(e),
    };

    if cli.json {
        let report = json_report(input, &output, &result, &config);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&output, &result, &config);
    }

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Point at whichever coordinate needs fixing.
fn print_coordinate_error(err: &CoordinatesError) {
    let sides = match err {
        CoordinatesError::Latitude(e) => vec![("Latitude", e)],
        CoordinatesError::Longitude(e) => vec![("Longitude", e)],
        CoordinatesError::Both {
            latitude,
            longitude,
        } => vec![("Latitude", latitude), ("Longitude", longitude)],
    };
    for (side, e) in sides {
        eprintln!("{RED}{BOLD}{side} is invalid:{RESET} {e}");
    }
    eprintln!(
        "{DIM}Use decimal degrees (18.463916, -73.835866) or DMS with a hemisphere (18°27'50.1\" N){RESET}"
    );
}

fn print_summary(output: &Path, result: &ProcessResult, config: &config::Config) {
    let (w, h) = result.dimensions;
    let encoded = &result.encoded;

    println!();
    println!("  {BOLD}Geotag{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    print_row("GPSLatitude", &format_gps(result.latitude, result.gps.latitude_ref.as_char()));
    print_row("GPSLongitude", &format_gps(result.longitude, result.gps.longitude_ref.as_char()));
    if let Some(old) = result.replaced_gps {
        let (lat, lon) = old.to_decimal();
        print_row("Replaced", &format!("{lat:.6}, {lon:.6}"));
    }
    print_row(
        "Other EXIF",
        if result.had_exif { "preserved" } else { "none in source" },
    );
    println!();

    println!("  {BOLD}Encoding{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    print_row("ImageSize", &format!("{w} x {h}"));
    print_row("Quality", &encoded.quality.to_string());
    print_row(
        "Size",
        &format!("{} bytes (input {} bytes)", encoded.size(), result.input_size),
    );
    let tried = encoded
        .attempts
        .iter()
        .map(|a| format!("q{}={}", a.quality, a.size))
        .collect::<Vec<_>>()
        .join(" ");
    print_row("Attempts", &tried);
    println!("  {DIM}{}{RESET}", "─".repeat(70));

    if encoded.size_met() {
        println!(
            "  {GREEN}Under {} bytes{RESET}",
            config.policy.max_size_bytes
        );
    } else {
        println!(
            "  {YELLOW}Could not get under {} bytes at quality {} or above; kept the smallest attempt{RESET}",
            config.policy.max_size_bytes, config.policy.quality_floor
        );
    }
    if config.output.dry_run {
        println!("  {DIM}(dry run, {} not written){RESET}", output.display());
    } else {
        println!("  Written: {}", output.display());
    }
    println!();
}

fn format_gps(value: f64, hemisphere: char) -> String {
    format!("{:.6} {hemisphere}", value.abs())
}

fn json_report(
    input: &Path,
    output: &Path,
    result: &ProcessResult,
    config: &config::Config,
) -> serde_json::Value {
    let encoded = &result.encoded;
    serde_json::json!({
        "input": input.display().to_string(),
        "output": output.display().to_string(),
        "written": !config.output.dry_run,
        "latitude": result.latitude,
        "longitude": result.longitude,
        "gps": result.gps,
        "replaced_gps": result.replaced_gps,
        "had_exif": result.had_exif,
        "width": result.dimensions.0,
        "height": result.dimensions.1,
        "input_size": result.input_size,
        "format": format!("{:?}", encoded.format),
        "quality": encoded.quality,
        "size": encoded.size(),
        "max_size": config.policy.max_size_bytes,
        "outcome": encoded.outcome,
        "attempts": encoded.attempts,
    })
}

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print the input's existing EXIF metadata, organized by section.
fn print_full_exif(path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let data = exif::read_exif(&bytes)?;

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let camera_fields: Vec<(&str, Option<&str>)> = vec![
        ("Make", data.make.as_deref()),
        ("Model", data.model.as_deref()),
        ("Software", data.software.as_deref()),
        ("DateTimeOriginal", data.date_time.as_deref()),
        ("Orientation", data.orientation.as_deref()),
    ];
    if camera_fields.iter().any(|(_, v)| v.is_some()) {
        println!("  {BOLD}Camera / Device{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (tag, val) in &camera_fields {
            if let Some(v) = val {
                print_row(tag, v);
            }
        }
        println!();
    }

    if data.has_gps {
        println!("  {BOLD}GPS{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        if let Some(lat) = data.gps_latitude {
            let r = data.gps_latitude_ref.unwrap_or(if lat < 0.0 { 'S' } else { 'N' });
            print_row("GPSLatitude", &format_gps(lat, r));
        }
        if let Some(lon) = data.gps_longitude {
            let r = data.gps_longitude_ref.unwrap_or(if lon < 0.0 { 'W' } else { 'E' });
            print_row("GPSLongitude", &format_gps(lon, r));
        }
        println!();
    }

    if !data.has_gps && camera_fields.iter().all(|(_, v)| v.is_none()) {
        println!("  {DIM}(no EXIF metadata found){RESET}");
        println!();
    }

    Ok(())
}

/// Print a single row in the display table.
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
