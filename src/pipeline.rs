use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::codec::{DecodedImage, JpegImageEncoder};
use crate::config::Config;
use crate::coords::{self, CoordinatesError};
use crate::exif;
use crate::geotag::{self, GpsCategory};
use crate::reencode::{self, EncodedImage, SizeOutcome, SizePolicy};

/// Why a geotag run did not produce an image.
///
/// Coordinate problems are kept apart from codec/I/O failures so callers
/// can show the user which input to fix.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Invalid coordinates: {0}")]
    Coordinates(#[from] CoordinatesError),
    #[error(transparent)]
    Image(#[from] anyhow::Error),
}

/// The result of geotagging and re-encoding one image.
///
/// # Example
///
/// ```rust,no_run
/// use geotag_squeeze::pipeline::process_bytes;
/// use geotag_squeeze::reencode::SizePolicy;
///
/// let input = std::fs::read("photo.jpg").unwrap();
/// let result = process_bytes(&input, "18°27'50.1\" N", "73.835866", &SizePolicy::default()).unwrap();
///
/// println!("Quality used: {}", result.encoded.quality);
/// if !result.encoded.size_met() {
///     println!("Could not get under the size limit");
/// }
/// std::fs::write("photo_geotagged.jpg", &result.encoded.bytes).unwrap();
/// ```
#[derive(Debug)]
pub struct ProcessResult {
    pub latitude: f64,
    pub longitude: f64,
    /// What was written to the GPS IFD.
    pub gps: GpsCategory,
    /// Whether the source carried an EXIF block that was preserved.
    pub had_exif: bool,
    /// GPS found in the source before it was replaced.
    pub replaced_gps: Option<GpsCategory>,
    pub dimensions: (u32, u32),
    pub input_size: u64,
    pub encoded: EncodedImage,
}

/// Parse both coordinate strings, geotag `bytes` and re-encode under `policy`.
///
/// This is the main entry point for the library:
///
/// 1. **Parse**: both coordinates, failing with [`ProcessError::Coordinates`]
/// 2. **Decode**: the image and its existing EXIF block (a corrupt block is dropped)
/// 3. **Compose**: the new GPS IFD over the existing metadata
/// 4. **Re-encode**: at falling quality until the output fits
pub fn process_bytes(
    bytes: &[u8],
    latitude: &str,
    longitude: &str,
    policy: &SizePolicy,
) -> Result<ProcessResult, ProcessError> {
    let (lat, lon) = coords::parse_pair(latitude, longitude)?;
    log::info!("Parsed coordinates: latitude {lat}, longitude {lon}");
    Ok(geotag_bytes(bytes, lat, lon, policy)?)
}

/// [`process_bytes`] for coordinates that are already decimal degrees.
///
/// Non-finite or out-of-range degrees are rejected before the image is
/// touched.
pub fn geotag_bytes(
    bytes: &[u8],
    latitude: f64,
    longitude: f64,
    policy: &SizePolicy,
) -> Result<ProcessResult> {
    coords::check_pair(latitude, longitude)?;
    policy.validate()?;

    let image = DecodedImage::decode(bytes)?;
    let metadata = exif::read_metadata(bytes);
    let had_exif = metadata.has_passthrough();
    let replaced_gps = metadata.gps().copied();
    if let Some(old) = replaced_gps {
        let (lat, lon) = old.to_decimal();
        log::info!("Replacing existing GPS position {lat:.6}, {lon:.6}");
    }

    let metadata = geotag::compose(metadata, latitude, longitude);
    let gps = *metadata
        .gps()
        .context("Composed metadata has no GPS category")?;
    let exif_bytes = exif::encode_metadata(&metadata)?;

    let encoder = JpegImageEncoder::new(&image);
    let encoded = reencode::reencode(&encoder, exif_bytes.as_deref(), policy)?;

    match encoded.outcome {
        SizeOutcome::Met => log::info!(
            "Encoded at quality {}: {} bytes",
            encoded.quality,
            encoded.size()
        ),
        SizeOutcome::Unmet { target } => log::warn!(
            "Could not get below {target} bytes; smallest attempt at quality {} is {} bytes",
            encoded.quality,
            encoded.size()
        ),
    }

    Ok(ProcessResult {
        latitude,
        longitude,
        gps,
        had_exif,
        replaced_gps,
        dimensions: image.dimensions(),
        input_size: bytes.len() as u64,
        encoded,
    })
}

/// Where a geotagged copy of `input` goes by default: `<stem><suffix>.jpg`
/// next to the original.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}{suffix}.jpg"))
}

/// Read `input`, geotag it, and write the result to `output`.
///
/// Honors `config.output`: nothing is written on a dry run, and when
/// `output` is the input file itself a `.bak` copy is made first if
/// backups are enabled.
pub fn process_file(
    input: &Path,
    output: &Path,
    latitude: &str,
    longitude: &str,
    config: &Config,
) -> Result<ProcessResult, ProcessError> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let result = process_bytes(&bytes, latitude, longitude, &config.policy)?;

    if config.output.dry_run {
        log::info!("DRY RUN: not writing {}", output.display());
        return Ok(result);
    }

    if config.output.backup_originals && same_file(input, output) {
        backup_file(input)?;
    }

    std::fs::write(output, &result.encoded.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!("Wrote {}", output.display());

    Ok(result)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Create a backup of the original file.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}
