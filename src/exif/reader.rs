use anyhow::{Context, Result};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use nom_exif::*;
use serde::Serialize;
use std::io::Cursor;

use super::block::MetadataBlock;
use crate::geotag::{GpsCategory, LatitudeRef, LongitudeRef, RationalTriple};

/// Summary of the EXIF data already present in an image.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExifData {
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
    pub date_time: Option<String>,
    pub orientation: Option<String>,
    pub has_gps: bool,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_latitude_ref: Option<char>,
    pub gps_longitude_ref: Option<char>,
}

/// Read an EXIF summary from encoded image bytes.
///
/// An image without EXIF yields an empty [`ExifData`], not an error.
pub fn read_exif(bytes: &[u8]) -> Result<ExifData> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::seekable(Cursor::new(bytes)).context("Failed to open image data")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found");
            return Ok(ExifData::default());
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    let mut data = ExifData {
        make: exif.get(ExifTag::Make).and_then(entry_to_string),
        model: exif.get(ExifTag::Model).and_then(entry_to_string),
        software: exif.get(ExifTag::Software).and_then(entry_to_string),
        date_time: exif.get(ExifTag::DateTimeOriginal).and_then(entry_to_string),
        orientation: exif.get(ExifTag::Orientation).and_then(entry_to_string),
        ..ExifData::default()
    };

    if let Some(gps) = gps_info {
        data.has_gps = true;
        data.gps_latitude = Some(latlng_to_decimal(&gps.latitude, gps.latitude_ref));
        data.gps_longitude = Some(latlng_to_decimal(&gps.longitude, gps.longitude_ref));
        data.gps_latitude_ref = Some(gps.latitude_ref);
        data.gps_longitude_ref = Some(gps.longitude_ref);
    }

    Ok(data)
}

/// Extract the EXIF block of a JPEG as a [`MetadataBlock`].
///
/// Never fails: a file img-parts cannot split, or an EXIF block that does
/// not parse, gives an empty block so geotagging can still proceed.
pub fn read_metadata(bytes: &[u8]) -> MetadataBlock {
    let tiff = match Jpeg::from_bytes(Bytes::copy_from_slice(bytes)) {
        Ok(jpeg) => jpeg.exif(),
        Err(e) => {
            log::warn!("Could not read JPEG segments, starting with empty metadata: {e}");
            return MetadataBlock::default();
        }
    };

    match tiff {
        Some(tiff) if !tiff.is_empty() => {
            log::debug!("Existing EXIF block: {} bytes", tiff.len());
            MetadataBlock::from_tiff(tiff.to_vec(), read_gps(bytes))
        }
        _ => {
            log::debug!("No existing EXIF block");
            MetadataBlock::default()
        }
    }
}

/// The GPS position stored in an image, as written rationals.
fn read_gps(bytes: &[u8]) -> Option<GpsCategory> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::seekable(Cursor::new(bytes)).ok()?;
    let iter: ExifIter = parser.parse(ms).ok()?;
    let gps = iter.parse_gps_info().ok().flatten()?;

    Some(GpsCategory {
        latitude_ref: match gps.latitude_ref {
            'S' | 's' => LatitudeRef::South,
            _ => LatitudeRef::North,
        },
        latitude: latlng_to_triple(&gps.latitude),
        longitude_ref: match gps.longitude_ref {
            'W' | 'w' => LongitudeRef::West,
            _ => LongitudeRef::East,
        },
        longitude: latlng_to_triple(&gps.longitude),
    })
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn latlng_to_triple(latlng: &LatLng) -> RationalTriple {
    RationalTriple {
        degrees: (latlng.0.0 as u32, latlng.0.1 as u32),
        minutes: (latlng.1.0 as u32, latlng.1.1 as u32),
        seconds: (latlng.2.0 as u32, latlng.2.1 as u32),
    }
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    let coord = latlng_to_triple(latlng).to_degrees();

    if reference == 'S' || reference == 'W' {
        -coord
    } else {
        coord
    }
}
