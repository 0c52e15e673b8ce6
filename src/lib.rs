//! # geotag-squeeze
//!
//! Geotag a JPEG from user-typed coordinates and re-encode it under a size
//! ceiling, keeping the rest of its EXIF metadata intact.
//!
//! ## Quick Start
//!
//! The pipeline module handles the full parse → geotag → re-encode flow:
//!
//! ```rust,no_run
//! use geotag_squeeze::pipeline::{ProcessError, process_bytes};
//! use geotag_squeeze::reencode::SizePolicy;
//!
//! fn main() -> anyhow::Result<()> {
//!     let input = std::fs::read("photo.jpg")?;
//!
//!     match process_bytes(&input, "18°27'50.1\" N", "-73.835866", &SizePolicy::default()) {
//!         Ok(result) => {
//!             println!("Encoded at quality {}", result.encoded.quality);
//!             std::fs::write("photo_geotagged.jpg", &result.encoded.bytes)?;
//!         }
//!         Err(ProcessError::Coordinates(e)) => eprintln!("Fix your input: {e}"),
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! Each stage can be driven on its own:
//!
//! ```rust,no_run
//! use geotag_squeeze::codec::{DecodedImage, JpegImageEncoder};
//! use geotag_squeeze::reencode::{SizePolicy, reencode};
//! use geotag_squeeze::{coords, exif, geotag};
//!
//! fn main() -> anyhow::Result<()> {
//!     let bytes = std::fs::read("photo.jpg")?;
//!
//!     // 1. Parse coordinates (decimal or DMS)
//!     let (lat, lon) = coords::parse_pair("51.5007", "0°7'28.7\" W")?;
//!
//!     // 2. Merge a GPS IFD into the existing metadata
//!     let metadata = geotag::compose(exif::read_metadata(&bytes), lat, lon);
//!     let tiff = exif::encode_metadata(&metadata)?;
//!
//!     // 3. Re-encode until under 500 KB
//!     let image = DecodedImage::decode(&bytes)?;
//!     let policy = SizePolicy { max_size_bytes: 500_000, ..Default::default() };
//!     let encoded = reencode(&JpegImageEncoder::new(&image), tiff.as_deref(), &policy)?;
//!     println!("{} bytes at quality {}", encoded.size(), encoded.quality);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coords`]: Coordinate text parsing (decimal degrees and DMS)
//! - [`geotag`]: Decimal degrees to EXIF rational DMS, GPS category composition
//! - [`exif`]: EXIF block reading, GPS IFD rewriting, APP1 embedding
//! - [`codec`]: Image decoding and quality-controlled JPEG encoding
//! - [`reencode`]: Quality descent against a size ceiling
//! - [`pipeline`]: The end-to-end flow over bytes and files
//! - [`config`]: Configuration types and loading/saving

pub mod codec;
pub mod config;
pub mod coords;
pub mod exif;
pub mod geotag;
pub mod pipeline;
pub mod reencode;
