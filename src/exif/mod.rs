//! EXIF metadata reading and writing.
//!
//! - [`read_metadata`]: Split the EXIF block out of a JPEG into a [`MetadataBlock`]
//! - [`encode_metadata`]: Turn a (possibly geotagged) [`MetadataBlock`] back into TIFF bytes
//! - [`embed_exif`]: Place TIFF bytes into an encoded JPEG as its APP1 segment
//! - [`read_exif`]: Summarize existing metadata for display and verification
//!
//! Only the GPS IFD is ever rewritten. The rest of the source block is kept
//! as raw bytes so camera, exposure and thumbnail data survive re-encoding.

mod block;
mod reader;
mod tiff;
mod writer;

pub use block::{Gps, MetadataBlock};
pub use reader::{ExifData, read_exif, read_metadata};
pub use writer::{embed_exif, encode_metadata};
