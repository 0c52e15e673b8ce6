use anyhow::Result;
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use super::block::{Gps, MetadataBlock};
use super::tiff;

// APP1 payload is capped by the 16-bit segment length (which counts itself)
// and carries the 6-byte Exif\0\0 prefix before the TIFF data.
const MAX_TIFF_LEN: usize = u16::MAX as usize - 2 - 6;

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;

/// Serialize a [`MetadataBlock`] to raw TIFF bytes for embedding.
///
/// - composed GPS over an existing block: a new GPS IFD is swapped in,
///   everything else is kept byte-for-byte
/// - composed GPS, no existing block: a block holding only the GPS IFD
/// - no composed GPS: the existing block (if any) is returned unchanged
///
/// If the rewritten block no longer fits in an APP1 segment, the other
/// metadata is dropped with a warning and only the GPS IFD is written.
pub fn encode_metadata(block: &MetadataBlock) -> Result<Option<Vec<u8>>> {
    let tiff = match (block.gps_state(), block.passthrough()) {
        (Some(Gps::Composed(gps)), Some(original)) => {
            log::debug!("Injecting GPS IFD into existing EXIF block");
            let rewritten = tiff::replace_gps_ifd(original, gps)?;
            if rewritten.len() > MAX_TIFF_LEN {
                log::warn!(
                    "EXIF block of {} bytes would not fit in APP1 with GPS; writing GPS only",
                    rewritten.len()
                );
                Some(tiff::gps_only_tiff(gps)?)
            } else {
                Some(rewritten)
            }
        }
        (Some(Gps::Composed(gps)), None) => {
            log::debug!("Building GPS-only EXIF block");
            Some(tiff::gps_only_tiff(gps)?)
        }
        (_, original) => original.map(<[u8]>::to_vec),
    };

    if let Some(ref data) = tiff {
        if data.len() > MAX_TIFF_LEN {
            anyhow::bail!(
                "EXIF block of {} bytes does not fit in a JPEG APP1 segment",
                data.len()
            );
        }
    }

    Ok(tiff)
}

/// Put `tiff` into a JPEG as its EXIF APP1 segment, replacing any existing one.
///
/// The segment is placed directly after SOI, or after the JFIF APP0 when
/// there is one, where EXIF readers expect it.
pub fn embed_exif(jpeg_bytes: Vec<u8>, tiff: Option<&[u8]>) -> Result<Vec<u8>> {
    let Some(tiff) = tiff else {
        return Ok(jpeg_bytes);
    };

    let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;

    jpeg.set_exif(Some(Bytes::copy_from_slice(tiff)));

    let target_pos = match jpeg.segments().first() {
        Some(s) if s.marker() == APP0 => 1,
        _ => 0,
    };
    if let Some(pos) = find_exif_segment_pos(&jpeg) {
        if pos != target_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(pos);
            segments.insert(target_pos.min(segments.len()), seg);
        }
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}
