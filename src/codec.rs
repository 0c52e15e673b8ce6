//! Image decode/encode at a quality level.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::exif::embed_exif;

/// Format used when the input's container cannot be identified.
pub const DEFAULT_FORMAT: ImageFormat = ImageFormat::Jpeg;

/// A decoded source image and the container it came from.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
    format: ImageFormat,
}

impl DecodedImage {
    /// Decode raw bytes.
    ///
    /// The format is sniffed from the content, falling back to
    /// [`DEFAULT_FORMAT`]. Only JPEG can be re-encoded at a quality level,
    /// so any other recognised format is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let format = match image::guess_format(bytes) {
            Ok(f) => f,
            Err(_) => {
                log::debug!("Unknown container, assuming {DEFAULT_FORMAT:?}");
                DEFAULT_FORMAT
            }
        };

        if format != ImageFormat::Jpeg {
            anyhow::bail!(
                "Unsupported image format {format:?}: only JPEG can be re-encoded at a quality"
            );
        }

        let image = image::load_from_memory_with_format(bytes, format)
            .context("Failed to decode image")?;
        log::debug!(
            "Decoded {}x{} {:?} image ({:?})",
            image.width(),
            image.height(),
            format,
            image.color()
        );

        Ok(Self { image, format })
    }

    /// Wrap an in-memory image, to be written as JPEG.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image,
            format: DEFAULT_FORMAT,
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Something that can produce encoded bytes for a quality level.
///
/// [`JpegImageEncoder`] is the real implementation; the seam exists so the
/// size search can be driven by synthetic encoders.
pub trait Encoder {
    /// Container format of the produced bytes.
    fn format(&self) -> ImageFormat;

    /// Encode at `quality` (1–100) with `exif` (raw TIFF bytes) embedded.
    fn encode(&self, quality: u8, exif: Option<&[u8]>) -> Result<Vec<u8>>;
}

/// Baseline JPEG encoder over a decoded image.
pub struct JpegImageEncoder {
    pixels: DynamicImage,
}

impl JpegImageEncoder {
    /// Prepare pixels once for repeated encoding.
    ///
    /// JPEG has no alpha channel; grayscale stays grayscale, everything else
    /// becomes 8-bit RGB.
    pub fn new(image: &DecodedImage) -> Self {
        let pixels = match &image.image {
            DynamicImage::ImageLuma8(_) => image.image.clone(),
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma8(image.image.to_luma8()),
            DynamicImage::ImageRgb8(_) => image.image.clone(),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        Self { pixels }
    }
}

impl Encoder for JpegImageEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(&self, quality: u8, exif: Option<&[u8]>) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder
            .encode(
                self.pixels.as_bytes(),
                self.pixels.width(),
                self.pixels.height(),
                self.pixels.color().into(),
            )
            .with_context(|| format!("Failed to encode JPEG at quality {quality}"))?;

        embed_exif(buf, exif)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, LumaA, Rgba};
    use std::io::Cursor;

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_fn(64, 48, |x, y| {
            Rgba([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8, 200])
        }))
    }

    fn encode_as(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    // ── DecodedImage::decode ─────────────────────────────────────────

    #[test]
    fn decode_jpeg() {
        let rgb = DynamicImage::ImageRgb8(gradient().to_rgb8());
        let bytes = encode_as(&rgb, ImageFormat::Jpeg);
        let decoded = DecodedImage::decode(&bytes).unwrap();
        assert_eq!(decoded.format(), ImageFormat::Jpeg);
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn decode_rejects_png() {
        let bytes = encode_as(&gradient(), ImageFormat::Png);
        let err = DecodedImage::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("Unsupported image format"));
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(DecodedImage::decode(b"definitely not an image").is_err());
    }

    // ── JpegImageEncoder ─────────────────────────────────────────────

    #[test]
    fn encode_drops_alpha() {
        let encoder = JpegImageEncoder::new(&DecodedImage::from_image(gradient()));
        let out = encoder.encode(80, None).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let back = image::load_from_memory(&out).unwrap();
        assert_eq!((back.width(), back.height()), (64, 48));
    }

    #[test]
    fn encode_keeps_grayscale() {
        let pixels = ImageBuffer::from_fn(32, 32, |x, _| LumaA([x as u8 * 8, 255]));
        let gray = DynamicImage::ImageLumaA8(pixels);
        let encoder = JpegImageEncoder::new(&DecodedImage::from_image(gray));
        let back = image::load_from_memory(&encoder.encode(90, None).unwrap()).unwrap();
        assert_eq!(back.color(), image::ColorType::L8);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let encoder = JpegImageEncoder::new(&DecodedImage::from_image(gradient()));
        let high = encoder.encode(95, None).unwrap().len();
        let low = encoder.encode(10, None).unwrap().len();
        assert!(low < high, "{low} >= {high}");
    }
}
