use crate::geotag::GpsCategory;

use super::tiff::TiffLayout;

/// Where the GPS category of a [`MetadataBlock`] came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gps {
    /// Read from the source image; written back untouched.
    Existing(GpsCategory),
    /// Set by [`compose`](crate::geotag::compose); replaces the source's GPS IFD.
    Composed(GpsCategory),
}

/// Typed view of an image's EXIF block.
///
/// The GPS category is modelled; every other IFD is carried as the
/// original TIFF bytes and written back as-is.
#[derive(Debug, Clone, Default)]
pub struct MetadataBlock {
    gps: Option<Gps>,
    passthrough: Option<Vec<u8>>,
}

impl MetadataBlock {
    /// Wrap a raw TIFF block taken from an image.
    ///
    /// A block whose header or IFD0 is unreadable is dropped with a warning
    /// and the result is empty: geotagging never needs the old data.
    pub fn from_tiff(tiff: Vec<u8>, existing_gps: Option<GpsCategory>) -> Self {
        match TiffLayout::parse(&tiff) {
            Ok(_) => Self {
                gps: existing_gps.map(Gps::Existing),
                passthrough: Some(tiff),
            },
            Err(e) => {
                log::warn!("Ignoring unreadable EXIF block: {e}");
                Self::default()
            }
        }
    }

    /// The GPS position, whether read or composed.
    pub fn gps(&self) -> Option<&GpsCategory> {
        match &self.gps {
            Some(Gps::Existing(g)) | Some(Gps::Composed(g)) => Some(g),
            None => None,
        }
    }

    pub fn gps_state(&self) -> Option<&Gps> {
        self.gps.as_ref()
    }

    pub fn with_gps(mut self, gps: GpsCategory) -> Self {
        self.gps = Some(Gps::Composed(gps));
        self
    }

    pub fn has_passthrough(&self) -> bool {
        self.passthrough.is_some()
    }

    pub(crate) fn passthrough(&self) -> Option<&[u8]> {
        self.passthrough.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::tiff::tests::sample_tiff;

    #[test]
    fn from_tiff_keeps_valid_block() {
        let gps = GpsCategory::from_decimal(1.0, 2.0);
        let block = MetadataBlock::from_tiff(sample_tiff(false), Some(gps));
        assert!(block.has_passthrough());
        assert_eq!(block.gps_state(), Some(&Gps::Existing(gps)));
    }

    #[test]
    fn from_tiff_corrupt_is_empty() {
        let block = MetadataBlock::from_tiff(b"not a tiff".to_vec(), None);
        assert!(!block.has_passthrough());
        assert!(block.gps().is_none());
    }

    #[test]
    fn with_gps_marks_composed() {
        let gps = GpsCategory::from_decimal(-1.0, -2.0);
        let block = MetadataBlock::from_tiff(sample_tiff(true), None).with_gps(gps);
        assert_eq!(block.gps_state(), Some(&Gps::Composed(gps)));
        assert_eq!(block.passthrough().map(|p| p.len()), Some(sample_tiff(true).len()));
    }
}
