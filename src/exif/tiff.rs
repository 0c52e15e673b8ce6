use anyhow::Result;

use crate::geotag::GpsCategory;

pub(crate) const TAG_GPS_IFD_POINTER: u16 = 0x8825;
const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;

// TIFF field types
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

const ENTRY_LEN: usize = 12;

/// Byte order and IFD0 location of a raw TIFF (EXIF) block.
///
/// Only IFD0 is inspected; everything it points to is treated as opaque.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TiffLayout {
    big_endian: bool,
    ifd0_offset: usize,
    ifd0_count: usize,
}

impl TiffLayout {
    /// Validate the header and IFD0 bounds.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            anyhow::bail!("TIFF data too short");
        }

        let big_endian = match &data[0..2] {
            b"MM" => true,
            b"II" => false,
            _ => anyhow::bail!("Invalid TIFF byte order"),
        };

        let mut layout = Self {
            big_endian,
            ifd0_offset: 0,
            ifd0_count: 0,
        };

        if layout.read_u16(data, 2) != 42 {
            anyhow::bail!("Invalid TIFF magic number");
        }

        layout.ifd0_offset = layout.read_u32(data, 4) as usize;
        if layout.ifd0_offset < 8 || layout.ifd0_offset + 2 > data.len() {
            anyhow::bail!("IFD0 offset out of bounds");
        }
        layout.ifd0_count = layout.read_u16(data, layout.ifd0_offset) as usize;
        if layout.ifd0_end() + 4 > data.len() {
            anyhow::bail!("IFD0 entries extend beyond TIFF data");
        }

        Ok(layout)
    }

    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    fn ifd0_start(&self) -> usize {
        self.ifd0_offset + 2
    }

    fn ifd0_end(&self) -> usize {
        self.ifd0_start() + self.ifd0_count * ENTRY_LEN
    }

    /// Raw 12-byte IFD0 entries, in file order.
    pub fn ifd0_entries<'a>(&self, data: &'a [u8]) -> impl Iterator<Item = &'a [u8]> {
        let start = self.ifd0_start();
        (0..self.ifd0_count).map(move |i| &data[start + i * ENTRY_LEN..start + (i + 1) * ENTRY_LEN])
    }

    pub fn entry_tag(&self, entry: &[u8]) -> u16 {
        self.read_u16(entry, 0)
    }

    /// Offset of the GPS IFD, if IFD0 points to one.
    pub fn gps_ifd_offset(&self, data: &[u8]) -> Option<usize> {
        self.ifd0_entries(data)
            .find(|e| self.entry_tag(e) == TAG_GPS_IFD_POINTER)
            .map(|e| self.read_u32(e, 8) as usize)
    }

    pub fn read_u16(&self, data: &[u8], offset: usize) -> u16 {
        let b = [data[offset], data[offset + 1]];
        if self.big_endian { u16::from_be_bytes(b) } else { u16::from_le_bytes(b) }
    }

    pub fn read_u32(&self, data: &[u8], offset: usize) -> u32 {
        let b = [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]];
        if self.big_endian { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) }
    }

    fn encode_u16(&self, val: u16) -> [u8; 2] {
        if self.big_endian { val.to_be_bytes() } else { val.to_le_bytes() }
    }

    fn encode_u32(&self, val: u32) -> [u8; 4] {
        if self.big_endian { val.to_be_bytes() } else { val.to_le_bytes() }
    }

    fn entry(&self, tag: u16, field_type: u16, count: u32, value: [u8; 4]) -> [u8; ENTRY_LEN] {
        let mut e = [0u8; ENTRY_LEN];
        e[0..2].copy_from_slice(&self.encode_u16(tag));
        e[2..4].copy_from_slice(&self.encode_u16(field_type));
        e[4..8].copy_from_slice(&self.encode_u32(count));
        e[8..12].copy_from_slice(&value);
        e
    }
}

/// Pad to a word boundary; IFDs and value blocks must start on one.
fn pad_to_word(buf: &mut Vec<u8>) {
    if buf.len() % 2 != 0 {
        buf.push(0);
    }
}

fn offset_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| anyhow::anyhow!("TIFF data exceeds 4 GiB"))
}

// Little-endian header and an empty IFD0
const EMPTY_TIFF: &[u8] = b"II*\0\x08\0\0\0\0\0\0\0\0\0";

/// A TIFF block holding nothing but the GPS IFD.
pub(crate) fn gps_only_tiff(gps: &GpsCategory) -> Result<Vec<u8>> {
    replace_gps_ifd(EMPTY_TIFF, gps)
}

/// Write a new GPS IFD into `original` and repoint IFD0 at it.
///
/// The original bytes are kept as they are and the new GPS IFD plus a
/// rewritten copy of IFD0 are appended, so every existing offset stays valid.
/// IFD0 keeps all of its entries except the old GPS pointer; the old GPS IFD
/// becomes unreferenced.
pub(crate) fn replace_gps_ifd(original: &[u8], gps: &GpsCategory) -> Result<Vec<u8>> {
    let layout = TiffLayout::parse(original)?;
    match layout.gps_ifd_offset(original) {
        Some(offset) => log::debug!("Dropping GPS IFD at offset {offset}"),
        None => log::debug!("No GPS IFD in existing block"),
    }
    let mut result = original.to_vec();

    // === GPS IFD ===
    pad_to_word(&mut result);
    let gps_ifd_start = offset_u32(result.len())?;
    let gps_entry_count: u16 = 4;
    let gps_data_start = gps_ifd_start + 2 + gps_entry_count as u32 * ENTRY_LEN as u32 + 4;
    let latitude_offset = gps_data_start;
    let longitude_offset = gps_data_start + 24;

    let ascii_ref = |c: char| [c as u8, 0, 0, 0];

    result.extend_from_slice(&layout.encode_u16(gps_entry_count));
    result.extend_from_slice(&layout.entry(
        TAG_GPS_LATITUDE_REF,
        TYPE_ASCII,
        2,
        ascii_ref(gps.latitude_ref.as_char()),
    ));
    result.extend_from_slice(&layout.entry(
        TAG_GPS_LATITUDE,
        TYPE_RATIONAL,
        3,
        layout.encode_u32(latitude_offset),
    ));
    result.extend_from_slice(&layout.entry(
        TAG_GPS_LONGITUDE_REF,
        TYPE_ASCII,
        2,
        ascii_ref(gps.longitude_ref.as_char()),
    ));
    result.extend_from_slice(&layout.entry(
        TAG_GPS_LONGITUDE,
        TYPE_RATIONAL,
        3,
        layout.encode_u32(longitude_offset),
    ));
    result.extend_from_slice(&layout.encode_u32(0));
    result.extend_from_slice(&gps.latitude.to_bytes(layout.big_endian()));
    result.extend_from_slice(&gps.longitude.to_bytes(layout.big_endian()));

    // === IFD0, rebuilt at the end ===
    let mut entries: Vec<[u8; ENTRY_LEN]> = layout
        .ifd0_entries(original)
        .filter(|e| layout.entry_tag(e) != TAG_GPS_IFD_POINTER)
        .map(|e| {
            let mut raw = [0u8; ENTRY_LEN];
            raw.copy_from_slice(e);
            raw
        })
        .collect();
    entries.push(layout.entry(
        TAG_GPS_IFD_POINTER,
        TYPE_LONG,
        1,
        layout.encode_u32(gps_ifd_start),
    ));
    // IFD entries must be sorted by tag
    entries.sort_by_key(|e| layout.entry_tag(e));

    let ifd0_next = layout.read_u32(original, layout.ifd0_end());

    pad_to_word(&mut result);
    let new_ifd0_start = offset_u32(result.len())?;
    let count = u16::try_from(entries.len())
        .map_err(|_| anyhow::anyhow!("Too many IFD0 entries"))?;
    result.extend_from_slice(&layout.encode_u16(count));
    for e in &entries {
        result.extend_from_slice(e);
    }
    result.extend_from_slice(&layout.encode_u32(ifd0_next));

    // Update TIFF header to point to new IFD0
    result[4..8].copy_from_slice(&layout.encode_u32(new_ifd0_start));

    Ok(result)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geotag::{LatitudeRef, LongitudeRef};

    /// IFD0 with Make="Cam", Orientation=6 and a GPS IFD holding GPSVersionID
    /// plus a GPSAltitude the replacement must drop.
    pub(crate) fn sample_tiff(big_endian: bool) -> Vec<u8> {
        let u16b = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        let u32b = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        let entry = |tag: u16, ty: u16, count: u32, value: [u8; 4]| {
            let mut e = Vec::with_capacity(12);
            e.extend_from_slice(&u16b(tag));
            e.extend_from_slice(&u16b(ty));
            e.extend_from_slice(&u32b(count));
            e.extend_from_slice(&value);
            e
        };

        let mut t = Vec::new();
        t.extend_from_slice(if big_endian { b"MM" } else { b"II" });
        t.extend_from_slice(&u16b(42));
        t.extend_from_slice(&u32b(8));

        // IFD0 at 8: 3 entries → ends at 8 + 2 + 36 + 4 = 50
        let gps_ifd = 50u32;
        t.extend_from_slice(&u16b(3));
        t.extend(entry(0x010F, TYPE_ASCII, 4, *b"Cam\0"));
        let mut orientation = [0u8; 4];
        orientation[..2].copy_from_slice(&u16b(6));
        t.extend(entry(0x0112, 3, 1, orientation));
        t.extend(entry(TAG_GPS_IFD_POINTER, TYPE_LONG, 1, u32b(gps_ifd)));
        t.extend_from_slice(&u32b(0));
        assert_eq!(t.len(), gps_ifd as usize);

        // GPS IFD at 50: version + altitude (rational at 80)
        t.extend_from_slice(&u16b(2));
        t.extend(entry(0x0000, 1, 4, [2, 3, 0, 0]));
        t.extend(entry(0x0006, TYPE_RATIONAL, 1, u32b(80)));
        t.extend_from_slice(&u32b(0));
        t.extend_from_slice(&u32b(100));
        t.extend_from_slice(&u32b(1));
        t
    }

    /// Decode the four written GPS fields back out of a TIFF block.
    pub(crate) fn read_gps(data: &[u8]) -> Option<(char, [u32; 6], char, [u32; 6], usize)> {
        let layout = TiffLayout::parse(data).ok()?;
        let gps = layout.gps_ifd_offset(data)?;
        let count = layout.read_u16(data, gps) as usize;
        let mut lat_ref = None;
        let mut lon_ref = None;
        let mut lat = None;
        let mut lon = None;
        for i in 0..count {
            let e = &data[gps + 2 + i * 12..gps + 14 + i * 12];
            let rationals = |off: usize| -> [u32; 6] {
                std::array::from_fn(|k| layout.read_u32(data, off + k * 4))
            };
            match layout.entry_tag(e) {
                TAG_GPS_LATITUDE_REF => lat_ref = Some(e[8] as char),
                TAG_GPS_LONGITUDE_REF => lon_ref = Some(e[8] as char),
                TAG_GPS_LATITUDE => lat = Some(rationals(layout.read_u32(e, 8) as usize)),
                TAG_GPS_LONGITUDE => lon = Some(rationals(layout.read_u32(e, 8) as usize)),
                _ => {}
            }
        }
        Some((lat_ref?, lat?, lon_ref?, lon?, count))
    }

    fn gps() -> GpsCategory {
        GpsCategory::from_decimal(18.463916, -73.835866)
    }

    // ── TiffLayout::parse ────────────────────────────────────────────

    #[test]
    fn parse_rejects_garbage() {
        assert!(TiffLayout::parse(b"").is_err());
        assert!(TiffLayout::parse(b"XX*\0\x08\0\0\0").is_err());
        assert!(TiffLayout::parse(b"II\x2b\0\x08\0\0\0\0\0\0\0").is_err());
        // IFD0 offset past the end
        assert!(TiffLayout::parse(b"II*\0\xff\0\0\0").is_err());
        // IFD0 claims 5 entries that are not there
        assert!(TiffLayout::parse(b"II*\0\x08\0\0\0\x05\0").is_err());
    }

    #[test]
    fn parse_accepts_sample() {
        for be in [false, true] {
            let t = sample_tiff(be);
            let layout = TiffLayout::parse(&t).unwrap();
            assert_eq!(layout.big_endian(), be);
            assert_eq!(layout.ifd0_entries(&t).count(), 3);
            assert_eq!(layout.gps_ifd_offset(&t), Some(50));
        }
    }

    // ── replace_gps_ifd ──────────────────────────────────────────────

    #[test]
    fn replace_keeps_original_prefix() {
        let t = sample_tiff(false);
        let out = replace_gps_ifd(&t, &gps()).unwrap();
        assert_eq!(&out[8..t.len()], &t[8..]);
        assert_eq!(&out[0..4], &t[0..4]);
    }

    #[test]
    fn replace_writes_four_gps_fields() {
        for be in [false, true] {
            let out = replace_gps_ifd(&sample_tiff(be), &gps()).unwrap();
            let (lat_ref, lat, lon_ref, lon, count) = read_gps(&out).unwrap();
            assert_eq!(count, 4, "altitude and version dropped");
            assert_eq!(lat_ref, LatitudeRef::North.as_char());
            assert_eq!(lon_ref, LongitudeRef::West.as_char());
            assert_eq!(lat, [18, 1, 27, 1, 5010, 100]);
            assert_eq!(lon[0..4], [73, 1, 50, 1]);
        }
    }

    #[test]
    fn replace_preserves_other_ifd0_entries() {
        let t = sample_tiff(true);
        let before = TiffLayout::parse(&t).unwrap();
        let kept: Vec<Vec<u8>> = before
            .ifd0_entries(&t)
            .filter(|e| before.entry_tag(e) != TAG_GPS_IFD_POINTER)
            .map(|e| e.to_vec())
            .collect();

        let out = replace_gps_ifd(&t, &gps()).unwrap();
        let after = TiffLayout::parse(&out).unwrap();
        let entries: Vec<&[u8]> = after.ifd0_entries(&out).collect();
        assert_eq!(entries.len(), 3);
        for k in &kept {
            assert!(entries.iter().any(|e| e == k));
        }
        let tags: Vec<u16> = entries.iter().map(|e| after.entry_tag(e)).collect();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);
    }

    #[test]
    fn replace_adds_pointer_when_absent() {
        // Minimal TIFF: empty IFD0
        let t = b"II*\0\x08\0\0\0\0\0\0\0\0\0".to_vec();
        let out = replace_gps_ifd(&t, &gps()).unwrap();
        let layout = TiffLayout::parse(&out).unwrap();
        assert_eq!(layout.ifd0_entries(&out).count(), 1);
        assert!(read_gps(&out).is_some());
    }

    #[test]
    fn gps_only_block_has_single_pointer() {
        let out = gps_only_tiff(&gps()).unwrap();
        let layout = TiffLayout::parse(&out).unwrap();
        let tags: Vec<u16> = layout.ifd0_entries(&out).map(|e| layout.entry_tag(e)).collect();
        assert_eq!(tags, [TAG_GPS_IFD_POINTER]);
        let (lat_ref, lat, lon_ref, _, count) = read_gps(&out).unwrap();
        assert_eq!((lat_ref, lon_ref, count), ('N', 'W', 4));
        assert_eq!(lat, [18, 1, 27, 1, 5010, 100]);
    }

    #[test]
    fn replace_offsets_are_word_aligned() {
        let mut t = b"II*\0\x08\0\0\0\0\0\0\0\0\0".to_vec();
        t.push(0xAB); // odd length
        let out = replace_gps_ifd(&t, &gps()).unwrap();
        let layout = TiffLayout::parse(&out).unwrap();
        assert_eq!(layout.gps_ifd_offset(&out).unwrap() % 2, 0);
        assert_eq!(layout.read_u32(&out, 4) % 2, 0);
    }
}
