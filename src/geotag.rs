//! Decimal degrees → EXIF GPS rationals, and merging them into a
//! [`MetadataBlock`].

use serde::Serialize;

use crate::coords;
use crate::exif::MetadataBlock;

/// Hundredths of an arc-second in one degree.
const CENTISECONDS_PER_DEGREE: u64 = 360_000;
const CENTISECONDS_PER_MINUTE: u64 = 6_000;

/// Denominator used for the seconds rational.
pub const SECONDS_DENOMINATOR: u32 = 100;

/// Degrees, minutes, seconds as three EXIF RATIONALs.
///
/// Degrees and minutes are whole numbers over 1; seconds carry two decimal
/// places over [`SECONDS_DENOMINATOR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RationalTriple {
    pub degrees: (u32, u32),
    pub minutes: (u32, u32),
    pub seconds: (u32, u32),
}

impl RationalTriple {
    /// Convert a non-negative magnitude in degrees.
    ///
    /// Intended for magnitudes up to 180. Far larger values do not fit the
    /// degrees numerator and are not meaningful here.
    ///
    /// The value is rounded once, half away from zero, to a whole number of
    /// hundredths of an arc-second; that total is then split with integer
    /// arithmetic. A value whose seconds round to 60.00 therefore carries
    /// into the minutes instead of producing `6000/100` seconds.
    pub fn from_degrees(magnitude: f64) -> Self {
        let total = (magnitude.abs() * CENTISECONDS_PER_DEGREE as f64).round() as u64;

        let degrees = total / CENTISECONDS_PER_DEGREE;
        let rest = total % CENTISECONDS_PER_DEGREE;
        let minutes = rest / CENTISECONDS_PER_MINUTE;
        let centiseconds = rest % CENTISECONDS_PER_MINUTE;

        Self {
            degrees: (degrees as u32, 1),
            minutes: (minutes as u32, 1),
            seconds: (centiseconds as u32, SECONDS_DENOMINATOR),
        }
    }

    /// Reconstruct the magnitude in decimal degrees.
    pub fn to_degrees(&self) -> f64 {
        let ratio = |(n, d): (u32, u32)| if d == 0 { 0.0 } else { n as f64 / d as f64 };
        ratio(self.degrees) + ratio(self.minutes) / 60.0 + ratio(self.seconds) / 3600.0
    }

    /// Little-endian RATIONAL[3] payload (24 bytes).
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.to_bytes(false)
    }

    /// RATIONAL[3] payload in the requested byte order.
    pub fn to_bytes(&self, big_endian: bool) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(24);
        for (n, d) in [self.degrees, self.minutes, self.seconds] {
            if big_endian {
                bytes.extend_from_slice(&n.to_be_bytes());
                bytes.extend_from_slice(&d.to_be_bytes());
            } else {
                bytes.extend_from_slice(&n.to_le_bytes());
                bytes.extend_from_slice(&d.to_le_bytes());
            }
        }
        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LatitudeRef {
    North,
    South,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LongitudeRef {
    East,
    West,
}

impl LatitudeRef {
    /// `0.0` and `-0.0` are both north.
    pub fn from_sign(latitude: f64) -> Self {
        if latitude >= 0.0 { Self::North } else { Self::South }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
        }
    }
}

impl LongitudeRef {
    /// `0.0` and `-0.0` are both east.
    pub fn from_sign(longitude: f64) -> Self {
        if longitude >= 0.0 { Self::East } else { Self::West }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::East => 'E',
            Self::West => 'W',
        }
    }
}

/// The four GPS IFD fields this crate writes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsCategory {
    pub latitude_ref: LatitudeRef,
    pub latitude: RationalTriple,
    pub longitude_ref: LongitudeRef,
    pub longitude: RationalTriple,
}

impl GpsCategory {
    pub fn from_decimal(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude_ref: LatitudeRef::from_sign(latitude),
            latitude: RationalTriple::from_degrees(latitude.abs()),
            longitude_ref: LongitudeRef::from_sign(longitude),
            longitude: RationalTriple::from_degrees(longitude.abs()),
        }
    }

    /// Signed decimal `(latitude, longitude)`.
    pub fn to_decimal(&self) -> (f64, f64) {
        let lat = self.latitude.to_degrees();
        let lon = self.longitude.to_degrees();
        (
            if self.latitude_ref == LatitudeRef::South { -lat } else { lat },
            if self.longitude_ref == LongitudeRef::West { -lon } else { lon },
        )
    }
}

/// Replace the GPS category of `metadata` with the given position.
///
/// Any GPS fields already present are dropped; all other metadata is
/// carried through untouched.
///
/// Both values must be finite and within ±90 / ±180 degrees. Validate
/// untrusted numbers with [`coords::check_pair`] first.
pub fn compose(metadata: MetadataBlock, latitude: f64, longitude: f64) -> MetadataBlock {
    debug_assert!(
        coords::check_pair(latitude, longitude).is_ok(),
        "compose called with unchecked coordinates {latitude}, {longitude}"
    );
    let gps = GpsCategory::from_decimal(latitude, longitude);
    log::debug!(
        "GPS: {}{:?} {}{:?}",
        gps.latitude_ref.as_char(),
        gps.latitude,
        gps.longitude_ref.as_char(),
        gps.longitude
    );
    metadata.with_gps(gps)
}
