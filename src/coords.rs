//! Coordinate text parsing.
//!
//! Two notations are accepted, tried in this order:
//!
//! | Notation | Example |
//! |----------|---------|
//! | DMS with hemisphere | `18°27'50.1" N`, `73°50'9.1"e` |
//! | Plain signed decimal | `18.463916`, `-73.835866` |
//!
//! [`parse`] only checks the grammar. Range checks live in
//! [`parse_latitude`] and [`parse_longitude`], and [`parse_pair`] reports
//! which of the two inputs was wrong. [`check_pair`] applies the same
//! checks to degrees that are already numbers.

use thiserror::Error;

/// Why a piece of coordinate text was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidReason {
    #[error("not a decimal or DMS coordinate")]
    Unrecognized,
    #[error("value is not a finite number")]
    NonFinite,
    #[error("{value} is outside ±{limit}")]
    OutOfRange { value: f64, limit: f64 },
}

/// A single coordinate string that could not be turned into degrees.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid coordinate {text:?}: {reason}")]
pub struct InvalidCoordinate {
    /// The text exactly as the user supplied it.
    pub text: String,
    pub reason: InvalidReason,
}

impl InvalidCoordinate {
    fn new(text: &str, reason: InvalidReason) -> Self {
        Self {
            text: text.to_string(),
            reason,
        }
    }
}

/// Failure of a latitude/longitude pair, naming the side(s) at fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatesError {
    #[error("latitude: {0}")]
    Latitude(InvalidCoordinate),
    #[error("longitude: {0}")]
    Longitude(InvalidCoordinate),
    #[error("latitude: {latitude}; longitude: {longitude}")]
    Both {
        latitude: InvalidCoordinate,
        longitude: InvalidCoordinate,
    },
}

pub const MAX_LATITUDE: f64 = 90.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Parse a coordinate in DMS-with-hemisphere or plain decimal notation.
///
/// Degrees and minutes are not bounded here; `"200°75'0" N"` parses to
/// `201.25`. Use [`parse_latitude`] / [`parse_longitude`] when the value is
/// going to be written anywhere.
///
/// # Example
///
/// ```rust
/// use geotag_squeeze::coords::parse;
///
/// assert_eq!(parse("18.463916").unwrap(), 18.463916);
/// let south = parse("18°27'50.10\" s").unwrap();
/// assert!((south + 18.463916).abs() < 1e-5);
/// assert!(parse("12.5abc").is_err());
/// ```
pub fn parse(text: &str) -> Result<f64, InvalidCoordinate> {
    let trimmed = text.trim();

    let value = match parse_dms(trimmed) {
        Some(v) => v,
        // Rust's float grammar accepts the whole string or nothing.
        None => trimmed
            .parse::<f64>()
            .map_err(|_| InvalidCoordinate::new(text, InvalidReason::Unrecognized))?,
    };

    if !value.is_finite() {
        return Err(InvalidCoordinate::new(text, InvalidReason::NonFinite));
    }
    Ok(value)
}

/// Parse and require the value to lie within [-90, 90].
pub fn parse_latitude(text: &str) -> Result<f64, InvalidCoordinate> {
    parse_bounded(text, MAX_LATITUDE)
}

/// Parse and require the value to lie within [-180, 180].
pub fn parse_longitude(text: &str) -> Result<f64, InvalidCoordinate> {
    parse_bounded(text, MAX_LONGITUDE)
}

/// Parse both halves of a coordinate pair, collecting failures from each.
pub fn parse_pair(latitude: &str, longitude: &str) -> Result<(f64, f64), CoordinatesError> {
    combine(parse_latitude(latitude), parse_longitude(longitude))
}

/// Apply the same finiteness and range checks to decimal degrees that did
/// not come from text.
pub fn check_pair(latitude: f64, longitude: f64) -> Result<(f64, f64), CoordinatesError> {
    combine(
        check_bounded(&latitude.to_string(), latitude, MAX_LATITUDE),
        check_bounded(&longitude.to_string(), longitude, MAX_LONGITUDE),
    )
}

fn combine(
    latitude: Result<f64, InvalidCoordinate>,
    longitude: Result<f64, InvalidCoordinate>,
) -> Result<(f64, f64), CoordinatesError> {
    match (latitude, longitude) {
        (Ok(lat), Ok(lon)) => Ok((lat, lon)),
        (Err(e), Ok(_)) => Err(CoordinatesError::Latitude(e)),
        (Ok(_), Err(e)) => Err(CoordinatesError::Longitude(e)),
        (Err(latitude), Err(longitude)) => Err(CoordinatesError::Both {
            latitude,
            longitude,
        }),
    }
}

fn parse_bounded(text: &str, limit: f64) -> Result<f64, InvalidCoordinate> {
    check_bounded(text, parse(text)?, limit)
}

fn check_bounded(text: &str, value: f64, limit: f64) -> Result<f64, InvalidCoordinate> {
    if !value.is_finite() {
        return Err(InvalidCoordinate::new(text, InvalidReason::NonFinite));
    }
    if value.abs() > limit {
        return Err(InvalidCoordinate::new(
            text,
            InvalidReason::OutOfRange { value, limit },
        ));
    }
    Ok(value)
}

/// Match `D°M'S.F" H` against the whole (already trimmed) input.
///
/// Anything after the single hemisphere letter is rejected, so
/// `18°27'50.1" North` is not a coordinate even though it starts like one.
fn parse_dms(s: &str) -> Option<f64> {
    let (degrees, rest) = s.split_once('°')?;
    let (minutes, rest) = rest.split_once('\'')?;
    let (seconds, rest) = rest.split_once('"')?;

    if !is_digits(degrees) || !is_digits(minutes) || !is_unsigned_decimal(seconds) {
        return None;
    }

    let hemisphere = match rest.trim_start() {
        h if h.len() == 1 => h.chars().next()?.to_ascii_uppercase(),
        _ => return None,
    };

    let magnitude = degrees.parse::<f64>().ok()?
        + minutes.parse::<f64>().ok()? / 60.0
        + seconds.parse::<f64>().ok()? / 3600.0;

    match hemisphere {
        'N' | 'E' => Some(magnitude),
        'S' | 'W' => Some(-magnitude),
        _ => None,
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Digits with at most one `.`, and at least one digit somewhere.
fn is_unsigned_decimal(s: &str) -> bool {
    let mut dots = 0;
    let mut digits = 0;
    for b in s.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-5;

    // ── plain decimal ────────────────────────────────────────────────

    #[test]
    fn decimal_matches_float_parse() {
        for s in ["18.463916", "-73.835866", "0", "-0.0001", "+45", "1e1", ".5", "180"] {
            assert_eq!(parse(s).unwrap(), s.parse::<f64>().unwrap(), "{s}");
        }
    }

    #[test]
    fn decimal_surrounding_whitespace_trimmed() {
        assert_eq!(parse("  18.5\t\n").unwrap(), 18.5);
    }

    #[test]
    fn decimal_trailing_garbage_rejected() {
        let err = parse("12.5abc").unwrap_err();
        assert_eq!(err.reason, InvalidReason::Unrecognized);
        assert_eq!(err.text, "12.5abc");
    }

    #[test]
    fn non_finite_rejected() {
        for s in ["inf", "-infinity", "NaN", "1e400"] {
            assert_eq!(parse(s).unwrap_err().reason, InvalidReason::NonFinite, "{s}");
        }
    }

    // ── DMS ──────────────────────────────────────────────────────────

    #[test]
    fn dms_north() {
        let v = parse("18°27'50.10\" N").unwrap();
        assert!((v - 18.463_916_6).abs() < EPS, "{v}");
    }

    #[test]
    fn dms_south_negates() {
        let n = parse("18°27'50.10\" N").unwrap();
        let s = parse("18°27'50.10\" S").unwrap();
        assert_eq!(s, -n);
    }

    #[test]
    fn dms_hemisphere_case_insensitive_and_optional_space() {
        let a = parse("73°50'9.12\"E").unwrap();
        let b = parse("  73°50'9.12\"   e ").unwrap();
        assert_eq!(a, b);
        assert!(a > 0.0);
        assert!(parse("73°50'9.12\" w").unwrap() < 0.0);
    }

    #[test]
    fn dms_integer_seconds() {
        let v = parse("10°30'0\" N").unwrap();
        assert!((v - 10.5).abs() < 1e-12);
    }

    #[test]
    fn dms_degrees_not_bounded() {
        let v = parse("200°75'0\" N").unwrap();
        assert!((v - 201.25).abs() < 1e-12);
    }

    #[test]
    fn dms_rejects_structural_variants() {
        for s in [
            "18°27'50.1\"",      // no hemisphere
            "18°27'50.1\" X",    // bad hemisphere
            "18°27'50.1\" NE",   // two letters
            "18°27'50.1\" N!",   // trailing text
            "18° 27'50.1\" N",   // space inside
            "-18°27'50.1\" N",   // signed degrees
            "18°27'5.0.1\" N",   // two dots
            "18°27'.\" N",       // no digits in seconds
            "18°27'50.1\" North", // spelled-out hemisphere
        ] {
            assert!(parse(s).is_err(), "{s} should fail");
        }
    }

    // ── malformed input ──────────────────────────────────────────────

    #[test]
    fn malformed_inputs_are_errors() {
        for s in ["", "   ", "abc", "91°", "18.46,73.83"] {
            let err = parse(s).unwrap_err();
            assert_eq!(err.reason, InvalidReason::Unrecognized, "{s}");
        }
    }

    // ── range checks ─────────────────────────────────────────────────

    #[test]
    fn latitude_range() {
        assert_eq!(parse_latitude("90").unwrap(), 90.0);
        assert_eq!(parse_latitude("-90").unwrap(), -90.0);
        let err = parse_latitude("90.5").unwrap_err();
        assert!(matches!(err.reason, InvalidReason::OutOfRange { limit, .. } if limit == 90.0));
    }

    #[test]
    fn longitude_range() {
        assert_eq!(parse_longitude("-180").unwrap(), -180.0);
        assert!(parse_longitude("180.01").is_err());
        assert!(parse_longitude("100°0'0\" W").is_ok());
    }

    // ── parse_pair ───────────────────────────────────────────────────

    #[test]
    fn pair_ok() {
        assert_eq!(
            parse_pair("18.463916", "73.835866").unwrap(),
            (18.463916, 73.835866)
        );
    }

    #[test]
    fn pair_reports_latitude_only() {
        match parse_pair("abc", "73.8").unwrap_err() {
            CoordinatesError::Latitude(e) => assert_eq!(e.text, "abc"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pair_reports_longitude_only() {
        match parse_pair("18.4", "200").unwrap_err() {
            CoordinatesError::Longitude(e) => {
                assert_eq!(e.text, "200");
                assert!(matches!(e.reason, InvalidReason::OutOfRange { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pair_reports_both() {
        match parse_pair("", "18.46,73.83").unwrap_err() {
            CoordinatesError::Both { latitude, longitude } => {
                assert_eq!(latitude.text, "");
                assert_eq!(longitude.text, "18.46,73.83");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    // ── check_pair ───────────────────────────────────────────────────

    #[test]
    fn check_pair_accepts_bounds() {
        assert_eq!(check_pair(-90.0, 180.0).unwrap(), (-90.0, 180.0));
        assert_eq!(check_pair(0.0, -0.0).unwrap(), (0.0, -0.0));
    }

    #[test]
    fn check_pair_rejects_out_of_range_and_non_finite() {
        match check_pair(5000.0, f64::NAN).unwrap_err() {
            CoordinatesError::Both { latitude, longitude } => {
                assert!(matches!(
                    latitude.reason,
                    InvalidReason::OutOfRange { value, .. } if value == 5000.0
                ));
                assert_eq!(longitude.reason, InvalidReason::NonFinite);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            check_pair(1e13, 0.0).unwrap_err(),
            CoordinatesError::Latitude(_)
        ));
        assert!(matches!(
            check_pair(0.0, f64::NEG_INFINITY).unwrap_err(),
            CoordinatesError::Longitude(_)
        ));
    }

    #[test]
    fn error_message_includes_text() {
        let msg = parse_pair("abc", "1").unwrap_err().to_string();
        assert!(msg.contains("latitude"));
        assert!(msg.contains("\"abc\""));
    }
}
