use serde::{Deserialize, Serialize};

use crate::value::parse_rationals;

/// GPS position in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoords {
    pub latitude: f64,
    pub longitude: f64,
}

/// One axis encoded for EXIF: DMS rational text plus its hemisphere letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmsAxis {
    pub value: String,
    pub reference: &'static str,
}

pub fn latitude_ref(latitude: f64) -> &'static str {
    if latitude >= 0.0 { "N" } else { "S" }
}

pub fn longitude_ref(longitude: f64) -> &'static str {
    if longitude >= 0.0 { "E" } else { "W" }
}

/// Encode an absolute coordinate as `deg/1,min/1,millisec/1000`.
///
/// Every step truncates; nothing is rounded.
pub fn encode_dms(value: f64) -> String {
    let abs = value.abs();
    let degrees = abs as u32;
    let minutes = ((abs - degrees as f64) * 60.0) as u32;
    let seconds = (abs - degrees as f64 - minutes as f64 / 60.0) * 3600.0;
    let millis = (seconds * 1000.0) as u32;
    format!("{degrees}/1,{minutes}/1,{millis}/1000")
}

pub fn encode_latitude(latitude: f64) -> DmsAxis {
    DmsAxis {
        value: encode_dms(latitude),
        reference: latitude_ref(latitude),
    }
}

pub fn encode_longitude(longitude: f64) -> DmsAxis {
    DmsAxis {
        value: encode_dms(longitude),
        reference: longitude_ref(longitude),
    }
}

/// Decode DMS rational text back to signed decimal degrees.
///
/// A missing reference is treated as the positive hemisphere.
pub fn decode_dms(value: &str, reference: Option<&str>) -> Option<f64> {
    let parts = parse_rationals(value)?;
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|(_, d)| *d == 0) {
        return None;
    }
    let component = |i: usize| {
        parts
            .get(i)
            .map(|(n, d)| *n as f64 / *d as f64)
            .unwrap_or(0.0)
    };
    let mut coord = component(0) + component(1) / 60.0 + component(2) / 3600.0;

    if matches!(reference.map(str::trim), Some("S" | "s" | "W" | "w")) {
        coord = -coord;
    }

    Some(coord)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hemisphere_refs() {
        assert_eq!(latitude_ref(37.0), "N");
        assert_eq!(latitude_ref(-0.1), "S");
        assert_eq!(longitude_ref(-122.0), "W");
        assert_eq!(longitude_ref(10.0), "E");
    }

    #[test]
    fn zero_is_positive_hemisphere() {
        assert_eq!(latitude_ref(0.0), "N");
        assert_eq!(longitude_ref(0.0), "E");
        assert_eq!(encode_dms(0.0), "0/1,0/1,0/1000");
    }

    #[test]
    fn exact_values_encode_exactly() {
        assert_eq!(encode_dms(10.5), "10/1,30/1,0/1000");
        assert_eq!(encode_dms(-45.25), "45/1,15/1,0/1000");
        assert_eq!(encode_dms(1.0), "1/1,0/1,0/1000");
    }

    #[test]
    fn san_francisco() {
        let lat = encode_latitude(37.7749);
        assert_eq!(lat.reference, "N");
        // 0.0082333° * 3600 = 29.64 s, truncated to millis
        assert_eq!(lat.value, "37/1,46/1,29640/1000");

        let lon = encode_longitude(-122.4194);
        assert_eq!(lon.reference, "W");
        assert_eq!(lon.value, "122/1,25/1,9839/1000");
    }

    #[test]
    fn decode_applies_hemisphere() {
        let v = decode_dms("10/1,30/1,0/1000", Some("S")).unwrap();
        assert!((v + 10.5).abs() < 1e-9);
        let v = decode_dms("10/1,30/1,0/1000", None).unwrap();
        assert!((v - 10.5).abs() < 1e-9);
    }

    #[test]
    fn decode_is_close_to_input() {
        let encoded = encode_dms(37.7749);
        let v = decode_dms(&encoded, Some("N")).unwrap();
        assert!((v - 37.7749).abs() < 1e-6);
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert!(decode_dms("", Some("N")).is_none());
        assert!(decode_dms("1/0,2/1,3/1", Some("N")).is_none());
        assert!(decode_dms("north", None).is_none());
    }
}
