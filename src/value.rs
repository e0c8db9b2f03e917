//! Text form of EXIF values.
//!
//! Values travel through the crate as strings: rationals as `num/den` pairs
//! joined by commas, integers in decimal, and text tags as plain text.

/// Character-code prefix for UNDEFINED text tags.
pub const ASCII_PREFIX: &[u8; 8] = b"ASCII\0\0\0";
const UNICODE_PREFIX: &[u8; 8] = b"UNICODE\0";
const JIS_PREFIX: &[u8; 8] = b"JIS\0\0\0\0\0";

/// Denominator used when a rational is given as a decimal number.
const DECIMAL_DENOMINATOR: u32 = 10000;

/// Format a list of unsigned rationals as `n/d,n/d,...`.
pub fn format_rationals(values: &[(u32, u32)]) -> String {
    values
        .iter()
        .map(|(n, d)| format!("{n}/{d}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a list of unsigned rationals.
///
/// Each component may be `n/d`, an integer, or a decimal number. Components
/// are separated by commas, or by colons (`HH:MM:SS` time stamps).
pub fn parse_rationals(s: &str) -> Option<Vec<(u32, u32)>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let sep = if s.contains(',') { ',' } else { ':' };
    s.split(sep).map(parse_rational).collect()
}

fn parse_rational(s: &str) -> Option<(u32, u32)> {
    let s = s.trim();
    if let Some((num, den)) = s.split_once('/') {
        let num = num.trim().parse::<u32>().ok()?;
        let den = den.trim().parse::<u32>().ok()?;
        return Some((num, den));
    }
    if let Ok(n) = s.parse::<u32>() {
        return Some((n, 1));
    }
    let f = s.parse::<f64>().ok()?;
    if !f.is_finite() || f < 0.0 || f > u32::MAX as f64 / DECIMAL_DENOMINATOR as f64 {
        return None;
    }
    Some(((f * DECIMAL_DENOMINATOR as f64).round() as u32, DECIMAL_DENOMINATOR))
}

/// Parse a comma-separated list of integers that must fit in `u16`.
pub fn parse_shorts(s: &str) -> Option<Vec<u16>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.split(',').map(|p| p.trim().parse::<u16>().ok()).collect()
}

/// Parse a comma-separated list of integers that must fit in `u8`.
pub fn parse_bytes(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.split(',').map(|p| p.trim().parse::<u8>().ok()).collect()
}

/// Encode text for an UNDEFINED text tag (UserComment, GPSProcessingMethod).
pub fn encode_text_with_prefix(text: &str) -> Vec<u8> {
    let mut bytes = ASCII_PREFIX.to_vec();
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// Decode an UNDEFINED text tag, dropping the character-code prefix.
pub fn decode_prefixed_text(raw: &[u8]) -> String {
    let body = if raw.len() >= 8
        && (raw.starts_with(ASCII_PREFIX)
            || raw.starts_with(UNICODE_PREFIX)
            || raw.starts_with(JIS_PREFIX)
            || raw[..8].iter().all(|b| *b == 0))
    {
        &raw[8..]
    } else {
        raw
    };
    trim_text(&String::from_utf8_lossy(body))
}

/// Strip NUL padding and the quotes some readers wrap text values in.
pub fn trim_text(s: &str) -> String {
    s.trim_end_matches('\0')
        .trim()
        .trim_matches('"')
        .to_string()
}
