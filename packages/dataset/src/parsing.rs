//! Row-level parsing helpers for AP inventory files.
//!
//! The inventory CSVs come out of a pandas pipeline, so integer columns are
//! frequently written as floats (`"2015.0"`) and identifiers inherit the
//! same suffix. These helpers undo that before records reach the snapshot.

/// Normalizes an AP identifier: trims whitespace and strips a trailing
/// `.0` left behind by float export. Returns `None` if nothing remains.
#[must_use]
pub fn normalize_ap_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let id = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Trims a free-text field, mapping blank values to `None`.
#[must_use]
pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Converts a float-encoded whole number to `i32`.
///
/// Returns `None` for non-finite, fractional, or out-of-range values.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn whole_i32(value: Option<f64>) -> Option<i32> {
    let v = value?;
    if !v.is_finite() || v.fract() != 0.0 || v < f64::from(i32::MIN) || v > f64::from(i32::MAX) {
        return None;
    }
    Some(v as i32)
}

/// Converts a float-encoded install type code to `u8`.
#[must_use]
pub fn whole_u8(value: Option<f64>) -> Option<u8> {
    whole_i32(value).and_then(|v| u8::try_from(v).ok())
}

/// Validates a coordinate pair. Returns `None` if either value is missing,
/// non-finite, zero, or outside the valid WGS84 range.
#[must_use]
pub fn parse_lat_lon(lat: Option<f64>, lon: Option<f64>) -> Option<(f64, f64)> {
    let lat = lat?;
    let lon = lon?;
    if !lat.is_finite() || !lon.is_finite() || lat == 0.0 || lon == 0.0 {
        return None;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some((lat, lon))
}
