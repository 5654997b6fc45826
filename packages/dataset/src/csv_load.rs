//! CSV inventory reader.
//!
//! Deserializes each row into a loosely typed [`CsvRow`] (every column
//! optional, unparseable cells read as missing), then validates it into an
//! [`AccessPoint`]. Rows that violate the classification preconditions are
//! skipped and recorded in the [`LoadReport`] rather than failing the load.

use std::collections::BTreeSet;
use std::io::Read;

use serde::Deserialize;
use wifi_map_access_point_models::{AccessPoint, FeatureScores};

use crate::DatasetError;
use crate::parsing::{non_empty, normalize_ap_id, parse_lat_lon, whole_i32, whole_u8};

/// One raw CSV row. Column names follow the exported inventory files.
/// Feature columns come as `_score` or `_norm`, and merged exports may
/// carry both.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    ap_id: Option<String>,
    #[serde(default)]
    gu: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    lon: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    install_year: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    install_type_code: Option<f64>,
    #[serde(default, alias = "설치유형")]
    install_type: Option<String>,
    #[serde(default)]
    indoor_outdoor: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    usage_gb: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    age_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    usage_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    density_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    age_norm: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    usage_norm: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    density_norm: Option<f64>,
}

impl CsvRow {
    /// Feature triple, taking each `_score` column over its `_norm` twin
    /// when a file carries both.
    fn features(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        (
            self.age_score.or(self.age_norm),
            self.usage_score.or(self.usage_norm),
            self.density_score.or(self.density_norm),
        )
    }
}

/// Why a row was left out of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Blank `ap_id`.
    MissingId,
    /// Blank `gu`.
    MissingDistrict,
    /// Missing or invalid `lat`/`lon`.
    InvalidCoordinates,
    /// One of the three feature columns is missing or non-finite.
    MissingFeatures,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "missing ap_id"),
            Self::MissingDistrict => write!(f, "missing gu"),
            Self::InvalidCoordinates => write!(f, "missing or invalid coordinates"),
            Self::MissingFeatures => write!(f, "missing feature scores"),
        }
    }
}

/// A row that was skipped during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based data row number (header excluded).
    pub row: u64,
    /// Identifier, if the row had one.
    pub ap_id: Option<String>,
    /// Why the row was skipped.
    pub reason: SkipReason,
}

/// Summary of a CSV load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Data rows read (header excluded).
    pub total_rows: u64,
    /// Rows skipped for precondition violations.
    pub skipped: Vec<SkippedRow>,
}

impl LoadReport {
    /// Number of rows that made it into the snapshot.
    #[must_use]
    pub fn loaded(&self) -> u64 {
        self.total_rows - self.skipped.len() as u64
    }
}

/// Reads and validates every row of an inventory CSV.
///
/// # Errors
///
/// Returns [`DatasetError::Csv`] if the file is not well-formed CSV and
/// [`DatasetError::DuplicateId`] if two valid rows share an `ap_id`.
pub fn read_access_points<R: Read>(
    reader: R,
) -> Result<(Vec<AccessPoint>, LoadReport), DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut report = LoadReport::default();
    let mut seen = BTreeSet::new();

    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row_number = idx as u64 + 1;
        report.total_rows += 1;
        let row = result?;

        match validate_row(row) {
            Ok(ap) => {
                if !seen.insert(ap.ap_id.clone()) {
                    return Err(DatasetError::DuplicateId { ap_id: ap.ap_id });
                }
                records.push(ap);
            }
            Err((ap_id, reason)) => {
                log::warn!(
                    "Skipping row {row_number} ({}): {reason}",
                    ap_id.as_deref().unwrap_or("no id")
                );
                report.skipped.push(SkippedRow {
                    row: row_number,
                    ap_id,
                    reason,
                });
            }
        }
    }

    log::info!(
        "Read {} AP rows ({} skipped)",
        report.total_rows,
        report.skipped.len()
    );

    Ok((records, report))
}

fn validate_row(row: CsvRow) -> Result<AccessPoint, (Option<String>, SkipReason)> {
    let features = row.features();
    let ap_id = row.ap_id.as_deref().and_then(normalize_ap_id);
    let Some(id) = ap_id.clone() else {
        return Err((None, SkipReason::MissingId));
    };
    let Some(gu) = non_empty(row.gu) else {
        return Err((ap_id, SkipReason::MissingDistrict));
    };
    let Some((lat, lon)) = parse_lat_lon(row.lat, row.lon) else {
        return Err((ap_id, SkipReason::InvalidCoordinates));
    };
    let (Some(age), Some(usage), Some(density)) = features else {
        return Err((ap_id, SkipReason::MissingFeatures));
    };
    let features = FeatureScores::new(age, usage, density);
    if !features.is_finite() {
        return Err((ap_id, SkipReason::MissingFeatures));
    }

    Ok(AccessPoint {
        ap_id: id,
        gu,
        lat,
        lon,
        install_year: whole_i32(row.install_year),
        install_type_code: whole_u8(row.install_type_code),
        install_type: non_empty(row.install_type),
        indoor_outdoor: non_empty(row.indoor_outdoor),
        address: non_empty(row.address),
        usage_gb: row.usage_gb.filter(|v| v.is_finite()),
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ap_id,gu,lat,lon,install_year,install_type_code,install_type,indoor_outdoor,address,usage_gb,age_score,usage_score,density_score\n";

    #[test]
    fn reads_complete_rows() {
        let csv = format!(
            "{HEADER}101.0,강남구,37.4979,127.0276,2015.0,1,주요거리,실외,강남대로 396,120.5,0.8,0.3,0.6\n"
        );
        let (records, report) = read_access_points(csv.as_bytes()).unwrap();
        assert_eq!(report.total_rows, 1);
        assert_eq!(report.loaded(), 1);

        let ap = &records[0];
        assert_eq!(ap.ap_id, "101");
        assert_eq!(ap.gu, "강남구");
        assert_eq!(ap.install_year, Some(2015));
        assert_eq!(ap.install_type_code, Some(1));
        assert_eq!(ap.install_type.as_deref(), Some("주요거리"));
        assert_eq!(ap.address.as_deref(), Some("강남대로 396"));
        assert!((ap.features.age - 0.8).abs() < f64::EPSILON);
        assert!((ap.features.density - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_norm_column_names() {
        let csv = "ap_id,gu,lat,lon,age_norm,usage_norm,density_norm,설치유형\n\
                   7,마포구,37.56,126.90,0.1,0.2,0.3,전통시장\n";
        let (records, _) = read_access_points(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert!((records[0].features.usage - 0.2).abs() < f64::EPSILON);
        assert_eq!(records[0].install_type.as_deref(), Some("전통시장"));
        assert_eq!(records[0].install_year, None);
    }

    #[test]
    fn accepts_both_column_namings_in_one_file() {
        let csv = "ap_id,gu,lat,lon,age_score,usage_score,density_score,age_norm,usage_norm,density_norm\n\
                   1,중구,37.56,126.99,0.1,0.2,0.3,0.9,0.9,0.9\n\
                   2,중구,37.56,126.99,,,,0.4,0.5,0.6\n\
                   3,중구,37.56,126.99,0.7,,0.8,,0.25,\n\
                   4,중구,37.56,126.99,0.1,0.2,,,,\n";
        let (records, report) = read_access_points(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].ap_id.as_deref(), Some("4"));
        assert_eq!(report.skipped[0].reason, SkipReason::MissingFeatures);

        assert!((records[0].features.age - 0.1).abs() < f64::EPSILON);
        assert!((records[0].features.density - 0.3).abs() < f64::EPSILON);
        assert!((records[1].features.usage - 0.5).abs() < f64::EPSILON);
        assert!((records[2].features.age - 0.7).abs() < f64::EPSILON);
        assert!((records[2].features.usage - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn skips_rows_with_missing_features() {
        let csv = format!(
            "{HEADER}1,중구,37.56,126.99,,,,,,,0.1,0.2,0.3\n\
             2,중구,37.56,126.99,,,,,,,0.1,,0.3\n\
             3,중구,37.56,126.99,,,,,,,0.1,abc,0.3\n"
        );
        let (records, report) = read_access_points(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].row, 2);
        assert_eq!(report.skipped[0].ap_id.as_deref(), Some("2"));
        assert_eq!(report.skipped[0].reason, SkipReason::MissingFeatures);
        assert_eq!(report.skipped[1].reason, SkipReason::MissingFeatures);
    }

    #[test]
    fn skips_rows_without_location_or_district() {
        let csv = format!(
            "{HEADER},중구,37.56,126.99,,,,,,,0.1,0.2,0.3\n\
             5,,37.56,126.99,,,,,,,0.1,0.2,0.3\n\
             6,중구,,126.99,,,,,,,0.1,0.2,0.3\n"
        );
        let (records, report) = read_access_points(csv.as_bytes()).unwrap();
        assert!(records.is_empty());
        let reasons: Vec<SkipReason> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::MissingId,
                SkipReason::MissingDistrict,
                SkipReason::InvalidCoordinates
            ]
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let csv = format!(
            "{HEADER}9,중구,37.56,126.99,,,,,,,0.1,0.2,0.3\n\
             9.0,종로구,37.57,126.98,,,,,,,0.4,0.5,0.6\n"
        );
        let err = read_access_points(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateId { ref ap_id } if ap_id == "9"));
    }
}
