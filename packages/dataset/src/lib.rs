#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Immutable AP inventory snapshots.
//!
//! A [`DatasetSnapshot`] is the batch of [`AccessPoint`] records loaded from
//! one inventory file, tagged with a [`DatasetVersion`] fingerprint of the
//! bytes it came from. Snapshots are never mutated after load: every
//! derived view (classification, district rollups, speed rankings) takes
//! the snapshot by reference, and callers decide when a new version
//! warrants recomputation.

pub mod csv_load;
pub mod parsing;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use wifi_map_access_point_models::AccessPoint;

pub use csv_load::{LoadReport, SkipReason, SkippedRow};

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Reading the source file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed while fingerprinting records.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two rows share the same identifier.
    #[error("Duplicate ap_id '{ap_id}'")]
    DuplicateId {
        /// The repeated identifier.
        ap_id: String,
    },
}

/// Content fingerprint identifying one version of a dataset.
///
/// Two snapshots with equal versions hold identical records, so anything
/// derived from one is valid for the other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetVersion(String);

impl DatasetVersion {
    /// Fingerprints raw source bytes (hex SHA-256).
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Returns the full hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first 12 hex characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl std::fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable, versioned batch of access points.
///
/// Cloning is cheap: records live behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    version: DatasetVersion,
    source: String,
    access_points: Arc<[AccessPoint]>,
    report: LoadReport,
}

impl DatasetSnapshot {
    /// Loads a snapshot from an inventory CSV on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or contains
    /// duplicate identifiers.
    pub fn load_csv(path: &Path) -> Result<Self, DatasetError> {
        log::info!("Loading AP inventory from {}", path.display());
        let bytes = std::fs::read(path)?;
        Self::from_csv_bytes(&path.display().to_string(), &bytes)
    }

    /// Builds a snapshot from in-memory CSV bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid CSV or contain duplicate
    /// identifiers.
    pub fn from_csv_bytes(source: &str, bytes: &[u8]) -> Result<Self, DatasetError> {
        let version = DatasetVersion::of_bytes(bytes);
        let (records, report) = csv_load::read_access_points(bytes)?;
        log::info!(
            "Snapshot {} from {source}: {} APs",
            version.short(),
            records.len()
        );
        Ok(Self {
            version,
            source: source.to_string(),
            access_points: records.into(),
            report,
        })
    }

    /// Builds a snapshot from already-validated records. The version is a
    /// fingerprint of the records' JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::DuplicateId`] if two records share an
    /// identifier.
    pub fn from_records(source: &str, records: Vec<AccessPoint>) -> Result<Self, DatasetError> {
        let mut seen = BTreeSet::new();
        for ap in &records {
            if !seen.insert(ap.ap_id.as_str()) {
                return Err(DatasetError::DuplicateId {
                    ap_id: ap.ap_id.clone(),
                });
            }
        }
        let version = DatasetVersion::of_bytes(&serde_json::to_vec(&records)?);
        let report = LoadReport {
            total_rows: records.len() as u64,
            skipped: Vec::new(),
        };
        Ok(Self {
            version,
            source: source.to_string(),
            access_points: records.into(),
            report,
        })
    }

    /// Version fingerprint of this snapshot.
    #[must_use]
    pub const fn version(&self) -> &DatasetVersion {
        &self.version
    }

    /// Where the snapshot was loaded from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Load summary, including skipped rows.
    #[must_use]
    pub const fn report(&self) -> &LoadReport {
        &self.report
    }

    /// All access points, in file order.
    #[must_use]
    pub fn access_points(&self) -> &[AccessPoint] {
        &self.access_points
    }

    /// Number of access points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.access_points.len()
    }

    /// Whether the snapshot holds no access points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_points.is_empty()
    }

    /// Sorted, de-duplicated district names.
    #[must_use]
    pub fn districts(&self) -> Vec<&str> {
        self.access_points
            .iter()
            .map(|ap| ap.gu.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted, de-duplicated install type labels.
    #[must_use]
    pub fn install_types(&self) -> Vec<String> {
        self.access_points
            .iter()
            .filter_map(AccessPoint::install_type_label)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Access points in one district.
    #[must_use]
    pub fn in_district(&self, gu: &str) -> Vec<&AccessPoint> {
        self.access_points.iter().filter(|ap| ap.gu == gu).collect()
    }

    /// Finds one AP by identifier within a district. The identifier is
    /// normalized the same way the loader normalizes it.
    #[must_use]
    pub fn find(&self, gu: &str, ap_id: &str) -> Option<&AccessPoint> {
        let ap_id = parsing::normalize_ap_id(ap_id)?;
        self.access_points
            .iter()
            .find(|ap| ap.gu == gu && ap.ap_id == ap_id)
    }
}

/// Mean `(lat, lon)` of a set of access points, or `None` if empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_position<'a>(aps: impl Iterator<Item = &'a AccessPoint>) -> Option<(f64, f64)> {
    let (count, lat, lon) = aps.fold((0usize, 0.0, 0.0), |(n, lat, lon), ap| {
        (n + 1, lat + ap.lat, lon + ap.lon)
    });
    if count == 0 {
        None
    } else {
        Some((lat / count as f64, lon / count as f64))
    }
}
