#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` map layer generation.
//!
//! Writes three layers into an output directory:
//!
//! * `access_points.geojson`: one point per AP, colored by condition rank
//!   and filtered by a [`SelectionPolicy`]. Without a classification every
//!   AP is written with a neutral color.
//! * `district_markers.geojson`: one point per district with its AP count
//!   and count-band color.
//! * `district_choropleth.geojson`: the district boundary polygons with a
//!   `value` and `fillColor` attached. Only written when boundaries are
//!   supplied.

pub mod layers;

use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use geojson::{FeatureCollection, GeoJson};
use serde::Serialize;
use thiserror::Error;
use wifi_map_classify::{ClassifiedDataset, SelectionPolicy};
use wifi_map_dataset::DatasetSnapshot;
use wifi_map_district::{DistrictError, PointFilter};
use wifi_map_district_models::ChoroplethMetric;

/// File name of the AP point layer.
pub const ACCESS_POINTS_FILE: &str = "access_points.geojson";

/// File name of the district marker layer.
pub const DISTRICT_MARKERS_FILE: &str = "district_markers.geojson";

/// File name of the district choropleth layer.
pub const DISTRICT_CHOROPLETH_FILE: &str = "district_choropleth.geojson";

/// Errors that can occur while generating layers.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Malformed `GeoJSON` input.
    #[error(transparent)]
    GeoJson(#[from] geojson::Error),

    /// District statistics failed.
    #[error(transparent)]
    District(#[from] DistrictError),

    /// Boundary file parsed, but is not a `FeatureCollection`.
    #[error("Boundary file {path} is not a FeatureCollection")]
    NotFeatureCollection {
        /// Offending file.
        path: String,
    },
}

/// What to export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Which APs go into the point layer.
    pub policy: SelectionPolicy,
    /// Install type and low-usage narrowing of the point layer.
    pub filter: PointFilter,
    /// Statistic for the choropleth.
    pub metric: ChoroplethMetric,
    /// Color feature metrics on a `log1p` scale.
    pub log_scale: bool,
    /// District boundary `FeatureCollection`. No choropleth without it.
    pub boundaries: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            filter: PointFilter::default(),
            metric: ChoroplethMetric::Rank,
            log_scale: false,
            boundaries: None,
        }
    }
}

/// Outcome of an export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    /// Files written.
    pub files: Vec<PathBuf>,
    /// Features in the AP layer.
    pub access_points: usize,
    /// Districts summarized.
    pub districts: usize,
    /// Whether rank fields were included.
    pub classified: bool,
}

/// Reads a district boundary `FeatureCollection`.
///
/// # Errors
///
/// * If the file cannot be read or is not valid `GeoJSON`
/// * [`GenerateError::NotFeatureCollection`] for any other `GeoJSON` object
pub fn read_boundaries(path: &Path) -> Result<FeatureCollection, GenerateError> {
    let file = std::fs::File::open(path)?;
    let geojson = GeoJson::from_reader(BufReader::new(file))?;
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            log::info!("Loaded {} boundaries from {}", fc.features.len(), path.display());
            Ok(fc)
        }
        _ => Err(GenerateError::NotFeatureCollection {
            path: path.display().to_string(),
        }),
    }
}

/// Writes a feature collection to `path`.
///
/// # Errors
///
/// * If the file cannot be created or written
pub fn write_collection(path: &Path, fc: &FeatureCollection) -> Result<(), GenerateError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, fc)?;
    writer.flush()?;
    log::info!("Wrote {} features to {}", fc.features.len(), path.display());
    Ok(())
}

/// Generates every layer into `dir`, creating it if needed.
///
/// `classified` must come from `snapshot`. Pass `None` to export the
/// unclassified view.
///
/// # Errors
///
/// * If the output directory or any file cannot be written
/// * If the boundary file cannot be read
/// * [`GenerateError::District`] if `classified` belongs to another snapshot
///   or the point filter does not apply to it
pub fn export_all(
    dir: &Path,
    snapshot: &DatasetSnapshot,
    classified: Option<&ClassifiedDataset>,
    options: &ExportOptions,
) -> Result<ExportSummary, GenerateError> {
    std::fs::create_dir_all(dir)?;

    let summaries = wifi_map_district::summarize(snapshot, classified)?;
    let filter = options.filter.resolve(snapshot)?;
    let mut files = Vec::new();

    let points = classified.map_or_else(
        || layers::unclassified_points(snapshot.access_points(), &filter),
        |c| layers::classified_points(c, options.policy, &filter),
    );
    let path = dir.join(ACCESS_POINTS_FILE);
    write_collection(&path, &points)?;
    files.push(path);

    let markers = wifi_map_district::markers(&summaries);
    let path = dir.join(DISTRICT_MARKERS_FILE);
    write_collection(&path, &layers::district_markers(&markers))?;
    files.push(path);

    if let Some(boundaries_path) = &options.boundaries {
        let boundaries = read_boundaries(boundaries_path)?;
        let values = wifi_map_district::choropleth(&summaries, options.metric, options.log_scale);
        let choropleth = layers::district_choropleth(boundaries, &values, options.metric);
        let path = dir.join(DISTRICT_CHOROPLETH_FILE);
        write_collection(&path, &choropleth)?;
        files.push(path);
    } else {
        log::debug!("No boundaries given, skipping choropleth");
    }

    Ok(ExportSummary {
        files,
        access_points: points.features.len(),
        districts: summaries.len(),
        classified: classified.is_some(),
    })
}
