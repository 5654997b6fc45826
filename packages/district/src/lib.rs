#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District (`gu`) rollups for AP maps.
//!
//! Everything here is derived on demand from a [`DatasetSnapshot`] and,
//! when available, the matching [`ClassifiedDataset`]. Rank aggregation
//! goes through [`wifi_map_classify::aggregate_ranks`] so district colors
//! always agree with the per-AP ranks.

pub mod color;
pub mod filter;
pub mod stats;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wifi_map_access_point_models::{AccessPoint, ConditionRank, FeatureScores};
use wifi_map_classify::{ClassifiedDataset, aggregate_ranks};
use wifi_map_dataset::{DatasetSnapshot, mean_position};
use wifi_map_district_models::{
    ChoroplethMetric, ChoroplethValue, DistrictMarker, DistrictRank, DistrictSummary,
};

use crate::color::{CountBandScale, LinearColormap, NO_DATA};

pub use filter::{PointFilter, ResolvedFilter};

/// Errors from district statistics.
#[derive(Debug, Error)]
pub enum DistrictError {
    /// Quantile outside `[0, 1]`.
    #[error("Quantile must be within [0, 1], got {0}")]
    InvalidQuantile(f64),

    /// No APs to compute over.
    #[error("No access points to summarize")]
    Empty,

    /// The classification was computed from a different snapshot.
    #[error("Classification version {classified} does not match dataset version {dataset}")]
    VersionMismatch {
        /// Version of the snapshot.
        dataset: String,
        /// Version the classification was derived from.
        classified: String,
    },

    /// No AP in the dataset has the requested install type.
    #[error("Unknown install type '{label}', expected one of: {}", .known.join(", "))]
    UnknownInstallType {
        /// Requested label.
        label: String,
        /// Labels present in the dataset.
        known: Vec<String>,
    },
}

/// District statistics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistrictConfig {
    /// Bottom usage quantile counted as "low usage".
    pub low_usage_quantile: f64,
    /// How many districts the install ranking lists.
    pub top_n: usize,
}

impl Default for DistrictConfig {
    fn default() -> Self {
        Self {
            low_usage_quantile: 0.2,
            top_n: 10,
        }
    }
}

fn group_by_district(aps: &[AccessPoint]) -> BTreeMap<&str, Vec<&AccessPoint>> {
    let mut groups: BTreeMap<&str, Vec<&AccessPoint>> = BTreeMap::new();
    for ap in aps {
        groups.entry(ap.gu.as_str()).or_default().push(ap);
    }
    groups
}

#[allow(clippy::cast_precision_loss)]
fn mean_features(aps: &[&AccessPoint]) -> FeatureScores {
    let n = aps.len().max(1) as f64;
    let [age, usage, density] = aps.iter().fold([0.0; 3], |mut acc, ap| {
        for (sum, v) in acc.iter_mut().zip(ap.features.as_array()) {
            *sum += v;
        }
        acc
    });
    FeatureScores::new(age / n, usage / n, density / n)
}

/// Summarizes every district, sorted by name.
///
/// When `classified` is given, each summary carries the district's
/// aggregate rank.
///
/// # Errors
///
/// * [`DistrictError::VersionMismatch`] if `classified` came from another snapshot
pub fn summarize(
    snapshot: &DatasetSnapshot,
    classified: Option<&ClassifiedDataset>,
) -> Result<Vec<DistrictSummary>, DistrictError> {
    if let Some(classified) = classified.filter(|c| c.version() != snapshot.version()) {
        return Err(DistrictError::VersionMismatch {
            dataset: snapshot.version().to_string(),
            classified: classified.version().to_string(),
        });
    }

    let mut ranks_by_gu: BTreeMap<&str, Vec<ConditionRank>> = BTreeMap::new();
    if let Some(classified) = classified {
        for record in classified.records() {
            ranks_by_gu
                .entry(record.access_point.gu.as_str())
                .or_default()
                .push(record.rank);
        }
    }

    let summaries: Vec<DistrictSummary> = group_by_district(snapshot.access_points())
        .into_iter()
        .filter_map(|(gu, members)| {
            let (lat, lon) = mean_position(members.iter().copied())?;
            let rank = ranks_by_gu
                .remove(gu)
                .and_then(aggregate_ranks)
                .map(|agg| DistrictRank {
                    counts: agg.counts,
                    mean_rank: agg.mean,
                    rank: agg.rounded,
                    modal_rank: agg.modal,
                });
            Some(DistrictSummary {
                gu: gu.to_string(),
                ap_count: members.len(),
                mean_features: mean_features(&members),
                lat,
                lon,
                rank,
            })
        })
        .collect();

    log::debug!("Summarized {} districts", summaries.len());

    Ok(summaries)
}

/// Count markers at each district's mean AP position, colored by count
/// band.
#[must_use]
pub fn markers(summaries: &[DistrictSummary]) -> Vec<DistrictMarker> {
    let counts: Vec<usize> = summaries.iter().map(|s| s.ap_count).collect();
    let Some(scale) = CountBandScale::from_counts(&counts) else {
        return Vec::new();
    };

    summaries
        .iter()
        .map(|s| DistrictMarker {
            gu: s.gu.clone(),
            lat: s.lat,
            lon: s.lon,
            count: s.ap_count,
            color: scale.color(s.ap_count),
        })
        .collect()
}

/// Per-district choropleth values for `metric`.
///
/// Feature metrics use the district mean, optionally `log1p`-scaled before
/// coloring (the reported value stays raw). The rank metric uses the mean
/// rank and colors by the rounded rank. Districts without a value get
/// [`NO_DATA`].
#[must_use]
pub fn choropleth(
    summaries: &[DistrictSummary],
    metric: ChoroplethMetric,
    log_scale: bool,
) -> Vec<ChoroplethValue> {
    match metric {
        ChoroplethMetric::Rank => summaries
            .iter()
            .map(|s| match &s.rank {
                Some(rank) => ChoroplethValue {
                    gu: s.gu.clone(),
                    value: rank.mean_rank,
                    color: rank.rank.color().to_string(),
                },
                None => ChoroplethValue {
                    gu: s.gu.clone(),
                    value: f64::NAN,
                    color: NO_DATA.to_string(),
                },
            })
            .collect(),
        ChoroplethMetric::Feature(feature) => {
            let scaled = |v: f64| if log_scale { v.ln_1p() } else { v };
            let values: Vec<f64> = summaries
                .iter()
                .map(|s| feature.of(&s.mean_features))
                .collect();
            let cmap = LinearColormap::fit(&values.iter().map(|&v| scaled(v)).collect::<Vec<_>>());

            summaries
                .iter()
                .zip(values)
                .map(|(s, value)| ChoroplethValue {
                    gu: s.gu.clone(),
                    value,
                    color: cmap
                        .as_ref()
                        .map_or_else(|| NO_DATA.to_string(), |c| c.color(scaled(value))),
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_map_access_point_models::Feature;
    use wifi_map_classify::ClassifyConfig;

    fn ap(id: &str, gu: &str, lat: f64, v: f64) -> AccessPoint {
        AccessPoint {
            ap_id: id.to_string(),
            gu: gu.to_string(),
            lat,
            lon: 127.0,
            install_year: None,
            install_type_code: None,
            install_type: None,
            indoor_outdoor: None,
            address: None,
            usage_gb: None,
            features: FeatureScores::new(v, v, v),
        }
    }

    fn snapshot() -> DatasetSnapshot {
        DatasetSnapshot::from_records(
            "test",
            vec![
                ap("1", "강남구", 37.50, 0.10),
                ap("2", "강남구", 37.52, 0.12),
                ap("3", "강남구", 37.54, 0.11),
                ap("4", "중구", 37.56, 0.50),
                ap("5", "중구", 37.56, 0.52),
                ap("6", "중구", 37.56, 0.51),
                ap("7", "마포구", 37.55, 0.90),
                ap("8", "마포구", 37.55, 0.92),
                ap("9", "마포구", 37.55, 0.91),
            ],
        )
        .unwrap()
    }

    #[test]
    fn summaries_without_classification_have_no_rank() {
        let summaries = summarize(&snapshot(), None).unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.gu.as_str()).collect();
        assert_eq!(names, vec!["강남구", "마포구", "중구"]);

        let gangnam = &summaries[0];
        assert_eq!(gangnam.ap_count, 3);
        assert!((gangnam.lat - 37.52).abs() < 1e-9);
        assert!((gangnam.mean_features.age - 0.11).abs() < 1e-9);
        assert!(gangnam.rank.is_none());
    }

    #[test]
    fn summaries_carry_aggregate_rank() {
        let snapshot = snapshot();
        let classified = ClassifiedDataset::classify(&snapshot, &ClassifyConfig::default()).unwrap();
        let summaries = summarize(&snapshot, Some(&classified)).unwrap();

        let rank_of = |gu: &str| {
            summaries
                .iter()
                .find(|s| s.gu == gu)
                .and_then(|s| s.rank.as_ref())
                .map(|r| r.rank)
        };
        assert_eq!(rank_of("강남구"), Some(ConditionRank::Good));
        assert_eq!(rank_of("중구"), Some(ConditionRank::Fair));
        assert_eq!(rank_of("마포구"), Some(ConditionRank::NeedsImprovement));
    }

    #[test]
    fn mismatched_classification_is_rejected() {
        let snapshot = snapshot();
        let other = DatasetSnapshot::from_records(
            "other",
            vec![
                ap("1", "중구", 37.5, 0.1),
                ap("2", "중구", 37.5, 0.5),
                ap("3", "중구", 37.5, 0.9),
            ],
        )
        .unwrap();
        let classified = ClassifiedDataset::classify(&other, &ClassifyConfig::default()).unwrap();
        assert!(matches!(
            summarize(&snapshot, Some(&classified)),
            Err(DistrictError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn markers_follow_summaries() {
        let summaries = summarize(&snapshot(), None).unwrap();
        let out = markers(&summaries);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|m| m.count == 3 && m.color.starts_with('#')));
        assert!(markers(&[]).is_empty());
    }

    #[test]
    fn feature_choropleth_spans_the_ramp() {
        let summaries = summarize(&snapshot(), None).unwrap();
        let values = choropleth(&summaries, ChoroplethMetric::Feature(Feature::Age), false);
        let color_of = |gu: &str| values.iter().find(|v| v.gu == gu).unwrap().color.clone();

        assert_eq!(color_of("강남구"), "#ffffd9");
        assert_eq!(color_of("마포구"), "#081d58");

        let logged = choropleth(&summaries, ChoroplethMetric::Feature(Feature::Age), true);
        let raw = logged.iter().find(|v| v.gu == "중구").unwrap();
        assert!((raw.value - 0.51).abs() < 1e-9);
    }

    #[test]
    fn rank_choropleth_uses_rank_colors() {
        let snapshot = snapshot();
        let unclassified = summarize(&snapshot, None).unwrap();
        let values = choropleth(&unclassified, ChoroplethMetric::Rank, false);
        assert!(values.iter().all(|v| v.color == NO_DATA && v.value.is_nan()));

        let classified = ClassifiedDataset::classify(&snapshot, &ClassifyConfig::default()).unwrap();
        let summaries = summarize(&snapshot, Some(&classified)).unwrap();
        let values = choropleth(&summaries, ChoroplethMetric::Rank, false);
        let mapo = values.iter().find(|v| v.gu == "마포구").unwrap();
        assert_eq!(mapo.color, ConditionRank::NeedsImprovement.color());
        assert!((mapo.value - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_config_values() {
        let config = DistrictConfig::default();
        assert!((config.low_usage_quantile - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.top_n, 10);
    }
}
