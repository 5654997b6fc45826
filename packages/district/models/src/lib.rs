#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District (`gu`) rollup types.
//!
//! These are the per-district tables handed to choropleth and marker
//! renderers. They are computed on demand from a snapshot and never
//! persisted.

use serde::{Deserialize, Serialize};
use wifi_map_access_point_models::{ConditionRank, Feature, FeatureScores};

/// Representative condition of a district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictRank {
    /// Number of member APs per rank, indexed by rank value.
    pub counts: [usize; 3],
    /// Mean rank value of the members.
    pub mean_rank: f64,
    /// Mean rank rounded half-up. Used for district choropleths.
    pub rank: ConditionRank,
    /// Most common member rank.
    pub modal_rank: ConditionRank,
}

/// Rollup of every AP in one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictSummary {
    /// District name.
    pub gu: String,
    /// Number of APs in the district.
    pub ap_count: usize,
    /// Mean of each feature across the district's APs.
    pub mean_features: FeatureScores,
    /// Mean latitude of the district's APs.
    pub lat: f64,
    /// Mean longitude of the district's APs.
    pub lon: f64,
    /// Aggregate condition, absent when the dataset is unclassified.
    pub rank: Option<DistrictRank>,
}

/// A district paired with a count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictCount {
    /// District name.
    pub gu: String,
    /// Number of matching APs.
    pub count: usize,
}

/// Count marker drawn at a district's mean AP position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictMarker {
    /// District name.
    pub gu: String,
    /// Marker latitude.
    pub lat: f64,
    /// Marker longitude.
    pub lon: f64,
    /// Number of APs in the district.
    pub count: usize,
    /// Fill color from the count band scale.
    pub color: String,
}

/// APs in the bottom usage quantile, grouped by district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowUsageReport {
    /// Quantile used as the cut-off (e.g. `0.2`).
    pub quantile: f64,
    /// Usage score at that quantile; APs at or below it are included.
    pub threshold: f64,
    /// Total number of low-usage APs.
    pub total: usize,
    /// Per-district counts, largest first.
    pub by_district: Vec<DistrictCount>,
}

/// Statistic shown on a district choropleth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoroplethMetric {
    /// Mean of one feature.
    Feature(Feature),
    /// Aggregate condition rank.
    Rank,
}

impl ChoroplethMetric {
    /// Legend caption.
    #[must_use]
    pub const fn caption(self) -> &'static str {
        match self {
            Self::Feature(feature) => feature.caption(),
            Self::Rank => "종합 상태",
        }
    }
}

impl std::fmt::Display for ChoroplethMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feature(feature) => write!(f, "{feature}"),
            Self::Rank => write!(f, "rank"),
        }
    }
}

impl std::str::FromStr for ChoroplethMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "rank" {
            return Ok(Self::Rank);
        }
        s.parse::<Feature>()
            .map(Self::Feature)
            .map_err(|_| format!("unknown metric '{s}': expected age, usage, density, or rank"))
    }
}

/// One district's value on a choropleth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoroplethValue {
    /// District name.
    pub gu: String,
    /// Raw statistic.
    pub value: f64,
    /// Fill color.
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metric_names() {
        assert_eq!(
            "usage".parse::<ChoroplethMetric>().unwrap(),
            ChoroplethMetric::Feature(Feature::Usage)
        );
        assert_eq!(
            "rank".parse::<ChoroplethMetric>().unwrap(),
            ChoroplethMetric::Rank
        );
        assert!("speed".parse::<ChoroplethMetric>().is_err());
    }

    #[test]
    fn metric_display_matches_parse() {
        for metric in [
            ChoroplethMetric::Feature(Feature::Age),
            ChoroplethMetric::Feature(Feature::Density),
            ChoroplethMetric::Rank,
        ] {
            assert_eq!(metric.to_string().parse::<ChoroplethMetric>().unwrap(), metric);
        }
    }
}
