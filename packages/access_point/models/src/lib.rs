#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Access point record types and the condition rank taxonomy.
//!
//! An [`AccessPoint`] is one physical public Wi-Fi hotspot together with
//! its pre-normalized [`FeatureScores`]. The [`ConditionRank`] scale is the
//! fixed three-value domain that every map layer, legend, and table keys
//! off of once the classification pipeline has run.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Normalized per-AP features, each broadly within `[0, 1]`.
///
/// Higher values always mean "worse": older hardware, heavier usage, or a
/// more crowded neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureScores {
    /// Installation age score.
    pub age: f64,
    /// Cumulative usage score.
    pub usage: f64,
    /// Local AP density score.
    pub density: f64,
}

impl FeatureScores {
    /// Creates a feature triple.
    #[must_use]
    pub const fn new(age: f64, usage: f64, density: f64) -> Self {
        Self {
            age,
            usage,
            density,
        }
    }

    /// Returns the features as `[age, usage, density]`.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.age, self.usage, self.density]
    }

    /// Whether every feature is a finite number.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.age.is_finite() && self.usage.is_finite() && self.density.is_finite()
    }
}

/// Which feature column a statistic or choropleth refers to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Feature {
    /// Installation age score.
    Age,
    /// Usage score.
    Usage,
    /// Density score.
    Density,
}

impl Feature {
    /// Reads this feature out of a score triple.
    #[must_use]
    pub const fn of(self, scores: &FeatureScores) -> f64 {
        match self {
            Self::Age => scores.age,
            Self::Usage => scores.usage,
            Self::Density => scores.density,
        }
    }

    /// Human-readable caption used for legends.
    #[must_use]
    pub const fn caption(self) -> &'static str {
        match self {
            Self::Age => "설치연도 노후도",
            Self::Usage => "AP 이용량",
            Self::Density => "와이파이 밀집도",
        }
    }
}

/// One public Wi-Fi access point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPoint {
    /// Stable identifier, unique within a dataset.
    pub ap_id: String,
    /// Administrative district (`gu`) the AP falls in.
    pub gu: String,
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
    /// Year the AP was installed.
    pub install_year: Option<i32>,
    /// Numeric install type code (see [`InstallType`]).
    pub install_type_code: Option<u8>,
    /// Install type label as it appears in the source data.
    pub install_type: Option<String>,
    /// Indoor/outdoor flag as it appears in the source data.
    pub indoor_outdoor: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Cumulative usage volume in GB.
    pub usage_gb: Option<f64>,
    /// Normalized features.
    pub features: FeatureScores,
}

impl AccessPoint {
    /// Returns the install type label, preferring the source label and
    /// falling back to the code mapping.
    #[must_use]
    pub fn install_type_label(&self) -> Option<String> {
        self.install_type
            .clone()
            .or_else(|| self.install_type_code.map(InstallType::label_for_code))
    }
}

/// Semantic maintenance condition of an AP, from best to worst.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(into = "u8", try_from = "u8")]
#[strum(serialize_all = "kebab-case")]
pub enum ConditionRank {
    /// Rank 0: lowest-risk group.
    Good = 0,
    /// Rank 1: needs routine maintenance.
    Fair = 1,
    /// Rank 2: replacement recommended.
    NeedsImprovement = 2,
}

impl ConditionRank {
    /// Every rank in ascending order. This is the complete domain.
    pub const ALL: [Self; 3] = [Self::Good, Self::Fair, Self::NeedsImprovement];

    /// Returns the numeric value of this rank.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a rank from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not 0, 1, or 2.
    pub const fn from_value(value: u8) -> Result<Self, InvalidRankError> {
        match value {
            0 => Ok(Self::Good),
            1 => Ok(Self::Fair),
            2 => Ok(Self::NeedsImprovement),
            _ => Err(InvalidRankError { value }),
        }
    }

    /// English legend label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsImprovement => "Needs-Improvement",
        }
    }

    /// Korean legend label used on the dashboard.
    #[must_use]
    pub const fn label_ko(self) -> &'static str {
        match self {
            Self::Good => "양호",
            Self::Fair => "유지관리 대상",
            Self::NeedsImprovement => "교체 권장 대상",
        }
    }

    /// Legend color (`#RRGGBB`).
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Good => "#5CB85C",
            Self::Fair => "#F0AD4E",
            Self::NeedsImprovement => "#D9534F",
        }
    }

    /// Marker radius used for point layers. Worse APs draw larger.
    #[must_use]
    pub const fn marker_radius(self) -> u8 {
        match self {
            Self::Good | Self::Fair => 4,
            Self::NeedsImprovement => 6,
        }
    }

    /// Whether this rank belongs in attention-directing views.
    #[must_use]
    pub const fn needs_attention(self) -> bool {
        !matches!(self, Self::Good)
    }
}

impl From<ConditionRank> for u8 {
    fn from(rank: ConditionRank) -> Self {
        rank.value()
    }
}

impl TryFrom<u8> for ConditionRank {
    type Error = InvalidRankError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Error returned when attempting to create a [`ConditionRank`] from an
/// invalid numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRankError {
    /// The invalid rank value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidRankError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid condition rank {}: expected 0-2", self.value)
    }
}

impl std::error::Error for InvalidRankError {}

/// One row of the fixed rank legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    /// The rank this row describes.
    pub rank: ConditionRank,
    /// English label.
    pub label: String,
    /// Korean label.
    pub label_ko: String,
    /// Fill color.
    pub color: String,
}

/// Returns the rank legend, one entry per rank in ascending order.
#[must_use]
pub fn legend() -> Vec<LegendEntry> {
    ConditionRank::ALL
        .iter()
        .map(|&rank| LegendEntry {
            rank,
            label: rank.label().to_string(),
            label_ko: rank.label_ko().to_string(),
            color: rank.color().to_string(),
        })
        .collect()
}

/// Installation site category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallType {
    /// 주요거리
    MainStreet = 1,
    /// 전통시장
    TraditionalMarket = 2,
    /// 공원(하천)
    ParkRiver = 3,
    /// 문화관광
    CultureTourism = 4,
    /// 버스정류소
    BusStop = 5,
    /// 복지시설
    WelfareFacility = 6,
    /// 공공시설
    PublicFacility = 7,
    /// 기타
    Other = 9,
}

impl InstallType {
    /// All install types in code order.
    pub const ALL: [Self; 8] = [
        Self::MainStreet,
        Self::TraditionalMarket,
        Self::ParkRiver,
        Self::CultureTourism,
        Self::BusStop,
        Self::WelfareFacility,
        Self::PublicFacility,
        Self::Other,
    ];

    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks up an install type by code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::MainStreet),
            2 => Some(Self::TraditionalMarket),
            3 => Some(Self::ParkRiver),
            4 => Some(Self::CultureTourism),
            5 => Some(Self::BusStop),
            6 => Some(Self::WelfareFacility),
            7 => Some(Self::PublicFacility),
            9 => Some(Self::Other),
            _ => None,
        }
    }

    /// Looks up an install type by its Korean label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// Korean label as used in the source data.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MainStreet => "주요거리",
            Self::TraditionalMarket => "전통시장",
            Self::ParkRiver => "공원(하천)",
            Self::CultureTourism => "문화관광",
            Self::BusStop => "버스정류소",
            Self::WelfareFacility => "복지시설",
            Self::PublicFacility => "공공시설",
            Self::Other => "기타",
        }
    }

    /// Label for an arbitrary code, including codes outside the known set.
    #[must_use]
    pub fn label_for_code(code: u8) -> String {
        Self::from_code(code).map_or_else(|| format!("미정({code})"), |t| t.label().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_from_value_roundtrip() {
        for v in 0..=2u8 {
            let rank = ConditionRank::from_value(v).unwrap();
            assert_eq!(rank.value(), v);
        }
        assert_eq!(
            ConditionRank::from_value(3),
            Err(InvalidRankError { value: 3 })
        );
    }

    #[test]
    fn rank_serializes_as_integer() {
        let json = serde_json::to_string(&ConditionRank::NeedsImprovement).unwrap();
        assert_eq!(json, "2");
        let rank: ConditionRank = serde_json::from_str("1").unwrap();
        assert_eq!(rank, ConditionRank::Fair);
        assert!(serde_json::from_str::<ConditionRank>("7").is_err());
    }

    #[test]
    fn only_good_is_excluded_from_attention() {
        assert!(!ConditionRank::Good.needs_attention());
        assert!(ConditionRank::Fair.needs_attention());
        assert!(ConditionRank::NeedsImprovement.needs_attention());
    }

    #[test]
    fn legend_covers_every_rank_once() {
        let legend = legend();
        assert_eq!(legend.len(), 3);
        for (entry, rank) in legend.iter().zip(ConditionRank::ALL) {
            assert_eq!(entry.rank, rank);
            assert!(entry.color.starts_with('#') && entry.color.len() == 7);
        }
    }

    #[test]
    fn install_type_codes_roundtrip() {
        for t in InstallType::ALL {
            assert_eq!(InstallType::from_code(t.code()), Some(t));
            assert_eq!(InstallType::from_label(t.label()), Some(t));
        }
        assert_eq!(InstallType::from_code(8), None);
    }

    #[test]
    fn unknown_install_code_gets_placeholder_label() {
        assert_eq!(InstallType::label_for_code(5), "버스정류소");
        assert_eq!(InstallType::label_for_code(8), "미정(8)");
    }

    #[test]
    fn feature_reads_matching_column() {
        let scores = FeatureScores::new(0.1, 0.2, 0.3);
        assert!((Feature::Age.of(&scores) - 0.1).abs() < f64::EPSILON);
        assert!((Feature::Usage.of(&scores) - 0.2).abs() < f64::EPSILON);
        assert!((Feature::Density.of(&scores) - 0.3).abs() < f64::EPSILON);
        assert_eq!("density".parse::<Feature>().unwrap(), Feature::Density);
    }
}
