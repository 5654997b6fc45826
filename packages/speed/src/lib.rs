#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nearby AP ranking by expected connection quality and distance.
//!
//! Quality is a heuristic over the normalized features: fresh, lightly
//! used APs in sparse areas are expected to be faster. It is blended with
//! a distance score derived from the geodesic distance to the user.

use geo::{Distance, Geodesic, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use wifi_map_access_point_models::AccessPoint;

/// Errors from speed ranking.
#[derive(Debug, Error)]
pub enum SpeedError {
    /// The user location is not a valid WGS84 coordinate.
    #[error("Invalid location: lat {lat}, lon {lon}")]
    InvalidLocation {
        /// Latitude given.
        lat: f64,
        /// Longitude given.
        lon: f64,
    },
}

/// Where the user is standing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
}

impl Default for UserLocation {
    /// Seoul City Hall.
    fn default() -> Self {
        Self {
            lat: 37.5665,
            lon: 126.9780,
        }
    }
}

impl UserLocation {
    /// Validates and builds a location.
    ///
    /// # Errors
    ///
    /// * [`SpeedError::InvalidLocation`] if either coordinate is non-finite or out of range
    pub fn new(lat: f64, lon: f64) -> Result<Self, SpeedError> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(SpeedError::InvalidLocation { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    fn point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Weights for the quality and blended scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Quality weight of `1 - usage`.
    pub usage_weight: f64,
    /// Quality weight of `1 - density`.
    pub density_weight: f64,
    /// Quality weight of `1 - age`.
    pub age_weight: f64,
    /// Blended weight of quality.
    pub quality_weight: f64,
    /// Blended weight of the distance score.
    pub distance_weight: f64,
    /// Number of APs returned.
    pub limit: usize,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            usage_weight: 0.4,
            density_weight: 0.3,
            age_weight: 0.3,
            quality_weight: 0.6,
            distance_weight: 0.4,
            limit: 10,
        }
    }
}

/// Sort order for nearby APs.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortMode {
    /// Closest first.
    Nearest,
    /// Highest expected quality first.
    Fastest,
    /// Highest blended score first.
    #[default]
    Blended,
}

/// One AP with its distance and scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedEstimate {
    /// The AP.
    #[serde(flatten)]
    pub access_point: AccessPoint,
    /// Geodesic distance from the user, in meters.
    pub distance_m: f64,
    /// `1 / (distance_m + 1)`.
    pub distance_score: f64,
    /// Expected quality from the features.
    pub quality: f64,
    /// Blend of quality and distance score.
    pub score: f64,
}

/// Geodesic (WGS84 ellipsoid) distance in meters.
#[must_use]
pub fn geodesic_distance(from: UserLocation, lat: f64, lon: f64) -> f64 {
    Geodesic.distance(from.point(), Point::new(lon, lat))
}

/// Expected quality of an AP.
#[must_use]
pub fn quality(ap: &AccessPoint, config: &SpeedConfig) -> f64 {
    let f = &ap.features;
    config.age_weight.mul_add(
        1.0 - f.age,
        config
            .usage_weight
            .mul_add(1.0 - f.usage, config.density_weight * (1.0 - f.density)),
    )
}

/// Scores one AP from `location`.
#[must_use]
pub fn estimate(ap: &AccessPoint, location: UserLocation, config: &SpeedConfig) -> SpeedEstimate {
    let distance_m = geodesic_distance(location, ap.lat, ap.lon);
    let distance_score = 1.0 / (distance_m + 1.0);
    let quality = quality(ap, config);
    let score = config
        .quality_weight
        .mul_add(quality, config.distance_weight * distance_score);

    SpeedEstimate {
        access_point: ap.clone(),
        distance_m,
        distance_score,
        quality,
        score,
    }
}

/// Scores `aps` from `location` and returns the top `config.limit` under
/// `mode`. Equal keys keep input order.
pub fn rank_nearby<'a>(
    aps: impl IntoIterator<Item = &'a AccessPoint>,
    location: UserLocation,
    mode: SortMode,
    config: &SpeedConfig,
) -> Vec<SpeedEstimate> {
    let mut estimates: Vec<SpeedEstimate> = aps
        .into_iter()
        .map(|ap| estimate(ap, location, config))
        .collect();

    match mode {
        SortMode::Nearest => estimates.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m)),
        SortMode::Fastest => estimates.sort_by(|a, b| b.quality.total_cmp(&a.quality)),
        SortMode::Blended => estimates.sort_by(|a, b| b.score.total_cmp(&a.score)),
    }

    log::debug!(
        "Ranked {} APs by {mode} from ({:.4}, {:.4})",
        estimates.len(),
        location.lat,
        location.lon
    );

    estimates.truncate(config.limit);
    estimates
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_map_access_point_models::FeatureScores;

    fn ap(id: &str, lat: f64, lon: f64, age: f64, usage: f64, density: f64) -> AccessPoint {
        AccessPoint {
            ap_id: id.to_string(),
            gu: "중구".to_string(),
            lat,
            lon,
            install_year: None,
            install_type_code: None,
            install_type: None,
            indoor_outdoor: None,
            address: None,
            usage_gb: None,
            features: FeatureScores::new(age, usage, density),
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let here = UserLocation::default();
        let d = geodesic_distance(here, here.lat, here.lon);
        assert!(d.abs() < 1e-6);
        let e = estimate(&ap("a", here.lat, here.lon, 0.0, 0.0, 0.0), here, &SpeedConfig::default());
        assert!((e.distance_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn one_degree_of_latitude_at_equator() {
        let origin = UserLocation::new(0.0, 0.0).unwrap();
        let d = geodesic_distance(origin, 1.0, 0.0);
        assert!((d - 110_574.4).abs() < 1.0, "got {d}");
    }

    #[test]
    fn city_hall_to_gangnam_station() {
        let d = geodesic_distance(UserLocation::default(), 37.4979, 127.0276);
        assert!((8_000.0..9_500.0).contains(&d), "got {d}");
    }

    #[test]
    fn quality_weights_inverted_features() {
        let config = SpeedConfig::default();
        let fresh = ap("a", 37.5, 127.0, 0.0, 0.0, 0.0);
        assert!((quality(&fresh, &config) - 1.0).abs() < 1e-12);
        let worn = ap("b", 37.5, 127.0, 1.0, 1.0, 1.0);
        assert!(quality(&worn, &config).abs() < 1e-12);
        let mixed = ap("c", 37.5, 127.0, 0.5, 0.0, 1.0);
        assert!((quality(&mixed, &config) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn sort_modes_pick_different_winners() {
        let here = UserLocation::default();
        let aps = vec![
            // Next door but worn out.
            ap("near", here.lat, here.lon + 0.0005, 0.9, 0.9, 0.9),
            // Across town but pristine.
            ap("fast", here.lat - 0.05, here.lon, 0.0, 0.0, 0.0),
            ap("mid", here.lat + 0.01, here.lon, 0.5, 0.5, 0.5),
        ];
        let config = SpeedConfig::default();

        let nearest = rank_nearby(&aps, here, SortMode::Nearest, &config);
        assert_eq!(nearest[0].access_point.ap_id, "near");

        let fastest = rank_nearby(&aps, here, SortMode::Fastest, &config);
        assert_eq!(fastest[0].access_point.ap_id, "fast");
        assert_eq!(fastest[2].access_point.ap_id, "near");

        let blended = rank_nearby(&aps, here, SortMode::Blended, &config);
        assert!(blended.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn limit_truncates() {
        let here = UserLocation::default();
        let aps: Vec<AccessPoint> = (0..20)
            .map(|i| ap(&i.to_string(), here.lat, here.lon + f64::from(i) * 0.001, 0.5, 0.5, 0.5))
            .collect();
        let config = SpeedConfig {
            limit: 5,
            ..SpeedConfig::default()
        };
        let out = rank_nearby(&aps, here, SortMode::Nearest, &config);
        let ids: Vec<&str> = out.iter().map(|e| e.access_point.ap_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn rejects_bad_locations() {
        assert!(UserLocation::new(91.0, 0.0).is_err());
        assert!(UserLocation::new(0.0, f64::NAN).is_err());
        assert!(UserLocation::new(37.5, 127.0).is_ok());
    }

    #[test]
    fn parses_sort_modes() {
        assert_eq!("nearest".parse::<SortMode>().unwrap(), SortMode::Nearest);
        assert_eq!(SortMode::default(), SortMode::Blended);
        assert_eq!(SortMode::Fastest.to_string(), "fastest");
    }
}
