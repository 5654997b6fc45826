#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! AP condition classification.
//!
//! Turns a [`DatasetSnapshot`] into a [`ClassifiedDataset`] in three steps:
//!
//! 1. [`kmeans::assign_clusters`] partitions the APs into three groups over
//!    their normalized `(age, usage, density)` features.
//! 2. [`rank::rank_clusters`] orders the groups by weighted summed mean
//!    features and maps them onto [`ConditionRank`].
//! 3. [`apply::apply_ranks`] joins the rank back onto every AP.
//!
//! The result is immutable and tied to the snapshot's [`DatasetVersion`].
//! [`ClassificationStore`] keeps one classified dataset per version so a
//! caller serving many views only recomputes when the data changes.

pub mod apply;
pub mod config;
pub mod kmeans;
pub mod rank;

use std::sync::Arc;

use thiserror::Error;
use wifi_map_access_point_models::{AccessPoint, ConditionRank};
use wifi_map_dataset::{DatasetSnapshot, DatasetVersion};

pub use apply::{ClassifiedAccessPoint, RankAggregate, SelectionPolicy, aggregate_ranks, select};
pub use config::{ClassifyConfig, RiskWeights};
pub use rank::{GroupStats, RankMapping};

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The batch cannot be split into three meaningful groups.
    #[error("Insufficient data for classification: {reason}")]
    InsufficientData {
        /// What was missing.
        reason: String,
    },

    /// An AP's raw group id has no rank. Indicates a defect in the
    /// clustering/ranking pairing, not bad data.
    #[error("Mapping integrity error: AP '{ap_id}' has no rank for group {cluster:?}")]
    MappingIntegrity {
        /// The AP that could not be ranked.
        ap_id: String,
        /// Its raw group id, if it had one.
        cluster: Option<usize>,
    },
}

/// A snapshot with every AP classified.
#[derive(Debug, Clone)]
pub struct ClassifiedDataset {
    version: DatasetVersion,
    records: Arc<[ClassifiedAccessPoint]>,
    mapping: RankMapping,
    inertia: f64,
}

impl ClassifiedDataset {
    /// Runs the full pipeline over `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::InsufficientData`] if the batch has fewer
    /// than three distinct feature combinations, and
    /// [`ClassifyError::MappingIntegrity`] if the ranking cannot be applied.
    pub fn classify(
        snapshot: &DatasetSnapshot,
        config: &ClassifyConfig,
    ) -> Result<Self, ClassifyError> {
        Self::classify_records(snapshot.version().clone(), snapshot.access_points(), config)
    }

    /// Runs the pipeline over an arbitrary batch tagged with `version`.
    ///
    /// # Errors
    ///
    /// See [`Self::classify`].
    pub fn classify_records(
        version: DatasetVersion,
        access_points: &[AccessPoint],
        config: &ClassifyConfig,
    ) -> Result<Self, ClassifyError> {
        log::info!(
            "Classifying {} APs (seed {}, {} inits)",
            access_points.len(),
            config.seed,
            config.n_init
        );

        let points: Vec<kmeans::Point> = access_points
            .iter()
            .map(|ap| ap.features.as_array())
            .collect();
        let assignment = kmeans::assign_clusters(&points, config)?;
        let mapping = rank::rank_clusters(access_points, &assignment.labels, &config.risk_weights)?;
        let records = apply::apply_ranks(access_points, &assignment.labels, &mapping)?;

        Ok(Self {
            version,
            records: records.into(),
            mapping,
            inertia: assignment.inertia,
        })
    }

    /// Version of the snapshot this classification was derived from.
    #[must_use]
    pub const fn version(&self) -> &DatasetVersion {
        &self.version
    }

    /// Every classified AP, in snapshot order.
    #[must_use]
    pub fn records(&self) -> &[ClassifiedAccessPoint] {
        &self.records
    }

    /// The raw group -> rank mapping with per-group statistics.
    #[must_use]
    pub const fn mapping(&self) -> &RankMapping {
        &self.mapping
    }

    /// Within-group sum of squared distances of the winning clustering.
    #[must_use]
    pub const fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Applies a point-level selection policy.
    #[must_use]
    pub fn select(&self, policy: SelectionPolicy) -> Vec<&ClassifiedAccessPoint> {
        apply::select(&self.records, policy)
    }

    /// Rank of one AP.
    #[must_use]
    pub fn rank_of(&self, ap_id: &str) -> Option<ConditionRank> {
        self.records
            .iter()
            .find(|c| c.access_point.ap_id == ap_id)
            .map(|c| c.rank)
    }

    /// Number of APs per rank, indexed by rank value.
    #[must_use]
    pub fn rank_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for record in self.records.iter() {
            counts[usize::from(record.rank.value())] += 1;
        }
        counts
    }
}

/// Caller-owned memo of the classification for the current dataset
/// version.
#[derive(Debug, Default)]
pub struct ClassificationStore {
    config: ClassifyConfig,
    current: Option<Arc<ClassifiedDataset>>,
}

impl ClassificationStore {
    /// Creates an empty store that classifies with `config`.
    #[must_use]
    pub const fn new(config: ClassifyConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// Returns the classification for `snapshot`, computing it only if the
    /// stored one belongs to a different version.
    ///
    /// # Errors
    ///
    /// Propagates [`ClassifyError`] from the pipeline. A failed run leaves
    /// the store empty.
    pub fn get_or_classify(
        &mut self,
        snapshot: &DatasetSnapshot,
    ) -> Result<Arc<ClassifiedDataset>, ClassifyError> {
        if let Some(current) = self
            .current
            .as_ref()
            .filter(|c| c.version() == snapshot.version())
        {
            return Ok(Arc::clone(current));
        }

        self.current = None;
        let classified = Arc::new(ClassifiedDataset::classify(snapshot, &self.config)?);
        log::info!(
            "Cached classification for dataset {}",
            classified.version().short()
        );
        self.current = Some(Arc::clone(&classified));
        Ok(classified)
    }

    /// The stored classification, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<ClassifiedDataset>> {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_map_access_point_models::FeatureScores;

    fn ap(id: &str, gu: &str, v: f64) -> AccessPoint {
        AccessPoint {
            ap_id: id.to_string(),
            gu: gu.to_string(),
            lat: 37.55,
            lon: 126.98,
            install_year: None,
            install_type_code: None,
            install_type: None,
            indoor_outdoor: None,
            address: None,
            usage_gb: None,
            features: FeatureScores::new(v, v + 0.01, v - 0.01),
        }
    }

    /// Nine APs in three tight groups around 0.1, 0.5, and 0.9, with the
    /// groups interleaved so input order says nothing about rank.
    fn nine_aps() -> Vec<AccessPoint> {
        vec![
            ap("n1", "강남구", 0.9),
            ap("g1", "종로구", 0.1),
            ap("f1", "마포구", 0.5),
            ap("g2", "종로구", 0.11),
            ap("n2", "강남구", 0.91),
            ap("f2", "마포구", 0.49),
            ap("f3", "마포구", 0.51),
            ap("g3", "종로구", 0.09),
            ap("n3", "강남구", 0.89),
        ]
    }

    fn snapshot(records: Vec<AccessPoint>) -> DatasetSnapshot {
        DatasetSnapshot::from_records("test", records).unwrap()
    }

    #[test]
    fn classifies_three_groups_in_risk_order() {
        let classified =
            ClassifiedDataset::classify(&snapshot(nine_aps()), &ClassifyConfig::default()).unwrap();

        assert_eq!(classified.rank_counts(), [3, 3, 3]);
        for record in classified.records() {
            let expected = match &record.access_point.ap_id[..1] {
                "g" => ConditionRank::Good,
                "f" => ConditionRank::Fair,
                _ => ConditionRank::NeedsImprovement,
            };
            assert_eq!(record.rank, expected, "{}", record.access_point.ap_id);
        }

        let scores: Vec<f64> = classified
            .mapping()
            .groups()
            .iter()
            .map(|g| g.risk_score)
            .collect();
        assert!((scores[0] - 0.3).abs() < 0.01);
        assert!((scores[1] - 1.5).abs() < 0.01);
        assert!((scores[2] - 2.7).abs() < 0.01);
        assert!(scores[0] <= scores[1] && scores[1] <= scores[2]);
    }

    #[test]
    fn needs_attention_view_drops_good_aps() {
        let classified =
            ClassifiedDataset::classify(&snapshot(nine_aps()), &ClassifyConfig::default()).unwrap();
        let selected = classified.select(SelectionPolicy::NeedsAttention);
        assert_eq!(selected.len(), 6);
        assert!(selected.iter().all(|c| !c.access_point.ap_id.starts_with('g')));
    }

    #[test]
    fn reclassification_is_idempotent() {
        let snap = snapshot(nine_aps());
        let config = ClassifyConfig {
            seed: 7,
            ..ClassifyConfig::default()
        };
        let a = ClassifiedDataset::classify(&snap, &config).unwrap();
        let b = ClassifiedDataset::classify(&snap, &config).unwrap();
        let ranks_a: Vec<ConditionRank> = a.records().iter().map(|c| c.rank).collect();
        let ranks_b: Vec<ConditionRank> = b.records().iter().map(|c| c.rank).collect();
        assert_eq!(ranks_a, ranks_b);
    }

    #[test]
    fn different_seeds_agree_on_ranks() {
        let snap = snapshot(nine_aps());
        let a = ClassifiedDataset::classify(&snap, &ClassifyConfig::default()).unwrap();
        let b = ClassifiedDataset::classify(
            &snap,
            &ClassifyConfig {
                seed: 1234,
                ..ClassifyConfig::default()
            },
        )
        .unwrap();
        for (x, y) in a.records().iter().zip(b.records()) {
            assert_eq!(x.rank, y.rank);
        }
    }

    #[test]
    fn identical_features_are_insufficient() {
        let records: Vec<AccessPoint> = (0..6).map(|i| ap(&i.to_string(), "중구", 0.4)).collect();
        let err =
            ClassifiedDataset::classify(&snapshot(records), &ClassifyConfig::default()).unwrap_err();
        assert!(matches!(err, ClassifyError::InsufficientData { .. }));
    }

    #[test]
    fn empty_snapshot_is_insufficient() {
        let err =
            ClassifiedDataset::classify(&snapshot(Vec::new()), &ClassifyConfig::default()).unwrap_err();
        assert!(matches!(err, ClassifyError::InsufficientData { .. }));
    }

    #[test]
    fn store_reuses_classification_for_same_version() {
        let snap = snapshot(nine_aps());
        let mut store = ClassificationStore::new(ClassifyConfig::default());
        let first = store.get_or_classify(&snap).unwrap();
        let second = store.get_or_classify(&snap.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let mut changed = nine_aps();
        changed[0].features = FeatureScores::new(0.95, 0.95, 0.95);
        let third = store.get_or_classify(&snapshot(changed)).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_ne!(first.version(), third.version());
    }

    #[test]
    fn store_is_empty_after_failure() {
        let mut store = ClassificationStore::new(ClassifyConfig::default());
        store.get_or_classify(&snapshot(nine_aps())).unwrap();
        assert!(store.current().is_some());

        let flat: Vec<AccessPoint> = (0..3).map(|i| ap(&i.to_string(), "중구", 0.2)).collect();
        assert!(store.get_or_classify(&snapshot(flat)).is_err());
        assert!(store.current().is_none());
    }

    #[test]
    fn looks_up_rank_by_id() {
        let classified =
            ClassifiedDataset::classify(&snapshot(nine_aps()), &ClassifyConfig::default()).unwrap();
        assert_eq!(classified.rank_of("n2"), Some(ConditionRank::NeedsImprovement));
        assert_eq!(classified.rank_of("missing"), None);
    }

    #[test]
    fn classified_dataset_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClassifiedDataset>();
    }
}
