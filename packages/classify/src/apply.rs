//! Joins ranks back onto AP records and exposes the consumer-facing
//! selection policies.

use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use wifi_map_access_point_models::{AccessPoint, ConditionRank};

use crate::ClassifyError;
use crate::rank::RankMapping;

/// An access point with its classification applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedAccessPoint {
    /// The source record.
    #[serde(flatten)]
    pub access_point: AccessPoint,
    /// Raw k-means group id.
    pub cluster: usize,
    /// Semantic rank.
    pub rank: ConditionRank,
}

/// Applies `mapping` to every AP.
///
/// # Errors
///
/// Returns [`ClassifyError::MappingIntegrity`] if an AP has no label or
/// its label has no rank. There is no fallback rank.
pub fn apply_ranks(
    access_points: &[AccessPoint],
    labels: &[usize],
    mapping: &RankMapping,
) -> Result<Vec<ClassifiedAccessPoint>, ClassifyError> {
    access_points
        .iter()
        .enumerate()
        .map(|(idx, ap)| {
            let cluster = labels.get(idx).copied();
            let rank = cluster.and_then(|c| mapping.rank_of(c)).ok_or_else(|| {
                ClassifyError::MappingIntegrity {
                    ap_id: ap.ap_id.clone(),
                    cluster,
                }
            })?;
            Ok(ClassifiedAccessPoint {
                access_point: ap.clone(),
                cluster: cluster.unwrap_or_default(),
                rank,
            })
        })
        .collect()
}

/// Which APs a point-level view should show.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Every AP, in input order.
    All,
    /// Only Fair and Needs-Improvement APs, ordered by rank (stable), so
    /// worse APs draw on top.
    #[default]
    NeedsAttention,
}

/// Applies a selection policy.
#[must_use]
pub fn select(
    classified: &[ClassifiedAccessPoint],
    policy: SelectionPolicy,
) -> Vec<&ClassifiedAccessPoint> {
    match policy {
        SelectionPolicy::All => classified.iter().collect(),
        SelectionPolicy::NeedsAttention => {
            let mut selected: Vec<&ClassifiedAccessPoint> = classified
                .iter()
                .filter(|c| c.rank.needs_attention())
                .collect();
            selected.sort_by_key(|c| c.rank);
            selected
        }
    }
}

/// Rank rollup over a set of APs (typically one district).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankAggregate {
    /// Number of APs per rank, indexed by rank value.
    pub counts: [usize; 3],
    /// Mean rank value.
    pub mean: f64,
    /// Mean rank rounded half-up.
    pub rounded: ConditionRank,
    /// Most common rank; ties go to the better (lower) rank.
    pub modal: ConditionRank,
}

/// Aggregates ranks. Returns `None` for an empty input.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn aggregate_ranks(ranks: impl IntoIterator<Item = ConditionRank>) -> Option<RankAggregate> {
    let mut counts = [0usize; 3];
    for rank in ranks {
        counts[usize::from(rank.value())] += 1;
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return None;
    }

    let weighted: usize = counts.iter().enumerate().map(|(v, &n)| v * n).sum();
    let mean = weighted as f64 / total as f64;
    // Mean is within [0, 2], so the rounded value always maps to a rank.
    let rounded = ConditionRank::from_value(mean.round().clamp(0.0, 2.0) as u8).ok()?;

    let mut modal = ConditionRank::Good;
    let mut modal_count = 0;
    for (rank, &count) in ConditionRank::ALL.iter().zip(&counts) {
        if count > modal_count {
            modal = *rank;
            modal_count = count;
        }
    }

    Some(RankAggregate {
        counts,
        mean,
        rounded,
        modal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskWeights;
    use crate::rank::rank_clusters;
    use wifi_map_access_point_models::FeatureScores;

    fn ap(id: &str, v: f64) -> AccessPoint {
        AccessPoint {
            ap_id: id.to_string(),
            gu: "용산구".to_string(),
            lat: 37.53,
            lon: 126.97,
            install_year: None,
            install_type_code: None,
            install_type: None,
            indoor_outdoor: None,
            address: None,
            usage_gb: None,
            features: FeatureScores::new(v, v, v),
        }
    }

    fn classified(ranks: &[ConditionRank]) -> Vec<ClassifiedAccessPoint> {
        ranks
            .iter()
            .enumerate()
            .map(|(i, &rank)| ClassifiedAccessPoint {
                access_point: ap(&i.to_string(), 0.5),
                cluster: usize::from(rank.value()),
                rank,
            })
            .collect()
    }

    #[test]
    fn applies_mapping_to_every_row() {
        let aps = vec![ap("a", 0.9), ap("b", 0.1), ap("c", 0.5), ap("d", 0.12)];
        let labels = [0, 1, 2, 1];
        let mapping = rank_clusters(&aps, &labels, &RiskWeights::default()).unwrap();
        let out = apply_ranks(&aps, &labels, &mapping).unwrap();

        let ranks: Vec<ConditionRank> = out.iter().map(|c| c.rank).collect();
        assert_eq!(
            ranks,
            vec![
                ConditionRank::NeedsImprovement,
                ConditionRank::Good,
                ConditionRank::Fair,
                ConditionRank::Good
            ]
        );
        assert_eq!(out[3].cluster, 1);
        assert_eq!(out[3].access_point.ap_id, "d");
    }

    #[test]
    fn unmapped_label_fails_fast() {
        let aps = vec![ap("a", 0.9), ap("b", 0.1), ap("c", 0.5)];
        let mapping = rank_clusters(&aps, &[0, 1, 2], &RiskWeights::default()).unwrap();
        let err = apply_ranks(&aps, &[0, 1, 7], &mapping).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::MappingIntegrity { ref ap_id, cluster: Some(7) } if ap_id == "c"
        ));
        assert!(apply_ranks(&aps, &[0, 1], &mapping).is_err());
    }

    #[test]
    fn needs_attention_excludes_good_and_sorts_by_rank() {
        let rows = classified(&[
            ConditionRank::NeedsImprovement,
            ConditionRank::Good,
            ConditionRank::Fair,
            ConditionRank::NeedsImprovement,
            ConditionRank::Fair,
        ]);
        let selected = select(&rows, SelectionPolicy::NeedsAttention);
        let ids: Vec<&str> = selected
            .iter()
            .map(|c| c.access_point.ap_id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "4", "0", "3"]);

        assert_eq!(select(&rows, SelectionPolicy::All).len(), 5);
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!(
            "needs-attention".parse::<SelectionPolicy>().unwrap(),
            SelectionPolicy::NeedsAttention
        );
        assert_eq!("all".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::All);
    }

    #[test]
    fn uniform_districts_keep_their_rank() {
        let good = aggregate_ranks(vec![ConditionRank::Good; 4]).unwrap();
        assert_eq!(good.rounded, ConditionRank::Good);
        assert_eq!(good.modal, ConditionRank::Good);

        let bad = aggregate_ranks(vec![ConditionRank::NeedsImprovement; 3]).unwrap();
        assert_eq!(bad.rounded, ConditionRank::NeedsImprovement);
        assert_eq!(bad.counts, [0, 0, 3]);
    }

    #[test]
    fn mean_rank_rounds_half_up() {
        let agg = aggregate_ranks([ConditionRank::Good, ConditionRank::Fair]).unwrap();
        assert!((agg.mean - 0.5).abs() < f64::EPSILON);
        assert_eq!(agg.rounded, ConditionRank::Fair);
        assert_eq!(agg.modal, ConditionRank::Good);

        let agg = aggregate_ranks([
            ConditionRank::Good,
            ConditionRank::Good,
            ConditionRank::NeedsImprovement,
        ])
        .unwrap();
        assert_eq!(agg.rounded, ConditionRank::Fair);
        assert_eq!(agg.modal, ConditionRank::Good);
    }

    #[test]
    fn empty_aggregate_is_none() {
        assert!(aggregate_ranks(Vec::new()).is_none());
    }
}
