//! Orders the raw k-means groups into the [`ConditionRank`] scale.
//!
//! Each group's risk score is the weighted sum of its mean features. The
//! lowest-risk group becomes [`ConditionRank::Good`], the highest
//! [`ConditionRank::NeedsImprovement`]. Equal scores fall back to the raw
//! group id so the mapping is always reproducible.

use serde::Serialize;
use wifi_map_access_point_models::{AccessPoint, ConditionRank, FeatureScores};

use crate::ClassifyError;
use crate::config::RiskWeights;
use crate::kmeans::K;

/// Statistics for one raw group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    /// Raw group id produced by clustering.
    pub cluster: usize,
    /// Semantic rank assigned to the group.
    pub rank: ConditionRank,
    /// Number of APs in the group.
    pub members: usize,
    /// Mean of each feature across members.
    pub mean: FeatureScores,
    /// Weighted sum of the mean features.
    pub risk_score: f64,
}

/// Bijective mapping from raw group id to [`ConditionRank`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankMapping {
    /// `ranks[cluster]` is the rank of that raw group.
    ranks: [ConditionRank; K],
    /// Per-group statistics, ordered by rank ascending.
    groups: Vec<GroupStats>,
}

impl RankMapping {
    /// Rank of a raw group id, or `None` if the id is out of range.
    #[must_use]
    pub fn rank_of(&self, cluster: usize) -> Option<ConditionRank> {
        self.ranks.get(cluster).copied()
    }

    /// Raw group id that carries `rank`.
    #[must_use]
    pub fn cluster_of(&self, rank: ConditionRank) -> usize {
        self.groups[usize::from(rank.value())].cluster
    }

    /// Per-group statistics ordered Good, Fair, Needs-Improvement.
    #[must_use]
    pub fn groups(&self) -> &[GroupStats] {
        &self.groups
    }
}

/// Computes the rank mapping for a clustered batch.
///
/// # Errors
///
/// Returns [`ClassifyError::MappingIntegrity`] if an AP has no label or a
/// label outside `0..K`, and [`ClassifyError::InsufficientData`] if a
/// group has no members.
#[allow(clippy::cast_precision_loss)]
pub fn rank_clusters(
    access_points: &[AccessPoint],
    labels: &[usize],
    weights: &RiskWeights,
) -> Result<RankMapping, ClassifyError> {
    let mut sums = [[0.0f64; 3]; K];
    let mut counts = [0usize; K];

    for (idx, ap) in access_points.iter().enumerate() {
        let label = labels.get(idx).copied();
        match label {
            Some(l) if l < K => {
                counts[l] += 1;
                for (sum, v) in sums[l].iter_mut().zip(ap.features.as_array()) {
                    *sum += v;
                }
            }
            _ => {
                return Err(ClassifyError::MappingIntegrity {
                    ap_id: ap.ap_id.clone(),
                    cluster: label,
                });
            }
        }
    }

    let mut stats = Vec::with_capacity(K);
    for cluster in 0..K {
        if counts[cluster] == 0 {
            return Err(ClassifyError::InsufficientData {
                reason: format!("group {cluster} has no members"),
            });
        }
        let n = counts[cluster] as f64;
        let [age, usage, density] = sums[cluster].map(|s| s / n);
        let mean = FeatureScores::new(age, usage, density);
        stats.push(GroupStats {
            cluster,
            rank: ConditionRank::Good,
            members: counts[cluster],
            mean,
            risk_score: weights.score(&mean),
        });
    }

    stats.sort_by(|a, b| {
        a.risk_score
            .total_cmp(&b.risk_score)
            .then(a.cluster.cmp(&b.cluster))
    });

    let mut ranks = [ConditionRank::Good; K];
    for (group, rank) in stats.iter_mut().zip(ConditionRank::ALL) {
        group.rank = rank;
        ranks[group.cluster] = rank;
    }

    for group in &stats {
        log::info!(
            "Group {} -> {} ({} APs, risk {:.3})",
            group.cluster,
            group.rank.label(),
            group.members,
            group.risk_score
        );
    }

    Ok(RankMapping {
        ranks,
        groups: stats,
    })
}
