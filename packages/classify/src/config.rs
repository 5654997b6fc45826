//! Classification parameters.

use serde::{Deserialize, Serialize};
use wifi_map_access_point_models::FeatureScores;

/// Per-feature weights used to turn a group's mean features into a single
/// risk score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    /// Weight of the mean age score.
    pub age: f64,
    /// Weight of the mean usage score.
    pub usage: f64,
    /// Weight of the mean density score.
    pub density: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            age: 1.0,
            usage: 1.0,
            density: 1.0,
        }
    }
}

impl RiskWeights {
    /// Weighted sum of a feature triple.
    #[must_use]
    pub fn score(&self, features: &FeatureScores) -> f64 {
        self.density
            .mul_add(features.density, self.age.mul_add(features.age, self.usage * features.usage))
    }
}

/// Parameters for one classification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Seed for k-means++ initialization. Same seed + same batch gives the
    /// same assignment.
    pub seed: u64,
    /// Number of independent initializations; the lowest-inertia run wins.
    pub n_init: usize,
    /// Upper bound on Lloyd iterations per initialization.
    pub max_iterations: usize,
    /// Squared centroid shift below which a run is considered converged.
    pub tolerance: f64,
    /// Weights for the risk score used to order groups.
    pub risk_weights: RiskWeights,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-6,
            risk_weights: RiskWeights::default(),
        }
    }
}
