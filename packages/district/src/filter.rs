//! Narrows the AP point layer by install type and low usage.

use wifi_map_access_point_models::AccessPoint;
use wifi_map_dataset::DatasetSnapshot;

use crate::{DistrictError, stats};

/// Point layer filter, as chosen by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointFilter {
    /// Keep only APs with this install type label.
    pub install_type: Option<String>,
    /// Keep only APs whose usage score is in this bottom quantile.
    pub low_usage_quantile: Option<f64>,
}

impl PointFilter {
    /// Binds the filter to `snapshot`, computing the usage threshold over
    /// every AP in it.
    ///
    /// # Errors
    ///
    /// * [`DistrictError::UnknownInstallType`] if no AP has the install type
    /// * See [`stats::low_usage`]
    pub fn resolve(&self, snapshot: &DatasetSnapshot) -> Result<ResolvedFilter, DistrictError> {
        if let Some(label) = &self.install_type {
            let known = snapshot.install_types();
            if !known.iter().any(|k| k == label) {
                return Err(DistrictError::UnknownInstallType {
                    label: label.clone(),
                    known,
                });
            }
        }

        let usage_threshold = self
            .low_usage_quantile
            .map(|q| stats::low_usage(snapshot.access_points(), q).map(|r| r.threshold))
            .transpose()?;

        Ok(ResolvedFilter {
            install_type: self.install_type.clone(),
            usage_threshold,
        })
    }
}

/// A [`PointFilter`] with its usage threshold fixed. The default keeps
/// every AP.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFilter {
    install_type: Option<String>,
    usage_threshold: Option<f64>,
}

impl ResolvedFilter {
    /// Usage score at or below which APs are kept, if filtering on usage.
    #[must_use]
    pub const fn usage_threshold(&self) -> Option<f64> {
        self.usage_threshold
    }

    /// Whether `ap` passes every active condition.
    #[must_use]
    pub fn matches(&self, ap: &AccessPoint) -> bool {
        self.install_type
            .as_deref()
            .is_none_or(|label| ap.install_type_label().as_deref() == Some(label))
            && self
                .usage_threshold
                .is_none_or(|threshold| ap.features.usage <= threshold)
    }
}
