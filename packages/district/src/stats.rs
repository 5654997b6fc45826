//! Install-count and usage statistics per district.

use std::collections::BTreeMap;

use wifi_map_access_point_models::AccessPoint;
use wifi_map_district_models::{DistrictCount, LowUsageReport};

use crate::DistrictError;

/// Quantile of `values` with linear interpolation between the two nearest
/// order statistics. Non-finite values are ignored. Returns `None` when no
/// finite value remains.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let frac = position - lower as f64;
    Some((sorted[upper] - sorted[lower]).mul_add(frac, sorted[lower]))
}

/// Counts APs per district, largest first, ties by name.
pub fn count_by_district<'a>(aps: impl IntoIterator<Item = &'a AccessPoint>) -> Vec<DistrictCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for ap in aps {
        *counts.entry(ap.gu.as_str()).or_default() += 1;
    }

    let mut out: Vec<DistrictCount> = counts
        .into_iter()
        .map(|(gu, count)| DistrictCount {
            gu: gu.to_string(),
            count,
        })
        .collect();
    // BTreeMap order is by name, so a stable sort keeps name as the tie-break.
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// The `n` districts with the most installed APs.
#[must_use]
pub fn top_install_counts(aps: &[AccessPoint], n: usize) -> Vec<DistrictCount> {
    let mut counts = count_by_district(aps);
    counts.truncate(n);
    counts
}

/// Finds APs whose usage score is in the bottom `q` quantile and counts
/// them per district.
///
/// # Errors
///
/// * [`DistrictError::InvalidQuantile`] if `q` is outside `[0, 1]`
/// * [`DistrictError::Empty`] if there are no APs
pub fn low_usage(aps: &[AccessPoint], q: f64) -> Result<LowUsageReport, DistrictError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(DistrictError::InvalidQuantile(q));
    }
    let usage: Vec<f64> = aps.iter().map(|ap| ap.features.usage).collect();
    let threshold = quantile(&usage, q).ok_or(DistrictError::Empty)?;

    let low: Vec<&AccessPoint> = aps
        .iter()
        .filter(|ap| ap.features.usage <= threshold)
        .collect();

    log::debug!(
        "Low usage threshold {threshold:.4} at q={q}: {} of {} APs",
        low.len(),
        aps.len()
    );

    Ok(LowUsageReport {
        quantile: q,
        threshold,
        total: low.len(),
        by_district: count_by_district(low),
    })
}
