//! Color scales for district layers.
//!
//! [`CountBandScale`] splits district AP counts into low/mid/high thirds
//! and lightens each band's base color by position within the band.
//! [`LinearColormap`] is a 9-step `YlGnBu` ramp for choropleths.

use crate::stats::quantile;

/// Low-count band base color.
pub const BAND_LOW: &str = "#2E7D32";
/// Mid-count band base color.
pub const BAND_MID: &str = "#F9A825";
/// High-count band base color.
pub const BAND_HIGH: &str = "#C62828";
/// Fill for districts with no value.
pub const NO_DATA: &str = "#ffffff";

/// `ColorBrewer` `YlGnBu`, 9 classes.
pub const YL_GN_BU_9: [&str; 9] = [
    "#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4", "#1d91c0", "#225ea8", "#253494",
    "#081d58",
];

/// Parses `#RRGGBB` (case-insensitive, `#` optional).
#[must_use]
pub fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Mixes `hex` with white. `t = 1` keeps the base color, `t = 0` yields
/// white. Channels are truncated, and the result is uppercase.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blend_with_white(hex: &str, t: f64) -> Option<String> {
    let rgb = parse_hex(hex)?;
    let t = t.clamp(0.0, 1.0);
    let [r, g, b] = rgb.map(|c| {
        let c = f64::from(c);
        (c + (255.0 - c) * (1.0 - t)) as u8
    });
    Some(format!("#{r:02X}{g:02X}{b:02X}"))
}

/// Green/amber/red band scale over district counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountBandScale {
    min: f64,
    max: f64,
    low_cut: f64,
    high_cut: f64,
}

impl CountBandScale {
    /// Builds the scale from every district's count. Returns `None` for
    /// an empty input.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(counts: &[usize]) -> Option<Self> {
        let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        Some(Self {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            low_cut: quantile(&values, 1.0 / 3.0)?,
            high_cut: quantile(&values, 2.0 / 3.0)?,
        })
    }

    /// Color for one district count.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn color(&self, count: usize) -> String {
        let count = count as f64;
        let (base, band_min, band_max) = if count <= self.low_cut {
            (BAND_LOW, self.min, self.low_cut)
        } else if count <= self.high_cut {
            (BAND_MID, self.low_cut, self.high_cut)
        } else {
            (BAND_HIGH, self.high_cut, self.max)
        };

        let t_local = if (band_max - band_min).abs() < f64::EPSILON {
            0.0
        } else {
            (count - band_min) / (band_max - band_min)
        };
        let ratio = 0.6f64.mul_add(t_local, 0.2);

        blend_with_white(base, ratio).unwrap_or_else(|| base.to_string())
    }
}

/// Linear color ramp scaled to a value range.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearColormap {
    colors: Vec<[u8; 3]>,
    min: f64,
    max: f64,
}

impl LinearColormap {
    /// `YlGnBu` ramp over `[min, max]`.
    #[must_use]
    pub fn yl_gn_bu(min: f64, max: f64) -> Self {
        Self {
            colors: YL_GN_BU_9.iter().filter_map(|c| parse_hex(c)).collect(),
            min,
            max,
        }
    }

    /// Ramp fitted to the finite values in `values`. Returns `None` if
    /// there are none.
    #[must_use]
    pub fn fit(values: &[f64]) -> Option<Self> {
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold(None, |acc: Option<(f64, f64)>, v| {
            Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
        })?;
        Some(Self::yl_gn_bu(min, max))
    }

    /// Color for `value`, clamped to the ramp's range. A degenerate range
    /// maps everything to the first color.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn color(&self, value: f64) -> String {
        if self.colors.is_empty() || !value.is_finite() {
            return NO_DATA.to_string();
        }
        let last = self.colors.len() - 1;
        let span = self.max - self.min;
        let position = if span <= 0.0 {
            0.0
        } else {
            ((value - self.min) / span).clamp(0.0, 1.0) * last as f64
        };

        let lower = (position.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let frac = position - lower as f64;

        let a = self.colors[lower];
        let b = self.colors[upper];
        let mut rgb = [0u8; 3];
        for i in 0..3 {
            let (ca, cb) = (f64::from(a[i]), f64::from(b[i]));
            rgb[i] = (cb - ca).mul_add(frac, ca).round().clamp(0.0, 255.0) as u8;
        }
        format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
    }
}
