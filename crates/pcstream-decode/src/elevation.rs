//! Percentile elevation reference.

/// Robust elevation range used to normalize height-based coloring.
///
/// Computed once from the root tile and shared read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationReference {
    /// 1st percentile of Z.
    pub p1: f64,
    /// 99th percentile of Z.
    pub p99: f64,
    /// `p99 - p1`, floored to 1.0.
    pub range: f64,
}

impl ElevationReference {
    /// Minimum range, so normalization never divides by zero.
    pub const MIN_RANGE: f64 = 1.0;

    /// Build from a set of Z values using sorted-order percentiles.
    pub fn from_z(values: impl IntoIterator<Item = f64>) -> Self {
        let mut z: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if z.is_empty() {
            return Self::from_extent(0.0, 0.0);
        }
        z.sort_unstable_by(f64::total_cmp);

        let at = |fraction: f64| {
            let index = (z.len() as f64 * fraction).floor() as usize;
            z[index.min(z.len() - 1)]
        };
        Self::from_extent(at(0.01), at(0.99))
    }

    /// Build from a known low/high pair.
    #[must_use]
    pub fn from_extent(low: f64, high: f64) -> Self {
        let (p1, p99) = if low <= high { (low, high) } else { (high, low) };
        Self {
            p1,
            p99,
            range: (p99 - p1).max(Self::MIN_RANGE),
        }
    }

    /// Map `z` into `0..=1` relative to the reference.
    #[must_use]
    pub fn normalize(&self, z: f64) -> f32 {
        ((z - self.p1) / self.range).clamp(0.0, 1.0) as f32
    }
}
