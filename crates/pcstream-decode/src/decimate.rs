//! Sequential decimation.

use crate::MAX_STRIDE;

/// Keep every `n`-th source record by sequential index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stride(u32);

impl Stride {
    /// Keep every record.
    pub const ALL: Self = Self(1);

    /// Create a stride clamped to `1..=100`.
    #[must_use]
    pub fn new(stride: u32) -> Self {
        Self(stride.clamp(1, MAX_STRIDE))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Number of records kept out of `total`: `ceil(total / stride)`.
    #[must_use]
    pub fn kept_count(self, total: usize) -> usize {
        total.div_ceil(self.0 as usize)
    }

    /// Source record indices kept out of `total`.
    pub fn indices(self, total: usize) -> impl Iterator<Item = usize> {
        (0..total).step_by(self.0 as usize)
    }
}

impl Default for Stride {
    fn default() -> Self {
        Self::ALL
    }
}
