//! Decoded attribute buffers.

use crate::bounds::Bounds;
use crate::decimate::Stride;

/// Which attributes to decode and how to shape them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    pub stride: Stride,
    pub color: bool,
    pub intensity: bool,
    pub classification: bool,
    /// Exponent applied to normalized intensity, clamped to `0.1..=2.0`.
    pub gamma: f32,
    /// Multiply color channels by the point's intensity.
    pub blend_intensity: bool,
}

impl DecodeOptions {
    pub const MIN_GAMMA: f32 = 0.1;
    pub const MAX_GAMMA: f32 = 2.0;

    /// Clamp the gamma factor into its accepted range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.gamma = if self.gamma.is_nan() {
            1.0
        } else {
            self.gamma.clamp(Self::MIN_GAMMA, Self::MAX_GAMMA)
        };
        self
    }

    #[inline]
    pub(crate) fn shape_intensity(&self, normalized: f32) -> f32 {
        let v = normalized.clamp(0.0, 1.0);
        if (self.gamma - 1.0).abs() < f32::EPSILON {
            v
        } else {
            v.powf(self.gamma)
        }
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            stride: Stride::ALL,
            color: true,
            intensity: true,
            classification: true,
            gamma: 1.0,
            blend_intensity: false,
        }
    }
}

/// Parallel attribute arrays for one decoded tile.
///
/// Every present array holds exactly [`TileBuffers::len`] points.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBuffers {
    /// Interleaved `xyz`, three values per point.
    pub positions: Vec<f64>,
    /// Interleaved `rgb` in `0..=1`, three values per point.
    pub colors: Option<Vec<f32>>,
    /// Normalized intensity in `0..=1`.
    pub intensity: Option<Vec<f32>>,
    pub classification: Option<Vec<u8>>,
    /// The dataset's global bounds.
    pub bounds: Bounds,
}

impl TileBuffers {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Z coordinate of every point.
    pub fn z_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.positions.chunks_exact(3).map(|p| p[2])
    }
}

/// Zero-initialized output arrays for `count` kept points.
pub(crate) struct TileWriter {
    positions: Vec<f64>,
    colors: Option<Vec<f32>>,
    intensity: Option<Vec<f32>>,
    classification: Option<Vec<u8>>,
}

impl TileWriter {
    pub(crate) fn new(count: usize, color: bool, intensity: bool, classification: bool) -> Self {
        Self {
            positions: vec![0.0; count * 3],
            colors: color.then(|| vec![0.0; count * 3]),
            intensity: intensity.then(|| vec![0.0; count]),
            classification: classification.then(|| vec![0; count]),
        }
    }

    #[inline]
    pub(crate) fn set_position(&mut self, point: usize, axis: usize, value: f64) {
        self.positions[point * 3 + axis] = value;
    }

    #[inline]
    pub(crate) fn set_color(&mut self, point: usize, channel: usize, value: f32) {
        if let Some(colors) = &mut self.colors {
            colors[point * 3 + channel] = value;
        }
    }

    #[inline]
    pub(crate) fn set_intensity(&mut self, point: usize, value: f32) {
        if let Some(intensity) = &mut self.intensity {
            intensity[point] = value;
        }
    }

    #[inline]
    pub(crate) fn set_classification(&mut self, point: usize, value: u8) {
        if let Some(classification) = &mut self.classification {
            classification[point] = value;
        }
    }

    /// Scale the point's color channels by `factor`.
    #[inline]
    pub(crate) fn modulate_color(&mut self, point: usize, factor: f32) {
        if let Some(colors) = &mut self.colors {
            for channel in &mut colors[point * 3..point * 3 + 3] {
                *channel *= factor;
            }
        }
    }

    pub(crate) fn finish(self, bounds: Bounds) -> TileBuffers {
        TileBuffers {
            positions: self.positions,
            colors: self.colors,
            intensity: self.intensity,
            classification: self.classification,
            bounds,
        }
    }
}
