//! Load configuration.

use pcstream_decode::{DecodeOptions, MAX_DEPTH, Stride};
use serde::{Deserialize, Serialize};

/// Recognized load options. Out-of-range values are clamped by
/// [`LoadOptions::normalized`], which every load applies first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadOptions {
    /// Deepest hierarchy level to load, `0..=8`.
    pub depth: u8,
    /// Keep every `stride`-th point, `1..=100`.
    pub stride: u32,
    pub color: bool,
    pub intensity: bool,
    pub classification: bool,
    /// Intensity gamma factor, `0.1..=2.0`.
    pub gamma: f32,
    /// Modulate colors by intensity.
    pub blend_intensity: bool,
    /// Maximum simultaneous tile fetches.
    pub concurrency: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            depth: 0,
            stride: 1,
            color: true,
            intensity: true,
            classification: true,
            gamma: 1.0,
            blend_intensity: false,
            concurrency: 4,
        }
    }
}

impl LoadOptions {
    #[must_use]
    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, color: bool, intensity: bool, classification: bool) -> Self {
        self.color = color;
        self.intensity = intensity;
        self.classification = classification;
        self
    }

    #[must_use]
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    #[must_use]
    pub fn with_blend_intensity(mut self, blend: bool) -> Self {
        self.blend_intensity = blend;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Clamp every option into its accepted range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let decode = self.decode_options();
        self.depth = self.depth.min(MAX_DEPTH);
        self.stride = decode.stride.get();
        self.gamma = decode.gamma;
        self.concurrency = self.concurrency.max(1);
        self
    }

    /// The per-record decoding subset of these options.
    #[must_use]
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            stride: Stride::new(self.stride),
            color: self.color,
            intensity: self.intensity,
            classification: self.classification,
            gamma: self.gamma,
            blend_intensity: self.blend_intensity,
        }
        .normalized()
    }
}
