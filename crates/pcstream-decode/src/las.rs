//! Fixed-layout LAS point records.
//!
//! Every LAS point format starts with three scaled `i32` coordinates and a
//! `u16` intensity. Classification and color sit at format-dependent
//! offsets.

use glam::DVec3;

use crate::bounds::Bounds;
use crate::buffers::{DecodeOptions, TileBuffers, TileWriter};
use crate::bytes::{i32_at, u8_at, u16_at};
use crate::error::{DecodeError, DecodeResult};
use crate::header::LasHeader;

/// Point formats that carry RGB.
pub const COLOR_FORMATS: [u8; 6] = [2, 3, 5, 7, 8, 10];

/// Smallest legal record length per point format.
const MIN_RECORD_LENGTH: [u16; 11] = [20, 28, 26, 34, 57, 63, 30, 36, 38, 59, 67];

const INTENSITY_OFFSET: usize = 12;

/// Record layout and coordinate transform of a LAS point stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LasLayout {
    pub point_format: u8,
    pub record_length: u16,
    pub scale: DVec3,
    pub offset: DVec3,
}

impl LasLayout {
    pub fn new(
        point_format: u8,
        record_length: u16,
        scale: DVec3,
        offset: DVec3,
    ) -> DecodeResult<Self> {
        if record_length == 0 {
            return Err(DecodeError::ZeroStride);
        }
        let minimum = *MIN_RECORD_LENGTH
            .get(usize::from(point_format))
            .ok_or(DecodeError::UnsupportedPointFormat(point_format))?;
        if record_length < minimum {
            return Err(DecodeError::RecordTooShort {
                format: point_format,
                record_length,
                minimum,
            });
        }
        Ok(Self {
            point_format,
            record_length,
            scale,
            offset,
        })
    }

    pub fn from_header(header: &LasHeader) -> DecodeResult<Self> {
        Self::new(header.point_format, header.record_length, header.scale, header.offset)
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        usize::from(self.record_length)
    }

    #[must_use]
    pub fn has_color(&self) -> bool {
        COLOR_FORMATS.contains(&self.point_format)
    }

    #[must_use]
    pub fn color_offset(&self) -> usize {
        if self.point_format >= 6 { 30 } else { 20 }
    }

    #[must_use]
    pub fn classification_offset(&self) -> usize {
        if self.point_format >= 6 { 16 } else { 15 }
    }

    /// Number of whole records in `bytes`.
    #[must_use]
    pub fn record_count(&self, bytes: &[u8]) -> usize {
        bytes.len() / self.stride()
    }
}

/// Decode the kept records of a raw LAS point buffer.
///
/// Trailing bytes that do not form a whole record are ignored. A color
/// channel that would read past the end of the buffer is left at zero.
pub fn decode_las_records(
    bytes: &[u8],
    layout: &LasLayout,
    options: &DecodeOptions,
    bounds: Bounds,
) -> DecodeResult<TileBuffers> {
    let stride = layout.stride();
    let total = layout.record_count(bytes);
    let kept = options.stride.kept_count(total);

    let with_color = options.color && layout.has_color();
    let mut out = TileWriter::new(kept, with_color, options.intensity, options.classification);

    let color_at = layout.color_offset();
    let class_at = layout.classification_offset();
    let legacy_class = layout.point_format < 6;
    let scale = layout.scale.to_array();
    let offset = layout.offset.to_array();

    for (point, index) in options.stride.indices(total).enumerate() {
        let base = index * stride;

        for axis in 0..3 {
            let at = base + axis * 4;
            let raw = i32_at(bytes, at).ok_or(DecodeError::Truncated {
                offset: at,
                needed: 4,
                available: bytes.len(),
            })?;
            out.set_position(point, axis, f64::from(raw) * scale[axis] + offset[axis]);
        }

        let intensity = u16_at(bytes, base + INTENSITY_OFFSET)
            .map_or(0.0, |raw| options.shape_intensity(f32::from(raw) / 65535.0));
        out.set_intensity(point, intensity);

        if options.classification {
            let raw = u8_at(bytes, base + class_at).unwrap_or(0);
            out.set_classification(point, if legacy_class { raw & 0x1f } else { raw });
        }

        if with_color {
            for channel in 0..3 {
                if let Some(raw) = u16_at(bytes, base + color_at + channel * 2) {
                    out.set_color(point, channel, f32::from(raw) / 65535.0);
                }
            }
            if options.blend_intensity {
                out.modulate_color(point, intensity);
            }
        }
    }

    Ok(out.finish(bounds))
}
