//! Schema-described point records (EPT `binary` tiles).
//!
//! The schema is resolved once into a list of bindings, each mapping a byte
//! range of the record to a semantic [`Field`]. Dimensions the decoder does
//! not use are bound to [`Field::Ignored`] and only contribute to the stride.

use crate::bounds::Bounds;
use crate::buffers::{DecodeOptions, TileBuffers, TileWriter};
use crate::bytes::{
    f32_at, f64_at, i8_at, i16_at, i32_at, i64_at, u8_at, u16_at, u32_at, u64_at,
};
use crate::error::{DecodeError, DecodeResult};

/// Storage type of one schema dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl DimensionType {
    /// Resolve an EPT `type`/`size` pair (`signed`, `unsigned` or `float`).
    #[must_use]
    pub fn from_ept(kind: &str, size: usize) -> Option<Self> {
        Some(match (kind, size) {
            ("signed", 1) => Self::I8,
            ("signed", 2) => Self::I16,
            ("signed", 4) => Self::I32,
            ("signed", 8) => Self::I64,
            ("unsigned", 1) => Self::U8,
            ("unsigned", 2) => Self::U16,
            ("unsigned", 4) => Self::U32,
            ("unsigned", 8) => Self::U64,
            ("float", 4) => Self::F32,
            ("float", 8) => Self::F64,
            _ => return None,
        })
    }

    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    fn read(self, bytes: &[u8], at: usize) -> Option<f64> {
        match self {
            Self::I8 => i8_at(bytes, at).map(f64::from),
            Self::I16 => i16_at(bytes, at).map(f64::from),
            Self::I32 => i32_at(bytes, at).map(f64::from),
            Self::I64 => i64_at(bytes, at).map(|v| v as f64),
            Self::U8 => u8_at(bytes, at).map(f64::from),
            Self::U16 => u16_at(bytes, at).map(f64::from),
            Self::U32 => u32_at(bytes, at).map(f64::from),
            Self::U64 => u64_at(bytes, at).map(|v| v as f64),
            Self::F32 => f32_at(bytes, at).map(f64::from),
            Self::F64 => f64_at(bytes, at),
        }
    }
}

/// Semantic meaning of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    X,
    Y,
    Z,
    Intensity,
    Classification,
    Red,
    Green,
    Blue,
    /// Present in the record but not decoded.
    Ignored,
}

impl Field {
    /// Match a dimension name, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "x" => Self::X,
            "y" => Self::Y,
            "z" => Self::Z,
            "intensity" => Self::Intensity,
            "classification" => Self::Classification,
            "red" => Self::Red,
            "green" => Self::Green,
            "blue" => Self::Blue,
            _ => Self::Ignored,
        }
    }
}

/// One dimension of a point schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub kind: DimensionType,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
}

impl Dimension {
    /// Build from EPT schema fields.
    pub fn from_ept(
        name: &str,
        kind: &str,
        size: usize,
        scale: Option<f64>,
        offset: Option<f64>,
    ) -> DecodeResult<Self> {
        let resolved =
            DimensionType::from_ept(kind, size).ok_or_else(|| DecodeError::UnsupportedDimension {
                name: name.to_string(),
                kind: kind.to_string(),
                size,
            })?;
        Ok(Self {
            name: name.to_string(),
            kind: resolved,
            scale,
            offset,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Binding {
    field: Field,
    at: usize,
    kind: DimensionType,
    scale: f64,
    offset: f64,
}

/// A schema resolved into byte offsets and field bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaLayout {
    bindings: Vec<Binding>,
    stride: usize,
}

impl SchemaLayout {
    pub fn new(dimensions: &[Dimension]) -> DecodeResult<Self> {
        let mut at = 0;
        let mut bindings = Vec::with_capacity(dimensions.len());
        for dimension in dimensions {
            bindings.push(Binding {
                field: Field::from_name(&dimension.name),
                at,
                kind: dimension.kind,
                scale: dimension.scale.unwrap_or(1.0),
                offset: dimension.offset.unwrap_or(0.0),
            });
            at += dimension.kind.size();
        }

        if at == 0 {
            return Err(DecodeError::ZeroStride);
        }
        let layout = Self { bindings, stride: at };
        for (field, name) in [(Field::X, "X"), (Field::Y, "Y"), (Field::Z, "Z")] {
            if !layout.has(field) {
                return Err(DecodeError::MissingDimension(name));
            }
        }
        Ok(layout)
    }

    /// Bytes per record.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.bindings.iter().any(|b| b.field == field)
    }

    #[must_use]
    pub fn has_color(&self) -> bool {
        self.has(Field::Red) || self.has(Field::Green) || self.has(Field::Blue)
    }

    /// Number of whole records in `bytes`.
    #[must_use]
    pub fn record_count(&self, bytes: &[u8]) -> usize {
        bytes.len() / self.stride
    }
}

/// Normalize a color channel to `0..=1` from its storage width.
///
/// 16-bit channels holding values up to 255 were most likely written as
/// 8-bit color, so they are scaled as such.
fn normalize_color(raw: f64, kind: DimensionType) -> f32 {
    let value = match kind.size() {
        1 => raw / 255.0,
        2 if raw <= 255.0 => raw / 255.0,
        2 => raw / 65535.0,
        _ => raw,
    };
    value.clamp(0.0, 1.0) as f32
}

fn normalize_intensity(raw: f64, kind: DimensionType) -> f32 {
    let value = match kind.size() {
        1 => raw / 255.0,
        2 => raw / 65535.0,
        _ => raw,
    };
    value.clamp(0.0, 1.0) as f32
}

/// Decode the kept records of a schema-described buffer.
pub fn decode_schema_records(
    bytes: &[u8],
    layout: &SchemaLayout,
    options: &DecodeOptions,
    bounds: Bounds,
) -> DecodeResult<TileBuffers> {
    let total = layout.record_count(bytes);
    let kept = options.stride.kept_count(total);

    let with_color = options.color && layout.has_color();
    let with_intensity = options.intensity && layout.has(Field::Intensity);
    let with_class = options.classification && layout.has(Field::Classification);
    let mut out = TileWriter::new(kept, with_color, with_intensity, with_class);

    for (point, index) in options.stride.indices(total).enumerate() {
        let base = index * layout.stride;
        let mut intensity = None;

        for binding in &layout.bindings {
            let at = base + binding.at;
            let Some(raw) = binding.kind.read(bytes, at) else {
                return Err(DecodeError::Truncated {
                    offset: at,
                    needed: binding.kind.size(),
                    available: bytes.len(),
                });
            };
            match binding.field {
                Field::X => out.set_position(point, 0, raw * binding.scale + binding.offset),
                Field::Y => out.set_position(point, 1, raw * binding.scale + binding.offset),
                Field::Z => out.set_position(point, 2, raw * binding.scale + binding.offset),
                Field::Intensity => {
                    let value = options.shape_intensity(normalize_intensity(raw, binding.kind));
                    out.set_intensity(point, value);
                    intensity = Some(value);
                }
                Field::Classification => out.set_classification(point, raw.clamp(0.0, 255.0) as u8),
                Field::Red => out.set_color(point, 0, normalize_color(raw, binding.kind)),
                Field::Green => out.set_color(point, 1, normalize_color(raw, binding.kind)),
                Field::Blue => out.set_color(point, 2, normalize_color(raw, binding.kind)),
                Field::Ignored => {}
            }
        }

        if let (true, true, Some(factor)) = (with_color, options.blend_intensity, intensity) {
            out.modulate_color(point, factor);
        }
    }

    Ok(out.finish(bounds))
}
