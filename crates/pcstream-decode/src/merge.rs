//! Concatenate decoded tiles into a single cloud.

use crate::bounds::{BoundingSphere, Bounds};
use crate::buffers::TileBuffers;

/// All decoded tiles of a load, flattened into one set of arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedCloud {
    pub positions: Vec<f64>,
    pub colors: Option<Vec<f32>>,
    pub intensity: Option<Vec<f32>>,
    pub classification: Option<Vec<u8>>,
    /// Box around the merged positions.
    pub bounds: Bounds,
    pub sphere: BoundingSphere,
}

impl MergedCloud {
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Merge tiles field by field.
///
/// A field is included when at least one tile produced it; tiles without
/// it contribute zeros so the arrays stay parallel. Returns `None` when
/// there are no points at all.
#[must_use]
pub fn merge_tiles(tiles: &[TileBuffers]) -> Option<MergedCloud> {
    let total: usize = tiles.iter().map(TileBuffers::len).sum();
    if total == 0 {
        return None;
    }

    let mut positions = Vec::with_capacity(total * 3);
    let mut colors = tiles
        .iter()
        .any(|t| t.colors.is_some())
        .then(|| Vec::with_capacity(total * 3));
    let mut intensity = tiles
        .iter()
        .any(|t| t.intensity.is_some())
        .then(|| Vec::with_capacity(total));
    let mut classification = tiles
        .iter()
        .any(|t| t.classification.is_some())
        .then(|| Vec::with_capacity(total));

    for tile in tiles {
        let n = tile.len();
        positions.extend_from_slice(&tile.positions);
        append(&mut colors, tile.colors.as_deref(), n * 3);
        append(&mut intensity, tile.intensity.as_deref(), n);
        append(&mut classification, tile.classification.as_deref(), n);
    }

    let bounds = Bounds::from_positions(&positions)?;
    let sphere = BoundingSphere::from_positions(&positions, &bounds);
    Some(MergedCloud {
        positions,
        colors,
        intensity,
        classification,
        bounds,
        sphere,
    })
}

fn append<T: Copy + Default>(out: &mut Option<Vec<T>>, values: Option<&[T]>, len: usize) {
    if let Some(out) = out {
        match values {
            Some(values) => out.extend_from_slice(values),
            None => out.resize(out.len() + len, T::default()),
        }
    }
}
