//! Axis-aligned bounds and bounding spheres.

use glam::DVec3;

/// Axis-aligned bounding box in dataset coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: DVec3,
    pub max: DVec3,
}

impl Bounds {
    #[must_use]
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Bounds that contain nothing; the first `extend` sets both corners.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: DVec3::INFINITY,
            max: DVec3::NEG_INFINITY,
        }
    }

    /// Build from a `[min_x, min_y, min_z, max_x, max_y, max_z]` array.
    #[must_use]
    pub fn from_array(values: [f64; 6]) -> Self {
        Self::new(
            DVec3::new(values[0], values[1], values[2]),
            DVec3::new(values[3], values[4], values[5]),
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn extend(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Bounds of an interleaved `xyz` position array, `None` if it is empty.
    #[must_use]
    pub fn from_positions(positions: &[f64]) -> Option<Self> {
        let mut bounds = Self::empty();
        for p in positions.chunks_exact(3) {
            bounds.extend(DVec3::new(p[0], p[1], p[2]));
        }
        (!bounds.is_empty()).then_some(bounds)
    }

    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }
}

/// Sphere enclosing a set of positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    /// Sphere centered on the box of `positions`, with the radius reaching the
    /// farthest point.
    #[must_use]
    pub fn from_positions(positions: &[f64], bounds: &Bounds) -> Self {
        let center = bounds.center();
        let radius_squared = positions
            .chunks_exact(3)
            .map(|p| DVec3::new(p[0], p[1], p[2]).distance_squared(center))
            .fold(0.0_f64, f64::max);
        Self {
            center,
            radius: radius_squared.sqrt(),
        }
    }
}
