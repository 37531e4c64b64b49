//! Axis-aligned bounding boxes and the metrics derived from them

use cgmath::{InnerSpace, Vector3, Zero};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Box around a set of points; a zero-size box at the origin when empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        let mut min = Vector3::new(first[0], first[1], first[2]);
        let mut max = min;

        for p in iter {
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);
            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }

        Self::new(min, max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Largest extent along any axis
    pub fn max_dimension(&self) -> f32 {
        let size = self.size();
        size.x.max(size.y).max(size.z)
    }

    /// Length of the min-max diagonal
    pub fn diagonal(&self) -> f32 {
        self.size().magnitude()
    }

    pub fn metrics(&self) -> BoundingMetrics {
        BoundingMetrics {
            aabb: *self,
            center: self.center(),
            size: self.size(),
            max_dimension: self.max_dimension(),
            diagonal: self.diagonal(),
        }
    }
}

/// Bounding data captured for a loaded asset, in the asset's own units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingMetrics {
    pub aabb: Aabb,
    pub center: Vector3<f32>,
    pub size: Vector3<f32>,
    pub max_dimension: f32,
    pub diagonal: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_creation() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 2.0, 1.0], [-1.0, -1.0, -3.0]];
        let aabb = Aabb::from_points(&points);

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -3.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 2.0, 1.0));
        assert_relative_eq!(aabb.max_dimension(), 4.0);
        assert_eq!(aabb.center(), Vector3::new(0.0, 0.5, -1.0));
    }

    #[test]
    fn test_empty_aabb_is_degenerate() {
        let aabb = Aabb::from_points(&Vec::<[f32; 3]>::new());
        assert_eq!(aabb.max_dimension(), 0.0);
        assert_eq!(aabb.diagonal(), 0.0);
    }
}
