use geo::{BoundingRect, Contains, InteriorPoint, Intersects, MultiPolygon, Point, Rect};
use rstar::{RTree, AABB};

use crate::bbox::{envelope_of, BoundingBox};

/// A point-on-surface for `shape`, guaranteed to lie inside it.
/// Returns `None` for empty or degenerate geometries.
#[inline]
pub fn point_on_surface(shape: &MultiPolygon<f64>) -> Option<Point<f64>> {
    shape.interior_point()
}

/// A set of geometries indexed for repeated point and rectangle lookups.
#[derive(Debug, Clone)]
pub struct PreparedIndex {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl PreparedIndex {
    /// Index a list of geometries; lookups report positions in this list.
    /// Geometries without a bounding box (empty) are never matched.
    pub fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            shapes,
        }
    }

    /// Get the number of indexed geometries.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no geometries.
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get the geometry stored at `idx`.
    #[inline] pub fn shape(&self, idx: usize) -> Option<&MultiPolygon<f64>> { self.shapes.get(idx) }

    /// Lowest index whose geometry contains `point` (first match wins).
    pub fn locate(&self, point: Point<f64>) -> Option<usize> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(|bb| bb.idx())
            .filter(|&i| self.shapes[i].contains(&point))
            .min()
    }

    /// Sorted indices of geometries intersecting `rect`.
    pub fn intersecting(&self, rect: &Rect<f64>) -> Vec<usize> {
        let polygon = rect.to_polygon();
        let mut hits = self.rtree.locate_in_envelope_intersecting(&envelope_of(rect))
            .map(|bb| bb.idx())
            .filter(|&i| self.shapes[i].intersects(&polygon))
            .collect::<Vec<_>>();
        hits.sort_unstable();
        hits
    }
}
