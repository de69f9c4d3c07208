use geo::{Area, BooleanOps, BoundingRect, CoordsIter, MultiPolygon, Polygon};

use crate::{error::CoverageError, snap::snap_vertices};

/// Default vertex snapping tolerance, in layer units (metres for projected layers).
pub const DEFAULT_TOLERANCE: f64 = 0.005;

/// Parameters for [`union_coverage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnionOptions {
    /// Vertices closer than this are merged before the union, and holes
    /// smaller than `tolerance²` are removed from the result.
    pub tolerance: f64,
}

impl Default for UnionOptions {
    fn default() -> Self {
        Self { tolerance: DEFAULT_TOLERANCE }
    }
}

impl UnionOptions {
    pub fn with_tolerance(tolerance: f64) -> Self { Self { tolerance } }
}

/// Check that a single input has finite coordinates and a positive area.
fn validate(index: usize, shape: &MultiPolygon<f64>) -> Result<(), CoverageError> {
    if shape.0.is_empty() {
        return Err(CoverageError::Degenerate { index, reason: "empty geometry" })
    }
    if shape.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(CoverageError::Degenerate { index, reason: "non-finite coordinate" })
    }
    if shape.unsigned_area() <= 0.0 {
        return Err(CoverageError::Degenerate { index, reason: "zero area" })
    }
    Ok(())
}

/// Union a set of polygonal regions into a minimal, non-overlapping MultiPolygon.
///
/// Adjacent or overlapping inputs merge into one member; disjoint inputs stay
/// separate members. Inputs are validated, snapped (see [`snap_vertices`]) and
/// then merged pairwise in a balanced tree.
pub fn union_coverage(shapes: &[MultiPolygon<f64>], options: &UnionOptions) -> Result<MultiPolygon<f64>, CoverageError> {
    if shapes.is_empty() { return Err(CoverageError::EmptyInput) }
    for (index, shape) in shapes.iter().enumerate() {
        validate(index, shape)?;
    }

    let mut parts = snap_vertices(shapes, options.tolerance).into_iter()
        .filter(|shape| !shape.0.is_empty())
        .collect::<Vec<_>>();
    if parts.is_empty() { return Err(CoverageError::EmptyResult) }

    // Balanced pairwise reduction keeps intermediate results small.
    while parts.len() > 1 {
        parts = parts.chunks(2)
            .filter_map(|pair| pair.iter().cloned().reduce(|a, b| a.union(&b)))
            .collect();
    }

    let merged = parts.pop().ok_or(CoverageError::EmptyResult)?;
    let cleaned = remove_slivers(merged, options.tolerance);
    if cleaned.0.is_empty() { return Err(CoverageError::EmptyResult) }

    Ok(cleaned)
}

/// Drop zero-area members and holes smaller than `tolerance²`.
fn remove_slivers(shape: MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    let min_hole_area = tolerance * tolerance;
    MultiPolygon(shape.0.into_iter()
        .filter(|polygon| polygon.unsigned_area() > 0.0)
        .map(|polygon| {
            let (exterior, interiors) = polygon.into_inner();
            let interiors = interiors.into_iter()
                .filter(|ring| Polygon::new(ring.clone(), vec![]).unsigned_area() >= min_hole_area)
                .collect();
            Polygon::new(exterior, interiors)
        })
        .collect())
}

/// Split a union into its connected parts, in a deterministic order
/// (bounding-box min corner, then area).
pub fn regions(shape: &MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    fn key(polygon: &Polygon<f64>) -> (f64, f64, f64) {
        let min = polygon.bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y))
            .unwrap_or((f64::INFINITY, f64::INFINITY));
        (min.0, min.1, polygon.unsigned_area())
    }

    let mut parts = shape.0.clone();
    parts.sort_by(|a, b| {
        let (ka, kb) = (key(a), key(b));
        ka.0.total_cmp(&kb.0)
            .then_with(|| ka.1.total_cmp(&kb.1))
            .then_with(|| ka.2.total_cmp(&kb.2))
    });
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Rect, coord};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()])
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(union_coverage(&[], &UnionOptions::default()), Err(CoverageError::EmptyInput));
    }

    #[test]
    fn empty_member_fails() {
        let err = union_coverage(&[rect(0.0, 0.0, 1.0, 1.0), MultiPolygon(vec![])], &UnionOptions::default());
        assert_eq!(err, Err(CoverageError::Degenerate { index: 1, reason: "empty geometry" }));
    }

    #[test]
    fn zero_area_member_fails() {
        let flat = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)]]);
        assert!(matches!(
            union_coverage(&[flat], &UnionOptions::default()),
            Err(CoverageError::Degenerate { index: 0, .. })
        ));
    }

    #[test]
    fn adjacent_squares_merge() {
        let merged = union_coverage(&[rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 2.0, 1.0)], &UnionOptions::default()).unwrap();
        assert_eq!(merged.0.len(), 1);
        assert!((merged.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_squares_stay_separate() {
        let merged = union_coverage(&[rect(0.0, 0.0, 1.0, 1.0), rect(5.0, 0.0, 6.0, 1.0)], &UnionOptions::default()).unwrap();
        assert_eq!(merged.0.len(), 2);
    }

    #[test]
    fn near_coincident_boundary_leaves_no_gap() {
        let merged = union_coverage(&[rect(0.0, 0.0, 1.0, 1.0), rect(1.002, 0.0, 2.0, 1.0)], &UnionOptions::default()).unwrap();
        assert_eq!(merged.0.len(), 1);
        assert!(merged.0[0].interiors().is_empty());
    }

    #[test]
    fn regions_are_ordered_by_position() {
        let merged = union_coverage(&[rect(5.0, 0.0, 6.0, 1.0), rect(0.0, 0.0, 1.0, 1.0)], &UnionOptions::default()).unwrap();
        let parts = regions(&merged);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].bounding_rect().unwrap().min().x, 0.0);
        assert_eq!(parts[1].bounding_rect().unwrap().min().x, 5.0);
    }
}
