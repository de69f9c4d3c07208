use geo::{Area, Coord, LineString, MultiPolygon, Polygon};
use rstar::RTree;

/// Snap near-coincident vertices across all `polygons` to a canonical
/// position, repairing floating-point artefacts along shared boundaries.
///
/// The first vertex seen within `tolerance` of a location becomes the anchor
/// for that location; later vertices within `tolerance` of it are moved onto
/// it. Rings that collapse (fewer than three distinct vertices or zero area)
/// are removed, and a polygon whose exterior collapses is removed entirely,
/// so the output may contain empty `MultiPolygon`s.
///
/// A non-positive `tolerance` returns the input unchanged.
pub fn snap_vertices(polygons: &[MultiPolygon<f64>], tolerance: f64) -> Vec<MultiPolygon<f64>> {
    if tolerance <= 0.0 || !tolerance.is_finite() { return polygons.to_vec() }

    let tol2 = tolerance * tolerance;
    let mut anchors: RTree<[f64; 2]> = RTree::new();

    polygons.iter()
        .map(|shape| {
            MultiPolygon(shape.0.iter()
                .filter_map(|polygon| snap_polygon(polygon, &mut anchors, tol2))
                .collect())
        })
        .collect()
}

fn snap_polygon(polygon: &Polygon<f64>, anchors: &mut RTree<[f64; 2]>, tol2: f64) -> Option<Polygon<f64>> {
    let exterior = snap_ring(polygon.exterior(), anchors, tol2)?;
    let interiors = polygon.interiors().iter()
        .filter_map(|ring| snap_ring(ring, anchors, tol2))
        .collect();
    Some(Polygon::new(exterior, interiors))
}

fn snap_ring(ring: &LineString<f64>, anchors: &mut RTree<[f64; 2]>, tol2: f64) -> Option<LineString<f64>> {
    let coords = ring.coords()
        .map(|&coord| snap_coord(coord, anchors, tol2))
        .collect();
    clean_ring(coords)
}

fn snap_coord(coord: Coord<f64>, anchors: &mut RTree<[f64; 2]>, tol2: f64) -> Coord<f64> {
    let point = [coord.x, coord.y];
    if let Some(anchor) = anchors.nearest_neighbor(&point) {
        let (dx, dy) = (anchor[0] - point[0], anchor[1] - point[1]);
        if dx * dx + dy * dy <= tol2 {
            return Coord { x: anchor[0], y: anchor[1] }
        }
    }
    anchors.insert(point);
    coord
}

/// Drop repeated vertices and re-close the ring; `None` if nothing with area is left.
pub(crate) fn clean_ring(coords: Vec<Coord<f64>>) -> Option<LineString<f64>> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(coords.len() + 1);
    for coord in coords {
        if out.last() != Some(&coord) { out.push(coord) }
    }
    if let (Some(&first), Some(&last)) = (out.first(), out.last()) {
        if first != last { out.push(first) }
    }
    if out.len() < 4 { return None }

    let ring = LineString::from(out);
    (Polygon::new(ring.clone(), vec![]).unsigned_area() > 0.0).then_some(ring)
}
