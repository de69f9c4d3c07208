use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// GeoJSON `MultiPolygon` geometry object for `shape`.
pub fn to_geometry(shape: &MultiPolygon<f64>) -> Value {
    let polygons = shape.0.iter()
        .map(|polygon| {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

/// Parse a GeoJSON `Polygon` or `MultiPolygon` geometry object.
pub fn from_geometry(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coordinates = geometry["coordinates"].as_array()
        .ok_or_else(|| invalid("geometry has no coordinates"))?;
    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon(vec![parse_polygon(coordinates)?])),
        Some("MultiPolygon") => Ok(MultiPolygon(coordinates.iter()
            .map(|polygon| polygon.as_array()
                .ok_or_else(|| invalid("polygon is not an array"))
                .and_then(|rings| parse_polygon(rings)))
            .collect::<Result<_>>()?)),
        Some(other) => Err(invalid(&format!("unsupported geometry type {other}"))),
        None => Err(invalid("geometry has no type")),
    }
}

/// A `FeatureCollection` built from property maps and optional geometries.
pub fn feature_collection<'a>(features: impl IntoIterator<Item = (Map<String, Value>, Option<&'a MultiPolygon<f64>>)>) -> Value {
    let features = features.into_iter()
        .map(|(properties, geometry)| json!({
            "type": "Feature",
            "geometry": geometry.map_or(Value::Null, to_geometry),
            "properties": properties,
        }))
        .collect::<Vec<_>>();

    json!({ "type": "FeatureCollection", "features": features })
}

fn invalid(message: &str) -> Error {
    Error::consistency(format!("invalid GeoJSON: {message}"))
}

/// Rings of one polygon: exterior first, then holes.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        ring.as_array()
            .ok_or_else(|| invalid("ring is not an array"))
            .and_then(|coords| parse_ring(coords))
    });
    let exterior = rings.next().ok_or_else(|| invalid("polygon without an exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(invalid("coordinate is not numeric")),
            },
            _ => Err(invalid("coordinate needs two values")),
        })
        .collect::<Result<Vec<_>>>()?;

    // Ensure ring is closed
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first) }
    }
    Ok(LineString(points))
}

/// Serde adapter storing a `MultiPolygon` as a GeoJSON geometry object.
pub mod multipolygon {
    use geo::MultiPolygon;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(shape: &MultiPolygon<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        super::to_geometry(shape).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MultiPolygon<f64>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        super::from_geometry(&value).map_err(D::Error::custom)
    }
}

/// As [`multipolygon`], for optional geometries stored as `null`.
pub mod optional {
    use geo::MultiPolygon;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(shape: &Option<MultiPolygon<f64>>, serializer: S) -> Result<S::Ok, S::Error> {
        shape.as_ref().map(super::to_geometry).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<MultiPolygon<f64>>, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(None),
            value => super::from_geometry(&value).map(Some).map_err(D::Error::custom),
        }
    }
}
