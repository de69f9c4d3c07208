use geo::{Coord, Rect};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(pub u32);

impl Crs {
    pub const WGS84: Crs = Crs(4326);
    pub const NZGD2000: Crs = Crs(4167);
    pub const NZTM: Crs = Crs(2193);
    pub const WEB_MERCATOR: Crs = Crs(3857);

    #[inline] pub fn epsg(&self) -> u32 { self.0 }

    /// Geographic systems take degrees in and out of PROJ.4 as radians.
    #[inline] pub fn is_geographic(&self) -> bool { matches!(self.0, 4326 | 4167) }

    fn proj4_string(&self) -> Result<&'static str> {
        Ok(match self.0 {
            4326 => "+proj=longlat +datum=WGS84 +no_defs +type=crs",
            4167 => "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs +type=crs",
            2193 => "+proj=tmerc +lat_0=0 +lon_0=173 +k=0.9996 +x_0=1600000 +y_0=10000000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs +type=crs",
            3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs +type=crs",
            epsg => return Err(Error::Projection(format!("unsupported CRS EPSG:{epsg}"))),
        })
    }

    fn proj(&self) -> Result<Proj4> {
        let proj_string = self.proj4_string()?;
        Proj4::from_proj_string(proj_string)
            .map_err(|e| Error::Projection(format!("failed to build PROJ.4 '{proj_string}': {e}")))
    }
}

/// A rectangle together with the CRS its coordinates are expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencedRect {
    pub rect: Rect<f64>,
    pub crs: Crs,
}

impl ReferencedRect {
    pub fn new(rect: Rect<f64>, crs: Crs) -> Self { Self { rect, crs } }

    /// Bounding rectangle of this rectangle reprojected into `target`.
    ///
    /// Corners and edge midpoints are transformed, so curved edges in the
    /// target system are approximated by the envelope of eight points.
    pub fn transform_to(&self, target: Crs) -> Result<Rect<f64>> {
        if self.crs == target { return Ok(self.rect) }

        let (from, to) = (self.crs.proj()?, target.proj()?);
        let (min, max, center) = (self.rect.min(), self.rect.max(), self.rect.center());
        let samples = [
            (min.x, min.y), (center.x, min.y), (max.x, min.y),
            (max.x, center.y), (max.x, max.y), (center.x, max.y),
            (min.x, max.y), (min.x, center.y),
        ];

        let mut out = Vec::with_capacity(samples.len());
        for (x, y) in samples {
            let mut point = if self.crs.is_geographic() { (x.to_radians(), y.to_radians(), 0.0) } else { (x, y, 0.0) };
            transform(&from, &to, &mut point)
                .map_err(|e| Error::Projection(format!("CRS transform failed: {e}")))?;
            out.push(if target.is_geographic() {
                Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
            } else {
                Coord { x: point.0, y: point.1 }
            });
        }

        let (lo, hi) = out.iter().fold(
            (Coord { x: f64::INFINITY, y: f64::INFINITY }, Coord { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY }),
            |(lo, hi), c| (Coord { x: lo.x.min(c.x), y: lo.y.min(c.y) }, Coord { x: hi.x.max(c.x), y: hi.y.max(c.y) }),
        );
        Ok(Rect::new(lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    #[test]
    fn same_crs_is_identity() {
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 });
        assert_eq!(ReferencedRect::new(rect, Crs::NZTM).transform_to(Crs::NZTM).unwrap(), rect);
    }

    #[test]
    fn unsupported_crs_fails() {
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 });
        assert!(matches!(
            ReferencedRect::new(rect, Crs(9999)).transform_to(Crs::NZTM),
            Err(Error::Projection(_))
        ));
    }

    #[test]
    fn wellington_lands_near_its_nztm_position() {
        // Wellington is roughly (174.78 E, 41.29 S), about (1748700, 5428000) in NZTM.
        let rect = Rect::new(coord! { x: 174.77, y: -41.30 }, coord! { x: 174.79, y: -41.28 });
        let nztm = ReferencedRect::new(rect, Crs::WGS84).transform_to(Crs::NZTM).unwrap();
        let center = nztm.center();
        assert!((center.x - 1_748_700.0).abs() < 2_000.0, "x = {}", center.x);
        assert!((center.y - 5_428_000.0).abs() < 2_000.0, "y = {}", center.y);
        assert!(nztm.width() > 1_000.0 && nztm.width() < 2_500.0);
    }
}
