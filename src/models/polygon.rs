//! Ring-list polygons in geographic coordinates
//!
//! Rings are explicitly closed: the first and last point are equal. The
//! conversions to and from [`geo`] types map longitude to `x` and latitude
//! to `y`.

use geo::{Area, Coord, LineString};
use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Smallest valid ring: three distinct points plus the closing point
pub const MIN_RING_POINTS: usize = 4;

/// Closed linear ring
pub type Ring = Vec<GeoPoint>;

/// Outer ring followed by optional holes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

impl Polygon {
    /// Polygon without holes
    #[must_use]
    pub fn from_exterior(exterior: Ring) -> Self {
        Self {
            rings: vec![exterior],
        }
    }

    #[must_use]
    pub fn exterior(&self) -> Option<&Ring> {
        self.rings.first()
    }

    #[must_use]
    pub fn interiors(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or_default()
    }

    /// Every ring is closed, long enough and has finite coordinates
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.rings.is_empty()
            && self.rings.iter().all(|ring| {
                ring.len() >= MIN_RING_POINTS
                    && ring.first() == ring.last()
                    && ring.iter().all(GeoPoint::is_finite)
            })
    }

    /// Area in square degrees, holes subtracted
    #[must_use]
    pub fn planar_area(&self) -> f64 {
        geo::Polygon::from(self).unsigned_area()
    }

    pub fn points(&self) -> impl Iterator<Item = &GeoPoint> {
        self.rings.iter().flatten()
    }
}

/// Possibly disconnected region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygon {
    pub polygons: Vec<Polygon>,
}

impl MultiPolygon {
    #[must_use]
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    #[must_use]
    pub fn planar_area(&self) -> f64 {
        self.polygons.iter().map(Polygon::planar_area).sum()
    }

    /// Mean of every point of every ring, closing points included
    #[must_use]
    pub fn vertex_centroid(&self) -> Option<GeoPoint> {
        let (count, lat_sum, lon_sum) = self
            .polygons
            .iter()
            .flat_map(Polygon::points)
            .fold((0usize, 0.0, 0.0), |(n, lat, lon), p| {
                (n + 1, lat + p.latitude, lon + p.longitude)
            });

        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(GeoPoint::new(lat_sum / n, lon_sum / n))
    }
}

fn ring_to_line_string(ring: &Ring) -> LineString<f64> {
    ring.iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect::<Vec<_>>()
        .into()
}

fn line_string_to_ring(line: &LineString<f64>) -> Ring {
    let mut ring: Ring = line
        .coords()
        .map(|c| GeoPoint::new(c.y, c.x))
        .collect();
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last())
        && first != *last
    {
        ring.push(first);
    }
    ring
}

impl From<&Polygon> for geo::Polygon<f64> {
    fn from(polygon: &Polygon) -> Self {
        let exterior = polygon
            .exterior()
            .map(ring_to_line_string)
            .unwrap_or_else(|| LineString::new(Vec::new()));
        let interiors = polygon.interiors().iter().map(ring_to_line_string).collect();
        geo::Polygon::new(exterior, interiors)
    }
}

impl From<&geo::Polygon<f64>> for Polygon {
    fn from(polygon: &geo::Polygon<f64>) -> Self {
        let mut rings = vec![line_string_to_ring(polygon.exterior())];
        rings.extend(polygon.interiors().iter().map(line_string_to_ring));
        Self { rings }
    }
}

impl From<&MultiPolygon> for geo::MultiPolygon<f64> {
    fn from(multi: &MultiPolygon) -> Self {
        geo::MultiPolygon::new(multi.polygons.iter().map(geo::Polygon::from).collect())
    }
}

impl From<&geo::MultiPolygon<f64>> for MultiPolygon {
    fn from(multi: &geo::MultiPolygon<f64>) -> Self {
        Self::new(multi.iter().map(Polygon::from).collect())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Axis-aligned square with its south-west corner at (`lon`, `lat`)
    pub fn square(lon: f64, lat: f64, size: f64) -> Polygon {
        Polygon::from_exterior(vec![
            GeoPoint::new(lat, lon),
            GeoPoint::new(lat, lon + size),
            GeoPoint::new(lat + size, lon + size),
            GeoPoint::new(lat + size, lon),
            GeoPoint::new(lat, lon),
        ])
    }
}
