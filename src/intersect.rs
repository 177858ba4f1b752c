//! Polygon intersection
//!
//! The clipping algorithm sits behind [`PolygonIntersector`] so it can be
//! swapped. [`GeoClipper`] uses the `geo` crate's boolean operations, a
//! robust sweep-line overlay with adaptive fixed-precision snapping.

use geo::{Area, BooleanOps, Validation};
use tracing::{debug, warn};

use crate::models::{MultiPolygon, Polygon};
use crate::{Result, Where2MeetError};

/// Pieces with less area than this (square degrees) are slivers from
/// touching edges, not overlap
pub const DEFAULT_MIN_AREA: f64 = 1e-12;

pub trait PolygonIntersector: Send + Sync {
    /// Intersection of `a` and `b`; empty when they do not overlap.
    ///
    /// Malformed or self-intersecting input is a geometry error.
    fn intersect(&self, a: &Polygon, b: &Polygon) -> Result<MultiPolygon>;
}

#[derive(Debug, Clone, Copy)]
pub struct GeoClipper {
    min_area: f64,
}

impl Default for GeoClipper {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

impl GeoClipper {
    #[must_use]
    pub fn with_min_area(min_area: f64) -> Self {
        Self { min_area }
    }

    fn to_checked_geo(&self, polygon: &Polygon, label: &str) -> Result<geo::Polygon<f64>> {
        if !polygon.is_well_formed() {
            return Err(Where2MeetError::geometry(format!(
                "{label} polygon has an open, short or non-finite ring"
            )));
        }
        let converted = geo::Polygon::from(polygon);
        if !converted.is_valid() {
            return Err(Where2MeetError::geometry(format!(
                "{label} polygon is self-intersecting or otherwise invalid"
            )));
        }
        Ok(converted)
    }
}

impl PolygonIntersector for GeoClipper {
    fn intersect(&self, a: &Polygon, b: &Polygon) -> Result<MultiPolygon> {
        let subject = self.to_checked_geo(a, "first").inspect_err(|e| warn!("{}", e))?;
        let clip = self.to_checked_geo(b, "second").inspect_err(|e| warn!("{}", e))?;

        let overlap = subject.intersection(&clip);
        let kept: Vec<Polygon> = overlap
            .iter()
            .filter(|piece| piece.unsigned_area() > self.min_area)
            .map(Polygon::from)
            .collect();

        debug!(
            "Intersection produced {} piece(s), kept {}",
            overlap.0.len(),
            kept.len()
        );
        Ok(MultiPolygon::new(kept))
    }
}
