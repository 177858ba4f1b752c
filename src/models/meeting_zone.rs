//! Final output of one meeting-zone computation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GeoPoint, Isochrone, Location, MultiPolygon, Settlement};

/// Meeting zone for one pair of locations.
///
/// `intersection` is `None` exactly when the two isochrones do not overlap,
/// and `settlements` is then empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingZoneResult {
    pub location_a: Location,
    pub location_b: Location,
    pub isochrone_a: Isochrone,
    pub isochrone_b: Isochrone,
    pub intersection: Option<MultiPolygon>,
    pub settlements: Vec<Settlement>,
    pub travel_time_seconds: Option<u64>,
    pub center: GeoPoint,
    pub diagnostics: ZoneDiagnostics,
}

impl MeetingZoneResult {
    #[must_use]
    pub fn has_overlap(&self) -> bool {
        self.intersection.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDiagnostics {
    pub time_budget_seconds: u64,
    pub straight_line_km: f64,
    /// Records returned by all place categories before cleanup
    pub raw_place_count: usize,
    /// Records without a usable name, country or position
    pub dropped_place_count: usize,
    /// Categories whose search request failed
    pub failed_categories: Vec<String>,
    pub computed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Where a map showing the zone should be centered.
///
/// Preference order: centroid of the intersection, midpoint of both
/// locations, the single known location, `fallback`.
#[must_use]
pub fn zone_center(
    intersection: Option<&MultiPolygon>,
    location_a: Option<&Location>,
    location_b: Option<&Location>,
    fallback: GeoPoint,
) -> GeoPoint {
    if let Some(center) = intersection.and_then(MultiPolygon::vertex_centroid) {
        return center;
    }
    match (location_a, location_b) {
        (Some(a), Some(b)) => a.point.midpoint(&b.point),
        (Some(single), None) | (None, Some(single)) => single.point,
        (None, None) => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::polygon::fixtures::square;

    const FALLBACK: GeoPoint = GeoPoint::new(37.7749, -122.4194);

    #[test]
    fn test_center_prefers_intersection() {
        let region = MultiPolygon::new(vec![square(10.0, 20.0, 1.0)]);
        let a = Location::new(0.0, 0.0, "A");
        let center = zone_center(Some(&region), Some(&a), None, FALLBACK);
        assert!((center.latitude - 20.4).abs() < 1e-9);
        assert!((center.longitude - 10.4).abs() < 1e-9);
    }

    #[test]
    fn test_center_midpoint_without_intersection() {
        let a = Location::new(37.77, -122.42, "San Francisco");
        let b = Location::new(37.87, -122.27, "Oakland");
        let center = zone_center(None, Some(&a), Some(&b), FALLBACK);
        assert_eq!(center, a.point.midpoint(&b.point));
    }

    #[test]
    fn test_center_empty_intersection_falls_through() {
        let b = Location::new(37.87, -122.27, "Oakland");
        let empty = MultiPolygon::default();
        assert_eq!(zone_center(Some(&empty), None, Some(&b), FALLBACK), b.point);
    }

    #[test]
    fn test_center_fallback() {
        assert_eq!(zone_center(None, None, None, FALLBACK), FALLBACK);
    }
}
