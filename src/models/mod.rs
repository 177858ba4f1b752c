//! Data models for the meeting-zone engine
//!
//! This module contains the core domain models organized by concern:
//! - Geo point: coordinates and user-picked locations
//! - Polygon: closed rings and multi-polygons, with `geo` conversions
//! - Isochrone: validated reachable-range boundaries
//! - Settlement: named places found in a zone
//! - Meeting zone: the pipeline result and its map center

pub mod geo_point;
pub mod isochrone;
pub mod meeting_zone;
pub mod polygon;
pub mod settlement;

// Re-export all public types for convenient access
pub use geo_point::{GeoPoint, Location};
pub use isochrone::Isochrone;
pub use meeting_zone::{MeetingZoneResult, ZoneDiagnostics, zone_center};
pub use polygon::{MIN_RING_POINTS, MultiPolygon, Polygon, Ring};
pub use settlement::{PlaceRecord, Settlement};
