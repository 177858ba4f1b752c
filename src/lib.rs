//! `Where2Meet` - fair meeting zones from intersecting drive-time isochrones
//!
//! This library computes, for two locations, the area both people can reach
//! within a shared time budget and the settlements inside it. The pipeline
//! and its state machine live in [`engine`]; [`session`] keeps the result in
//! step with changing inputs.

pub mod budget;
pub mod config;
pub mod engine;
pub mod error;
pub mod geocoder;
pub mod intersect;
pub mod isochrone;
pub mod models;
pub mod providers;
pub mod session;
pub mod telemetry;

// Re-export core types for public API
pub use budget::TimeBudgetPolicy;
pub use config::Where2MeetConfig;
pub use engine::{EngineSettings, MeetingZoneEngine, ZoneState};
pub use error::{FailureKind, FailureReason, Where2MeetError};
pub use geocoder::{RegionGeocoder, SettlementSearch};
pub use intersect::{GeoClipper, PolygonIntersector};
pub use isochrone::IsochroneFetcher;
pub use models::{GeoPoint, Isochrone, Location, MeetingZoneResult, MultiPolygon, Polygon, Settlement};
pub use providers::{AzureMapsClient, IsochroneProvider, PlacesProvider, RouteType, TravelEstimator, TravelMode};
pub use session::{MeetingZoneSession, ZoneSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, Where2MeetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
