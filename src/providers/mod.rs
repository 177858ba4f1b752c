//! External collaborators consumed by the meeting-zone pipeline
//!
//! Each provider seam is an async trait so the engine can be driven by the
//! Azure Maps client in production and by in-memory doubles in tests:
//! - [`TravelEstimator`]: point-to-point travel duration
//! - [`IsochroneProvider`]: reachable-range boundary around one origin
//! - [`PlacesProvider`]: category search constrained to a geometry

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{GeoPoint, MultiPolygon, PlaceRecord};
use crate::{Result, Where2MeetError};

pub mod azure;

pub use azure::AzureMapsClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
}

/// Route optimisation preference for reachable-range requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    #[default]
    Fastest,
    Shortest,
    Eco,
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
        };
        f.write_str(name)
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteType::Fastest => "fastest",
            RouteType::Shortest => "shortest",
            RouteType::Eco => "eco",
        };
        f.write_str(name)
    }
}

#[async_trait]
pub trait TravelEstimator: Send + Sync {
    /// Duration of the best route from `from` to `to`, in seconds
    async fn travel_time(&self, from: GeoPoint, to: GeoPoint, mode: TravelMode) -> Result<u64>;
}

#[async_trait]
pub trait IsochroneProvider: Send + Sync {
    /// Raw boundary points of the area reachable within `time_budget_seconds`.
    ///
    /// Points are returned as received; closing and validation happen in
    /// [`crate::isochrone::IsochroneFetcher`].
    async fn reachable_range(
        &self,
        origin: GeoPoint,
        time_budget_seconds: u64,
        route_type: RouteType,
    ) -> Result<Vec<GeoPoint>>;
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Places matching `query` inside any polygon of `regions`
    async fn search_geometry(
        &self,
        query: &str,
        regions: &MultiPolygon,
        limit: u32,
    ) -> Result<Vec<PlaceRecord>>;
}

/// Run one provider call under `limit`, mapping expiry to a timeout error
pub(crate) async fn with_timeout<T, F>(provider: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} call exceeded {:?}", provider, limit);
            Err(Where2MeetError::timeout(provider, limit))
        }
    }
}
