//! Meeting-zone pipeline
//!
//! Travel time, then both isochrones concurrently, then their intersection,
//! then settlements inside it. [`MeetingZoneEngine`] runs one pass for a pair
//! of locations; [`crate::session::MeetingZoneSession`] owns the inputs and
//! decides which pass is current.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::budget::TimeBudgetPolicy;
use crate::config::Where2MeetConfig;
use crate::error::FailureReason;
use crate::geocoder::{RegionGeocoder, SettlementSearch};
use crate::intersect::{GeoClipper, PolygonIntersector};
use crate::isochrone::IsochroneFetcher;
use crate::models::{GeoPoint, Location, MeetingZoneResult, ZoneDiagnostics, zone_center};
use crate::providers::{
    AzureMapsClient, IsochroneProvider, PlacesProvider, RouteType, TravelEstimator, TravelMode,
    with_timeout,
};
use crate::{Result, Where2MeetError};

/// Where a computation currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneState {
    /// At least one location is missing
    Idle,
    AwaitingTravelTime,
    AwaitingIsochrones {
        travel_time_seconds: u64,
        time_budget_seconds: u64,
    },
    AwaitingIntersection,
    AwaitingSettlements,
    Settled(Arc<MeetingZoneResult>),
    Failed(FailureReason),
}

impl ZoneState {
    /// Settled or failed
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ZoneState::Settled(_) | ZoneState::Failed(_))
    }

    #[must_use]
    pub fn result(&self) -> Option<&MeetingZoneResult> {
        match self {
            ZoneState::Settled(result) => Some(result),
            _ => None,
        }
    }
}

/// Tunables for one engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub budget: TimeBudgetPolicy,
    pub travel_mode: TravelMode,
    pub route_type: RouteType,
    pub categories: Vec<String>,
    pub search_limit: u32,
    /// Limit applied to every provider call
    pub call_timeout: Duration,
    pub fallback_center: GeoPoint,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Where2MeetConfig::default())
    }
}

impl From<&Where2MeetConfig> for EngineSettings {
    fn from(config: &Where2MeetConfig) -> Self {
        Self {
            budget: TimeBudgetPolicy::from(&config.budget),
            travel_mode: config.routing.travel_mode,
            route_type: config.routing.route_type,
            categories: config.search.categories.clone(),
            search_limit: config.search.limit,
            call_timeout: Duration::from_secs(config.azure.timeout_seconds.into()),
            fallback_center: config.defaults.fallback_center,
        }
    }
}

pub struct MeetingZoneEngine {
    travel: Arc<dyn TravelEstimator>,
    isochrones: IsochroneFetcher,
    intersector: Box<dyn PolygonIntersector>,
    geocoder: RegionGeocoder,
    settings: EngineSettings,
}

impl MeetingZoneEngine {
    pub fn new(
        travel: Arc<dyn TravelEstimator>,
        isochrones: Arc<dyn IsochroneProvider>,
        places: Arc<dyn PlacesProvider>,
        settings: EngineSettings,
    ) -> Self {
        let fetcher = IsochroneFetcher::new(isochrones, settings.route_type, settings.call_timeout);
        let geocoder = RegionGeocoder::new(
            places,
            settings.categories.clone(),
            settings.search_limit,
            settings.call_timeout,
        );
        Self {
            travel,
            isochrones: fetcher,
            intersector: Box::new(GeoClipper::default()),
            geocoder,
            settings,
        }
    }

    /// Engine backed by Azure Maps for all three providers
    pub fn from_config(config: &Where2MeetConfig) -> Result<Self> {
        let client = Arc::new(AzureMapsClient::new(&config.azure)?);
        Ok(Self::new(
            client.clone(),
            client.clone(),
            client,
            EngineSettings::from(config),
        ))
    }

    /// Replace the clipping strategy
    #[must_use]
    pub fn with_intersector(mut self, intersector: Box<dyn PolygonIntersector>) -> Self {
        self.intersector = intersector;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn compute(&self, a: &Location, b: &Location) -> Result<MeetingZoneResult> {
        self.compute_with_progress(a, b, &|_: ZoneState| {}).await
    }

    /// Run the pipeline, reporting each intermediate state to `progress`
    #[instrument(skip_all, fields(a = %a.display_name, b = %b.display_name))]
    pub async fn compute_with_progress(
        &self,
        a: &Location,
        b: &Location,
        progress: &(dyn Fn(ZoneState) + Send + Sync),
    ) -> Result<MeetingZoneResult> {
        let started = Instant::now();
        for location in [a, b] {
            if !location.point.is_valid() {
                return Err(Where2MeetError::geometry(format!(
                    "location '{}' has invalid coordinates ({}, {})",
                    location.display_name, location.point.latitude, location.point.longitude
                )));
            }
        }

        progress(ZoneState::AwaitingTravelTime);
        let travel_time = with_timeout(
            "route directions",
            self.settings.call_timeout,
            self.travel
                .travel_time(a.point, b.point, self.settings.travel_mode),
        )
        .await
        .inspect_err(|e| error!("Travel time between locations failed: {}", e))?;

        let budget = self.settings.budget.time_budget_seconds(travel_time);
        info!(
            "Travel time {}s, isochrone budget {}s per side",
            travel_time, budget
        );
        progress(ZoneState::AwaitingIsochrones {
            travel_time_seconds: travel_time,
            time_budget_seconds: budget,
        });

        // both requests run to completion even if one fails
        let (isochrone_a, isochrone_b) = futures::future::join(
            self.isochrones.fetch(a.point, budget),
            self.isochrones.fetch(b.point, budget),
        )
        .await;
        let (isochrone_a, isochrone_b) = match (isochrone_a, isochrone_b) {
            (Ok(iso_a), Ok(iso_b)) => (iso_a, iso_b),
            (Err(e), result_b) => {
                error!("Isochrone around '{}' failed: {}", a.display_name, e);
                if let Err(other) = result_b {
                    error!("Isochrone around '{}' failed: {}", b.display_name, other);
                }
                return Err(e);
            }
            (Ok(_), Err(e)) => {
                error!("Isochrone around '{}' failed: {}", b.display_name, e);
                return Err(e);
            }
        };

        progress(ZoneState::AwaitingIntersection);
        let overlap = self
            .intersector
            .intersect(isochrone_a.boundary(), isochrone_b.boundary())?;

        let (intersection, search) = if overlap.is_empty() {
            info!("Isochrones do not overlap");
            (None, SettlementSearch::default())
        } else {
            progress(ZoneState::AwaitingSettlements);
            let search = self.geocoder.find_settlements(&overlap).await?;
            (Some(overlap), search)
        };

        let center = zone_center(
            intersection.as_ref(),
            Some(a),
            Some(b),
            self.settings.fallback_center,
        );
        if !search.failed_categories.is_empty() {
            warn!(
                "Settlement list is partial, failed categories: {:?}",
                search.failed_categories
            );
        }

        Ok(MeetingZoneResult {
            location_a: a.clone(),
            location_b: b.clone(),
            isochrone_a,
            isochrone_b,
            intersection,
            settlements: search.settlements,
            travel_time_seconds: Some(travel_time),
            center,
            diagnostics: ZoneDiagnostics {
                time_budget_seconds: budget,
                straight_line_km: a.point.distance_km(&b.point),
                raw_place_count: search.raw_count,
                dropped_place_count: search.dropped_count,
                failed_categories: search.failed_categories,
                computed_at: Utc::now(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::FailureKind;
    use crate::models::{MultiPolygon, Polygon};
    use crate::models::polygon::fixtures::square;
    use crate::providers::test_support::{FixedTravelTime, StaticIsochrones, StaticPlaces, place};

    fn san_francisco() -> Location {
        Location::new(37.77, -122.42, "San Francisco")
    }

    fn oakland() -> Location {
        Location::new(37.87, -122.27, "Oakland")
    }

    fn sf_area() -> Polygon {
        square(-122.5, 37.7, 0.2)
    }

    fn oakland_area() -> Polygon {
        square(-122.35, 37.75, 0.2)
    }

    struct Harness {
        travel: Arc<FixedTravelTime>,
        isochrones: Arc<StaticIsochrones>,
        places: Arc<StaticPlaces>,
        engine: MeetingZoneEngine,
    }

    fn harness(travel: FixedTravelTime, isochrones: StaticIsochrones, places: StaticPlaces) -> Harness {
        let travel = Arc::new(travel);
        let isochrones = Arc::new(isochrones);
        let places = Arc::new(places);
        let engine = MeetingZoneEngine::new(
            travel.clone(),
            isochrones.clone(),
            places.clone(),
            EngineSettings::default(),
        );
        Harness {
            travel,
            isochrones,
            places,
            engine,
        }
    }

    fn overlapping() -> StaticIsochrones {
        StaticIsochrones::default()
            .with_polygon(san_francisco().point, &sf_area())
            .with_polygon(oakland().point, &oakland_area())
    }

    fn bay_area_places() -> StaticPlaces {
        StaticPlaces::default()
            .with("city", Ok(vec![place("Emeryville", "US", "Emeryville, CA 94608", 37.83, -122.29)]))
            .with("town", Ok(vec![place("Emeryville", "US", "Emeryville", 37.83, -122.29)]))
    }

    #[tokio::test]
    async fn test_overlapping_isochrones_yield_settlements() {
        let h = harness(FixedTravelTime::new(1800), overlapping(), bay_area_places());
        let states = Mutex::new(Vec::new());

        let result = h
            .engine
            .compute_with_progress(&san_francisco(), &oakland(), &|s: ZoneState| states.lock().unwrap().push(s))
            .await
            .unwrap();

        assert_eq!(*h.isochrones.budgets.lock().unwrap(), vec![1800, 1800]);
        assert_eq!(result.travel_time_seconds, Some(1800));
        assert_eq!(result.diagnostics.time_budget_seconds, 1800);
        assert_eq!(result.isochrone_a.time_budget_seconds(), 1800);

        let intersection = result.intersection.as_ref().unwrap();
        assert_eq!(intersection.len(), 1);
        assert!(intersection.planar_area() > 0.0);

        assert_eq!(result.settlements.len(), 1);
        assert_eq!(result.settlements[0].key(), ("Emeryville", "US"));
        assert_eq!(result.center, intersection.vertex_centroid().unwrap());

        assert_eq!(
            *states.lock().unwrap(),
            vec![
                ZoneState::AwaitingTravelTime,
                ZoneState::AwaitingIsochrones {
                    travel_time_seconds: 1800,
                    time_budget_seconds: 1800
                },
                ZoneState::AwaitingIntersection,
                ZoneState::AwaitingSettlements,
            ]
        );
    }

    #[tokio::test]
    async fn test_disjoint_isochrones_skip_settlement_search() {
        let isochrones = StaticIsochrones::default()
            .with_polygon(san_francisco().point, &sf_area())
            .with_polygon(oakland().point, &square(-121.0, 38.5, 0.2));
        let h = harness(FixedTravelTime::new(1800), isochrones, bay_area_places());

        let result = h.engine.compute(&san_francisco(), &oakland()).await.unwrap();
        assert!(result.intersection.is_none());
        assert!(result.settlements.is_empty());
        assert_eq!(h.places.query_count(), 0);
        assert_eq!(result.center, san_francisco().point.midpoint(&oakland().point));
    }

    #[tokio::test]
    async fn test_one_failed_isochrone_still_attempts_both() {
        let isochrones = StaticIsochrones::default()
            .with_polygon(san_francisco().point, &sf_area())
            .with(
                oakland().point,
                Err(Where2MeetError::authorization("route range", 401, "denied")),
            );
        let h = harness(FixedTravelTime::new(1800), isochrones, bay_area_places());

        let err = h.engine.compute(&san_francisco(), &oakland()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Authorization);
        assert_eq!(h.isochrones.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.places.query_count(), 0);
    }

    #[tokio::test]
    async fn test_degenerate_isochrone_fails_as_geometry() {
        let isochrones = StaticIsochrones::default()
            .with_polygon(san_francisco().point, &sf_area())
            .with(oakland().point, Ok(vec![oakland().point]));
        let h = harness(FixedTravelTime::new(1800), isochrones, bay_area_places());

        let err = h.engine.compute(&san_francisco(), &oakland()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Geometry);
    }

    #[tokio::test]
    async fn test_travel_failure_stops_pipeline() {
        let h = harness(
            FixedTravelTime::failing(Where2MeetError::config("Azure Maps subscription key missing")),
            overlapping(),
            bay_area_places(),
        );

        let err = h.engine.compute(&san_francisco(), &oakland()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert_eq!(h.isochrones.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_location_rejected_before_requests() {
        let h = harness(FixedTravelTime::new(1800), overlapping(), bay_area_places());
        let broken = Location::new(f64::NAN, -122.27, "Nowhere");

        let err = h.engine.compute(&san_francisco(), &broken).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Geometry);
        assert_eq!(h.travel.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_categories_reported_in_diagnostics() {
        let places = bay_area_places().with(
            "village",
            Err(Where2MeetError::transport("geometry search", Some(503), "unavailable")),
        );
        let h = harness(FixedTravelTime::new(1800), overlapping(), places);

        let result = h.engine.compute(&san_francisco(), &oakland()).await.unwrap();
        assert_eq!(result.diagnostics.failed_categories, vec!["village".to_string()]);
        assert_eq!(result.settlements.len(), 1);
        assert_eq!(result.diagnostics.raw_place_count, 2);
    }

    /// Returns the same zone whatever the isochrones look like
    struct FixedZone {
        zone: MultiPolygon,
        calls: AtomicUsize,
    }

    impl PolygonIntersector for FixedZone {
        fn intersect(&self, a: &Polygon, b: &Polygon) -> Result<MultiPolygon> {
            assert!(a.is_well_formed() && b.is_well_formed());
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.zone.clone())
        }
    }

    #[tokio::test]
    async fn test_custom_intersector_replaces_clipping() {
        let zone = MultiPolygon::new(vec![square(-122.3, 37.8, 0.05), square(-122.1, 37.7, 0.05)]);
        let h = harness(FixedTravelTime::new(1800), overlapping(), bay_area_places());
        let intersector = Arc::new(FixedZone {
            zone: zone.clone(),
            calls: AtomicUsize::new(0),
        });
        let engine = h.engine.with_intersector(Box::new(SharedZone(intersector.clone())));

        let result = engine.compute(&san_francisco(), &oakland()).await.unwrap();
        assert_eq!(intersector.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.intersection.as_ref(), Some(&zone));
        assert_eq!(result.center, zone.vertex_centroid().unwrap());
        assert!(h.places.region_sizes.lock().unwrap().iter().all(|n| *n == 2));
    }

    #[tokio::test]
    async fn test_custom_intersector_without_overlap() {
        let h = harness(FixedTravelTime::new(1800), overlapping(), bay_area_places());
        let intersector = Arc::new(FixedZone {
            zone: MultiPolygon::default(),
            calls: AtomicUsize::new(0),
        });
        let engine = h.engine.with_intersector(Box::new(SharedZone(intersector)));

        let result = engine.compute(&san_francisco(), &oakland()).await.unwrap();
        assert!(result.intersection.is_none());
        assert_eq!(h.places.query_count(), 0);
    }

    struct SharedZone(Arc<FixedZone>);

    impl PolygonIntersector for SharedZone {
        fn intersect(&self, a: &Polygon, b: &Polygon) -> Result<MultiPolygon> {
            self.0.intersect(a, b)
        }
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = Where2MeetConfig::default();
        config.budget.buffer_seconds = 600;
        config.azure.timeout_seconds = 12;
        let settings = EngineSettings::from(&config);
        assert_eq!(settings.budget.buffer_seconds, 600);
        assert_eq!(settings.call_timeout, Duration::from_secs(12));
        assert_eq!(settings.categories.len(), 4);
    }
}
