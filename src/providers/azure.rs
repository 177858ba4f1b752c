//! Azure Maps REST client
//!
//! One client serves all three provider roles: route directions for the
//! travel estimate, route range for isochrones and geometry search for
//! settlements. The subscription key travels as the `subscription-key`
//! query parameter and is checked before any request is built.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::{IsochroneProvider, PlacesProvider, RouteType, TravelEstimator, TravelMode};
use crate::config::AzureConfig;
use crate::models::{GeoPoint, MultiPolygon, PlaceRecord};
use crate::{Result, Where2MeetError};

const DIRECTIONS: &str = "route directions";
const RANGE: &str = "route range";
const SEARCH: &str = "geometry search";

pub struct AzureMapsClient {
    client: Client,
    subscription_key: Option<String>,
    base_url: String,
    api_version: String,
    timeout: Duration,
}

impl AzureMapsClient {
    /// Create a new client
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("where2meet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Where2MeetError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            subscription_key: config.subscription_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn subscription_key(&self) -> Result<&str> {
        self.subscription_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Where2MeetError::config("Azure Maps subscription key missing"))
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let key = self.subscription_key()?;
        let mut url = format!(
            "{}/{}?api-version={}",
            self.base_url,
            path,
            urlencoding::encode(&self.api_version)
        );
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url.push_str("&subscription-key=");
        url.push_str(&urlencoding::encode(key));
        Ok(url)
    }

    /// The request URL carries the subscription key, so it is stripped
    /// before the error is formatted
    fn transport_error(&self, provider: &str, err: reqwest::Error) -> Where2MeetError {
        if err.is_timeout() {
            Where2MeetError::timeout(provider, self.timeout)
        } else {
            let err = err.without_url();
            Where2MeetError::transport(provider, None, format!("API request failed: {err}"))
        }
    }

    async fn decode<T: DeserializeOwned>(&self, provider: &str, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Azure Maps {} error ({}): {}", provider, status, body);
            return Err(Where2MeetError::from_status(provider, status.as_u16(), body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(provider, e))?;
        serde_json::from_str(&body)
            .map_err(|e| Where2MeetError::invalid_response(provider, format!("{e}")))
    }

    /// Verify the key and service enablement with a small fuzzy search
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        let url = self.url(
            "search/fuzzy/json",
            &[("query", "San Francisco".to_string()), ("limit", "1".to_string())],
        )?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(SEARCH, e))?;
        let results: wire::SearchResponse = self.decode(SEARCH, response).await?;
        info!(
            "Azure Maps is available ({} fuzzy results)",
            results.results.len()
        );
        Ok(())
    }
}

#[async_trait]
impl TravelEstimator for AzureMapsClient {
    #[instrument(skip(self))]
    async fn travel_time(&self, from: GeoPoint, to: GeoPoint, mode: TravelMode) -> Result<u64> {
        let url = self.url(
            "route/directions/json",
            &[
                ("query", format!("{}:{}", from.to_query(), to.to_query())),
                ("travelMode", wire::travel_mode(mode).to_string()),
                ("routeType", "fastest".to_string()),
            ],
        )?;
        debug!("Requesting travel time");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(DIRECTIONS, e))?;
        let directions: wire::DirectionsResponse = self.decode(DIRECTIONS, response).await?;

        directions
            .routes
            .first()
            .map(|route| route.summary.travel_time_in_seconds)
            .ok_or_else(|| Where2MeetError::invalid_response(DIRECTIONS, "No routes in response"))
    }
}

#[async_trait]
impl IsochroneProvider for AzureMapsClient {
    #[instrument(skip(self))]
    async fn reachable_range(
        &self,
        origin: GeoPoint,
        time_budget_seconds: u64,
        route_type: RouteType,
    ) -> Result<Vec<GeoPoint>> {
        let url = self.url(
            "route/range/json",
            &[
                ("query", origin.to_query()),
                ("timeBudgetInSec", time_budget_seconds.to_string()),
                ("routeType", route_type.to_string()),
            ],
        )?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(RANGE, e))?;
        let range: wire::RangeResponse = self.decode(RANGE, response).await?;

        let boundary: Vec<GeoPoint> = range
            .reachable_range
            .map(|r| r.boundary)
            .unwrap_or_default()
            .into_iter()
            .map(GeoPoint::from)
            .collect();
        debug!("Received {} boundary points", boundary.len());
        Ok(boundary)
    }
}

#[async_trait]
impl PlacesProvider for AzureMapsClient {
    #[instrument(skip(self, regions), fields(polygons = regions.len()))]
    async fn search_geometry(
        &self,
        query: &str,
        regions: &MultiPolygon,
        limit: u32,
    ) -> Result<Vec<PlaceRecord>> {
        let url = self.url(
            "search/geometry/json",
            &[("query", query.to_string()), ("limit", limit.to_string())],
        )?;
        let body = wire::GeometryRequest::from(regions);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(SEARCH, e))?;
        let search: wire::SearchResponse = self.decode(SEARCH, response).await?;

        debug!("'{}' returned {} results", query, search.results.len());
        Ok(search.results.into_iter().map(PlaceRecord::from).collect())
    }
}

/// Azure Maps request and response structures
mod wire {
    use serde::{Deserialize, Serialize};

    use crate::models::{GeoPoint, MultiPolygon, PlaceRecord};
    use crate::providers::TravelMode;

    pub fn travel_mode(mode: TravelMode) -> &'static str {
        match mode {
            TravelMode::Driving => "car",
            TravelMode::Walking => "pedestrian",
            TravelMode::Bicycling => "bicycle",
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct DirectionsResponse {
        #[serde(default)]
        pub routes: Vec<Route>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Route {
        pub summary: RouteSummary,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RouteSummary {
        pub travel_time_in_seconds: u64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RangeResponse {
        pub reachable_range: Option<ReachableRange>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ReachableRange {
        #[serde(default)]
        pub boundary: Vec<BoundaryPoint>,
    }

    /// Missing components become NaN so validation rejects the boundary
    #[derive(Debug, Deserialize)]
    pub struct BoundaryPoint {
        pub latitude: Option<f64>,
        pub longitude: Option<f64>,
    }

    impl From<BoundaryPoint> for GeoPoint {
        fn from(point: BoundaryPoint) -> Self {
            GeoPoint::new(
                point.latitude.unwrap_or(f64::NAN),
                point.longitude.unwrap_or(f64::NAN),
            )
        }
    }

    #[derive(Debug, Serialize)]
    pub struct GeometryRequest {
        pub geometry: GeometryCollection,
    }

    #[derive(Debug, Serialize)]
    pub struct GeometryCollection {
        #[serde(rename = "type")]
        pub kind: &'static str,
        pub geometries: Vec<PolygonGeometry>,
    }

    /// GeoJSON polygon, `[longitude, latitude]` positions
    #[derive(Debug, Serialize)]
    pub struct PolygonGeometry {
        #[serde(rename = "type")]
        pub kind: &'static str,
        pub coordinates: Vec<Vec<[f64; 2]>>,
    }

    impl From<&MultiPolygon> for GeometryRequest {
        fn from(regions: &MultiPolygon) -> Self {
            let geometries = regions
                .polygons
                .iter()
                .map(|polygon| PolygonGeometry {
                    kind: "Polygon",
                    coordinates: polygon
                        .rings
                        .iter()
                        .map(|ring| ring.iter().map(|p| [p.longitude, p.latitude]).collect())
                        .collect(),
                })
                .collect();
            Self {
                geometry: GeometryCollection {
                    kind: "GeometryCollection",
                    geometries,
                },
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchResponse {
        #[serde(default)]
        pub results: Vec<SearchResult>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchResult {
        pub address: Option<Address>,
        pub position: Option<Position>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Address {
        pub municipality: Option<String>,
        pub country_code: Option<String>,
        pub freeform_address: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Position {
        pub lat: Option<f64>,
        pub lon: Option<f64>,
    }

    impl From<SearchResult> for PlaceRecord {
        fn from(result: SearchResult) -> Self {
            let position = result.position.and_then(|p| match (p.lat, p.lon) {
                (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
                _ => None,
            });
            let (municipality, country_code, freeform_address) = match result.address {
                Some(a) => (a.municipality, a.country_code, a.freeform_address),
                None => (None, None, None),
            };
            PlaceRecord {
                municipality,
                country_code,
                position,
                freeform_address,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::polygon::fixtures::square;

    fn client(key: Option<&str>) -> AzureMapsClient {
        let config = AzureConfig {
            subscription_key: key.map(String::from),
            ..AzureConfig::default()
        };
        AzureMapsClient::new(&config).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client(Some("test-key"));
        assert_eq!(client.base_url(), "https://atlas.microsoft.com");
    }

    #[test]
    fn test_url_encodes_query_and_key() {
        let url = client(Some("k+y"))
            .url("search/geometry/json", &[("query", "populated place".into())])
            .unwrap();
        assert_eq!(
            url,
            "https://atlas.microsoft.com/search/geometry/json?api-version=1.0&query=populated%20place&subscription-key=k%2By"
        );
    }

    #[test]
    fn test_missing_key_fails_before_request() {
        let err = client(None).url("route/range/json", &[]).unwrap_err();
        assert!(matches!(err, Where2MeetError::Config { .. }));
    }

    #[test]
    fn test_geometry_request_shape() {
        let regions = MultiPolygon::new(vec![square(-122.3, 37.8, 0.1), square(-122.0, 37.5, 0.1)]);
        let body = serde_json::to_value(wire::GeometryRequest::from(&regions)).unwrap();
        assert_eq!(body["geometry"]["type"], "GeometryCollection");
        let geometries = body["geometry"]["geometries"].as_array().unwrap();
        assert_eq!(geometries.len(), 2);
        assert_eq!(geometries[0]["type"], "Polygon");
        // [lon, lat]
        assert_eq!(geometries[0]["coordinates"][0][0][0], -122.3);
        assert_eq!(geometries[0]["coordinates"][0][0][1], 37.8);
    }

    #[test]
    fn test_range_response_missing_coordinate_is_nan() {
        let json = r#"{"reachableRange":{"boundary":[{"latitude":1.0,"longitude":2.0},{"latitude":3.0}]}}"#;
        let range: wire::RangeResponse = serde_json::from_str(json).unwrap();
        let points: Vec<GeoPoint> = range
            .reachable_range
            .unwrap()
            .boundary
            .into_iter()
            .map(GeoPoint::from)
            .collect();
        assert_eq!(points[0], GeoPoint::new(1.0, 2.0));
        assert!(points[1].longitude.is_nan());
    }

    #[test]
    fn test_search_result_conversion() {
        let json = r#"{"results":[
            {"type":"Geography","address":{"municipality":"Emeryville","countryCode":"US","freeformAddress":"Emeryville, CA"},"position":{"lat":37.83,"lon":-122.29}},
            {"type":"Geography","address":{"municipality":"Nowhere","countryCode":"US"}}
        ]}"#;
        let search: wire::SearchResponse = serde_json::from_str(json).unwrap();
        let records: Vec<PlaceRecord> = search.results.into_iter().map(PlaceRecord::from).collect();
        assert_eq!(records[0].municipality.as_deref(), Some("Emeryville"));
        assert_eq!(records[0].position, Some(GeoPoint::new(37.83, -122.29)));
        assert!(records[1].position.is_none());
    }
}
