//! Settlement lookup inside a meeting zone
//!
//! One geometry-constrained search per place category, all polygons of the
//! zone sent together. Results are merged in category order and
//! deduplicated by `(name, country_code)`, keeping the first occurrence.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::models::{MultiPolygon, Settlement};
use crate::providers::{PlacesProvider, with_timeout};
use crate::{Result, Where2MeetError};

/// Settlements plus bookkeeping about what was discarded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettlementSearch {
    pub settlements: Vec<Settlement>,
    pub raw_count: usize,
    pub dropped_count: usize,
    pub failed_categories: Vec<String>,
}

#[derive(Clone)]
pub struct RegionGeocoder {
    provider: Arc<dyn PlacesProvider>,
    categories: Vec<String>,
    limit: u32,
    timeout: Duration,
}

impl RegionGeocoder {
    pub fn new(
        provider: Arc<dyn PlacesProvider>,
        categories: Vec<String>,
        limit: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            categories,
            limit,
            timeout,
        }
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Search every category; fails only when all of them fail
    #[instrument(skip(self, regions), fields(polygons = regions.len()))]
    pub async fn find_settlements(&self, regions: &MultiPolygon) -> Result<SettlementSearch> {
        let mut search = SettlementSearch::default();
        let mut last_error: Option<Where2MeetError> = None;
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for category in &self.categories {
            let records = match with_timeout(
                "geometry search",
                self.timeout,
                self.provider.search_geometry(category, regions, self.limit),
            )
            .await
            {
                Ok(records) => records,
                Err(e) => {
                    warn!("Search for '{}' failed, continuing: {}", category, e);
                    search.failed_categories.push(category.clone());
                    last_error = Some(e);
                    continue;
                }
            };

            debug!("'{}' returned {} records", category, records.len());
            search.raw_count += records.len();

            for record in records {
                let Some(settlement) = record.into_settlement() else {
                    search.dropped_count += 1;
                    continue;
                };
                if seen.insert((settlement.name.clone(), settlement.country_code.clone())) {
                    search.settlements.push(settlement);
                }
            }
        }

        if search.failed_categories.len() == self.categories.len()
            && let Some(err) = last_error
        {
            return Err(err);
        }

        if search.dropped_count > 0 {
            warn!(
                "Dropped {} place records without name, country or position",
                search.dropped_count
            );
        }
        info!(
            "Found {} settlements from {} records",
            search.settlements.len(),
            search.raw_count
        );
        Ok(search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlaceRecord;
    use crate::models::polygon::fixtures::square;
    use crate::providers::test_support::{StaticPlaces, place};

    fn categories() -> Vec<String> {
        ["city", "town", "village", "populated place"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn geocoder(places: StaticPlaces) -> (RegionGeocoder, Arc<StaticPlaces>) {
        let places = Arc::new(places);
        let geocoder = RegionGeocoder::new(places.clone(), categories(), 100, Duration::from_secs(5));
        (geocoder, places)
    }

    fn zone() -> MultiPolygon {
        MultiPolygon::new(vec![square(-122.35, 37.8, 0.1), square(-122.1, 37.7, 0.1)])
    }

    #[tokio::test]
    async fn test_dedup_keeps_first_in_category_order() {
        let (geocoder, _) = geocoder(
            StaticPlaces::default()
                .with("city", Ok(vec![place("Emeryville", "US", "Emeryville, CA (city)", 37.83, -122.29)]))
                .with("town", Ok(vec![
                    place("Emeryville", "US", "Emeryville, CA (town)", 37.84, -122.28),
                    place("Berkeley", "US", "Berkeley, CA", 37.87, -122.27),
                ])),
        );

        let search = geocoder.find_settlements(&zone()).await.unwrap();
        let names: Vec<&str> = search.settlements.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Emeryville", "Berkeley"]);
        assert_eq!(search.settlements[0].freeform_address, "Emeryville, CA (city)");
        assert_eq!(search.raw_count, 3);
    }

    #[tokio::test]
    async fn test_dedup_is_case_sensitive_and_per_country() {
        let (geocoder, _) = geocoder(StaticPlaces::default().with(
            "city",
            Ok(vec![
                place("Springfield", "US", "a", 1.0, 1.0),
                place("springfield", "US", "b", 1.0, 1.0),
                place("Springfield", "CA", "c", 1.0, 1.0),
            ]),
        ));
        let search = geocoder.find_settlements(&zone()).await.unwrap();
        assert_eq!(search.settlements.len(), 3);
    }

    #[tokio::test]
    async fn test_all_polygons_sent_in_one_request_per_category() {
        let (geocoder, places) = geocoder(StaticPlaces::default());
        geocoder.find_settlements(&zone()).await.unwrap();

        assert_eq!(*places.queries.lock().unwrap(), categories());
        assert!(places.region_sizes.lock().unwrap().iter().all(|n| *n == 2));
    }

    #[tokio::test]
    async fn test_records_without_position_are_dropped() {
        let mut no_position = place("Ghost Town", "US", "", 0.0, 0.0);
        no_position.position = None;
        let (geocoder, _) = geocoder(StaticPlaces::default().with(
            "village",
            Ok(vec![no_position, PlaceRecord::default(), place("Albany", "US", "Albany, CA", 37.88, -122.29)]),
        ));

        let search = geocoder.find_settlements(&zone()).await.unwrap();
        assert_eq!(search.settlements.len(), 1);
        assert_eq!(search.settlements[0].name, "Albany");
        assert_eq!(search.dropped_count, 2);
    }

    #[tokio::test]
    async fn test_partial_failure_is_recovered() {
        let (geocoder, places) = geocoder(
            StaticPlaces::default()
                .with("city", Err(Where2MeetError::transport("geometry search", Some(500), "boom")))
                .with("town", Ok(vec![place("Alameda", "US", "Alameda, CA", 37.76, -122.24)])),
        );

        let search = geocoder.find_settlements(&zone()).await.unwrap();
        assert_eq!(places.query_count(), 4);
        assert_eq!(search.failed_categories, vec!["city".to_string()]);
        assert_eq!(search.settlements.len(), 1);
    }

    #[tokio::test]
    async fn test_total_failure_is_an_error() {
        let mut places = StaticPlaces::default();
        for category in categories() {
            places = places.with(
                &category,
                Err(Where2MeetError::authorization("geometry search", 401, "denied")),
            );
        }
        let (geocoder, _) = geocoder(places);

        let err = geocoder.find_settlements(&zone()).await.unwrap_err();
        assert!(matches!(err, Where2MeetError::Authorization { .. }));
    }
}
