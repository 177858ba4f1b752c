//! Isochrone fetching and boundary normalization

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::models::{GeoPoint, Isochrone, Polygon, Ring};
use crate::providers::{IsochroneProvider, RouteType, with_timeout};
use crate::{Result, Where2MeetError};

/// Requests one reachable-range boundary per origin and turns it into a
/// validated [`Isochrone`]
#[derive(Clone)]
pub struct IsochroneFetcher {
    provider: Arc<dyn IsochroneProvider>,
    route_type: RouteType,
    timeout: Duration,
}

impl IsochroneFetcher {
    pub fn new(provider: Arc<dyn IsochroneProvider>, route_type: RouteType, timeout: Duration) -> Self {
        Self {
            provider,
            route_type,
            timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, origin: GeoPoint, time_budget_seconds: u64) -> Result<Isochrone> {
        let boundary = with_timeout(
            "route range",
            self.timeout,
            self.provider
                .reachable_range(origin, time_budget_seconds, self.route_type),
        )
        .await?;

        let ring = normalize_boundary(boundary).inspect_err(|e| {
            warn!("Rejected isochrone around {}: {}", origin, e);
        })?;
        debug!("Isochrone around {} has {} points", origin, ring.len());

        Ok(Isochrone::new(
            origin,
            time_budget_seconds,
            Polygon::from_exterior(ring),
        ))
    }
}

/// Close and validate a raw boundary.
///
/// Fewer than three points is rejected, an open ring gets a copy of its
/// first point appended, and any non-finite coordinate rejects the whole
/// boundary.
pub fn normalize_boundary(mut boundary: Vec<GeoPoint>) -> Result<Ring> {
    if boundary.len() < 3 {
        return Err(Where2MeetError::no_reachable_area(format!(
            "boundary has {} points, at least 3 required",
            boundary.len()
        )));
    }

    let first = boundary[0];
    if boundary.last() != Some(&first) {
        boundary.push(first);
    }

    if let Some(bad) = boundary.iter().find(|p| !p.is_finite()) {
        return Err(Where2MeetError::no_reachable_area(format!(
            "boundary contains non-finite coordinate ({}, {})",
            bad.latitude, bad.longitude
        )));
    }

    Ok(boundary)
}
