//! Reachable-range polygon around an origin

use serde::{Deserialize, Serialize};

use super::{GeoPoint, Polygon};
use crate::isochrone::normalize_boundary;
use crate::{Result, Where2MeetError};

/// Boundary of everything reachable from `origin` within the time budget.
///
/// Constructed by [`crate::isochrone::IsochroneFetcher`] after the boundary
/// has been closed and validated. Deserialization runs the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IsochroneRecord")]
pub struct Isochrone {
    origin: GeoPoint,
    time_budget_seconds: u64,
    boundary: Polygon,
}

/// Unchecked wire form of [`Isochrone`]
#[derive(Deserialize)]
struct IsochroneRecord {
    origin: GeoPoint,
    time_budget_seconds: u64,
    boundary: Polygon,
}

impl TryFrom<IsochroneRecord> for Isochrone {
    type Error = Where2MeetError;

    fn try_from(record: IsochroneRecord) -> Result<Self> {
        if !record.origin.is_valid() {
            return Err(Where2MeetError::geometry(format!(
                "isochrone origin ({}, {}) is out of range",
                record.origin.latitude, record.origin.longitude
            )));
        }
        let mut rings = record.boundary.rings.into_iter();
        let (Some(exterior), None) = (rings.next(), rings.next()) else {
            return Err(Where2MeetError::no_reachable_area(
                "isochrone boundary must have exactly one ring",
            ));
        };
        let ring = normalize_boundary(exterior)?;
        Ok(Self::new(
            record.origin,
            record.time_budget_seconds,
            Polygon::from_exterior(ring),
        ))
    }
}

impl Isochrone {
    pub(crate) fn new(origin: GeoPoint, time_budget_seconds: u64, boundary: Polygon) -> Self {
        Self {
            origin,
            time_budget_seconds,
            boundary,
        }
    }

    #[must_use]
    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    #[must_use]
    pub fn time_budget_seconds(&self) -> u64 {
        self.time_budget_seconds
    }

    #[must_use]
    pub fn boundary(&self) -> &Polygon {
        &self.boundary
    }
}
