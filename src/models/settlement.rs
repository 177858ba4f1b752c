//! Named populated places found inside a meeting zone

use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// A city, town or village returned by the places provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Municipality name as normalized by the provider
    pub name: String,
    /// Country code (ISO 3166-1 alpha-2)
    pub country_code: String,
    pub position: GeoPoint,
    pub freeform_address: String,
}

impl Settlement {
    /// Identity used for deduplication, exact and case-sensitive
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.name, &self.country_code)
    }
}

/// Loosely validated record as the places provider returns it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceRecord {
    pub municipality: Option<String>,
    pub country_code: Option<String>,
    pub position: Option<GeoPoint>,
    pub freeform_address: Option<String>,
}

impl PlaceRecord {
    /// Convert into a [`Settlement`], or `None` when name, country or a
    /// finite position is missing
    #[must_use]
    pub fn into_settlement(self) -> Option<Settlement> {
        let position = self.position.filter(GeoPoint::is_finite)?;
        Some(Settlement {
            name: self.municipality?,
            country_code: self.country_code?,
            position,
            freeform_address: self.freeform_address.unwrap_or_default(),
        })
    }
}
