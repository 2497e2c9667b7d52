use rust_decimal::Decimal;
use serde::Serialize;

/// Trust-score adjustment reported for a location check.
pub const LOCATION_IMPACT: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Rectangular latitude/longitude bounds, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoFence {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl GeoFence {
    /// Bounding box of Nigeria.
    pub const NIGERIA: GeoFence = GeoFence {
        min_lat: 4.0,
        max_lat: 14.0,
        min_lng: 2.5,
        max_lng: 15.0,
    };

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lng
            && longitude <= self.max_lng
    }

    /// Check a coordinate pair against the fence.
    pub fn check(&self, latitude: f64, longitude: f64) -> LocationVerdict {
        let within_bounds = self.contains(latitude, longitude);
        LocationVerdict {
            within_bounds,
            trust_score_impact: if within_bounds {
                LOCATION_IMPACT
            } else {
                -LOCATION_IMPACT
            },
        }
    }
}

impl Default for GeoFence {
    fn default() -> Self {
        GeoFence::NIGERIA
    }
}

/// Outcome of a GPS location check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationVerdict {
    pub within_bounds: bool,
    pub trust_score_impact: Decimal,
}
