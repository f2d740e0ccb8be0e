use serde::{Deserialize, Serialize};

/// A device-reported position, as sent by a scanning device or attached to a session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GeoPoint {
    #[schema(example = 13.7563)]
    pub latitude: f64,
    #[schema(example = 100.5018)]
    pub longitude: f64,
    /// Reported accuracy radius in meters, if the device provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl GeoPoint {
    /// Both coordinates are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy.is_none_or(|a| a.is_finite() && a >= 0.0)
    }
}
