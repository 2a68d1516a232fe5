use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One row of a processed track, already normalized to SI units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectorySample {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// [m]
    pub altitude: f64,
    /// [m/s]
    pub horizontal_velocity: f64,
    /// [m/s]
    pub vertical_velocity: f64,
    /// Heading in degrees clockwise from north, when the track carries one.
    #[serde(rename = "track", skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Columns the controller does not interpret. Numeric cells stay numbers.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TrajectorySample {
    pub fn new(
        timestamp: f64,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        horizontal_velocity: f64,
        vertical_velocity: f64,
    ) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            altitude,
            horizontal_velocity,
            vertical_velocity,
            heading_deg: None,
            object_id: None,
            extra: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }
}
