use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::track::TrajectorySample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum PayloadType {
    #[serde(rename = "Configuration")]
    #[strum(serialize = "Configuration")]
    Configuration,
    #[serde(rename = "Orientation")]
    #[strum(serialize = "Orientation")]
    Orientation,
    #[serde(rename = "Selected Object")]
    #[strum(serialize = "Selected Object")]
    SelectedObject,
}

/// Fixed location of the camera mount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigPayload {
    /// [deg]
    pub tripod_longitude: f64,
    /// [deg]
    pub tripod_latitude: f64,
    /// [m]
    pub tripod_altitude: f64,
}

impl From<&SiteConfig> for ConfigPayload {
    fn from(site: &SiteConfig) -> Self {
        Self {
            tripod_longitude: site.tripod_longitude,
            tripod_latitude: site.tripod_latitude,
            tripod_altitude: site.tripod_altitude,
        }
    }
}

/// Mount orientation relative to local east-north-up, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationPayload {
    pub tripod_yaw: f64,
    pub tripod_pitch: f64,
    pub tripod_roll: f64,
}

impl OrientationPayload {
    pub fn zero() -> Self {
        Self {
            tripod_yaw: 0.0,
            tripod_pitch: 0.0,
            tripod_roll: 0.0,
        }
    }
}

impl Default for OrientationPayload {
    fn default() -> Self {
        Self::zero()
    }
}

/// Decoded form of an object observation. Columns the controller does not
/// interpret stay in the serialized payload only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPayload {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub horizontal_velocity: f64,
    pub vertical_velocity: f64,
    #[serde(default)]
    pub track: Option<f64>,
    #[serde(default)]
    pub object_id: Option<String>,
}

impl From<&TrajectorySample> for ObjectPayload {
    fn from(sample: &TrajectorySample) -> Self {
        Self {
            timestamp: sample.timestamp,
            latitude: sample.latitude,
            longitude: sample.longitude,
            altitude: sample.altitude,
            horizontal_velocity: sample.horizontal_velocity,
            vertical_velocity: sample.vertical_velocity,
            track: sample.heading_deg,
            object_id: sample.object_id.clone(),
        }
    }
}
