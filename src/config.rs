use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::transport::{Channel, TransportMode};

pub const TRIPOD_ALTITUDE_M: f64 = 86.46;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    pub channels: ChannelConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub camera: CameraCredentials,
    #[serde(default)]
    pub controller: ControllerSettings,
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub config: String,
    pub orientation: String,
    pub object: String,
    pub capture: String,
    pub logger: String,
    pub image_filename: String,
}

impl ChannelConfig {
    pub fn topic(&self, channel: Channel) -> &str {
        match channel {
            Channel::Config => &self.config,
            Channel::Orientation => &self.orientation,
            Channel::Object => &self.object,
            Channel::Capture => &self.capture,
            Channel::LoggerStatus => &self.logger,
            Channel::ImageFilename => &self.image_filename,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_tripod_longitude")]
    pub tripod_longitude: f64,
    #[serde(default = "default_tripod_latitude")]
    pub tripod_latitude: f64,
    #[serde(default = "default_tripod_altitude")]
    pub tripod_altitude: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            tripod_longitude: default_tripod_longitude(),
            tripod_latitude: default_tripod_latitude(),
            tripod_altitude: default_tripod_altitude(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrokerConfig {
    pub endpoint: Option<String>,
    #[serde(default, with = "humantime_serde_opt")]
    pub settle: Option<Duration>,
}

impl BrokerConfig {
    pub fn settle_interval(&self, settings: &ControllerSettings) -> Duration {
        self.settle
            .unwrap_or_else(|| Duration::from_secs_f64(settings.update_interval))
    }
}

/// Camera credentials are carried for completeness; the harness never drives a camera.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraCredentials {
    pub ip: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl CameraCredentials {
    pub fn is_configured(&self) -> bool {
        self.ip.is_some() && self.user.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerSettings {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: f64,
    #[serde(default = "default_update_interval")]
    pub update_interval: f64,
    #[serde(default = "default_capture_interval")]
    pub capture_interval: f64,
    #[serde(default)]
    pub lead_time: f64,
    #[serde(default = "default_pan_gain")]
    pub pan_gain: f64,
    #[serde(default = "default_rate_min")]
    pub pan_rate_min: f64,
    #[serde(default = "default_rate_max")]
    pub pan_rate_max: f64,
    #[serde(default = "default_tilt_gain")]
    pub tilt_gain: f64,
    #[serde(default = "default_rate_min")]
    pub tilt_rate_min: f64,
    #[serde(default = "default_rate_max")]
    pub tilt_rate_max: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: default_heartbeat_interval(),
            update_interval: default_update_interval(),
            capture_interval: default_capture_interval(),
            lead_time: 0.0,
            pan_gain: default_pan_gain(),
            pan_rate_min: default_rate_min(),
            pan_rate_max: default_rate_max(),
            tilt_gain: default_tilt_gain(),
            tilt_rate_min: default_rate_min(),
            tilt_rate_max: default_rate_max(),
        }
    }
}

fn default_hostname() -> String {
    "TBC".to_string()
}

fn default_tripod_longitude() -> f64 {
    -77.0
}

fn default_tripod_latitude() -> f64 {
    38.0
}

fn default_tripod_altitude() -> f64 {
    TRIPOD_ALTITUDE_M
}

fn default_heartbeat_interval() -> f64 {
    10.0
}

fn default_update_interval() -> f64 {
    0.01
}

fn default_capture_interval() -> f64 {
    2.0
}

fn default_pan_gain() -> f64 {
    0.1
}

fn default_tilt_gain() -> f64 {
    0.4
}

fn default_rate_min() -> f64 {
    1.0
}

fn default_rate_max() -> f64 {
    100.0
}

mod humantime_serde_opt {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl HarnessConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: HarnessConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from named variables. Topics are required;
    /// tripod coordinates fall back to illustrative defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let optional = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let degrees = |var: &'static str, default: f64| -> Result<f64, ConfigError> {
            match optional(var) {
                Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    var,
                    reason: format!("{}", e),
                }),
                None => Ok(default),
            }
        };

        let channels = ChannelConfig {
            config: required("CONFIG_TOPIC")?,
            orientation: required("ORIENTATION_TOPIC")?,
            object: required("OBJECT_TOPIC")?,
            capture: required("CAPTURE_TOPIC")?,
            logger: required("LOGGER_TOPIC")?,
            image_filename: required("IMAGE_FILENAME_TOPIC")?,
        };

        let site = SiteConfig {
            tripod_longitude: degrees("TRIPOD_LONGITUDE", default_tripod_longitude())?,
            tripod_latitude: degrees("TRIPOD_LATITUDE", default_tripod_latitude())?,
            tripod_altitude: TRIPOD_ALTITUDE_M,
        };

        let config = HarnessConfig {
            channels,
            site,
            broker: BrokerConfig {
                endpoint: optional("MQTT_IP"),
                settle: None,
            },
            camera: CameraCredentials {
                ip: optional("CAMERA_IP"),
                user: optional("CAMERA_USER"),
                password: optional("CAMERA_PASSWORD"),
            },
            controller: ControllerSettings::default(),
            hostname: optional("HOSTNAME").unwrap_or_else(default_hostname),
        };

        Ok(config)
    }

    /// Fails on the first setting that would leave the run in an unusable state.
    pub fn validate(&self, mode: TransportMode) -> Result<(), ConfigError> {
        for channel in Channel::ALL {
            if self.channels.topic(channel).trim().is_empty() {
                return Err(ConfigError::Missing(channel.env_var()));
            }
        }

        check_range(
            "TRIPOD_LONGITUDE",
            self.site.tripod_longitude,
            -180.0,
            180.0,
        )?;
        check_range("TRIPOD_LATITUDE", self.site.tripod_latitude, -90.0, 90.0)?;

        let c = &self.controller;
        check_positive("update_interval", c.update_interval)?;
        check_positive("heartbeat_interval", c.heartbeat_interval)?;
        check_positive("capture_interval", c.capture_interval)?;

        if c.pan_rate_min > c.pan_rate_max || c.tilt_rate_min > c.tilt_rate_max {
            return Err(ConfigError::Invalid {
                var: "rate_limits",
                reason: "minimum rate exceeds maximum rate".to_string(),
            });
        }

        if mode == TransportMode::Bus && self.broker.endpoint.is_none() {
            return Err(ConfigError::Missing("MQTT_IP"));
        }

        Ok(())
    }
}

fn check_range(var: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("{} is outside [{}, {}]", value, min, max),
        });
    }
    Ok(())
}

fn check_positive(var: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("must be positive, got {}", value),
        });
    }
    Ok(())
}
