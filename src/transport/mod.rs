mod broker;
mod bus;
mod direct;
mod error;

use serde::Serialize;

pub use broker::LocalBroker;
pub use bus::BusTransport;
pub use direct::DirectTransport;
pub use error::TransportError;

use crate::message::Envelope;

/// Logical channels the controller listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
    Config,
    Orientation,
    Object,
    Capture,
    LoggerStatus,
    ImageFilename,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Config,
        Channel::Orientation,
        Channel::Object,
        Channel::Capture,
        Channel::LoggerStatus,
        Channel::ImageFilename,
    ];

    /// Environment variable naming this channel's topic.
    pub fn env_var(&self) -> &'static str {
        match self {
            Channel::Config => "CONFIG_TOPIC",
            Channel::Orientation => "ORIENTATION_TOPIC",
            Channel::Object => "OBJECT_TOPIC",
            Channel::Capture => "CAPTURE_TOPIC",
            Channel::LoggerStatus => "LOGGER_TOPIC",
            Channel::ImageFilename => "IMAGE_FILENAME_TOPIC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportMode {
    Bus,
    Direct,
}

impl TransportMode {
    pub fn from_flag(use_bus: bool) -> Self {
        if use_bus {
            TransportMode::Bus
        } else {
            TransportMode::Direct
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub published: u64,
    pub acknowledged: u64,
    pub failed: u64,
    /// Deliveries not acknowledged when the settle interval ran out.
    pub late: u64,
}

/// Delivers envelopes to the controller. The replay loop is written against
/// this trait only.
pub trait Transport {
    fn mode(&self) -> TransportMode;

    fn deliver(&mut self, channel: Channel, envelope: &Envelope) -> Result<(), TransportError>;

    fn stats(&self) -> DeliveryStats;
}
