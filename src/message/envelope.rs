use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::message::{MessageError, PayloadType};

/// Header plus serialized payload, as published on every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub push_timestamp: i64,
    pub device_type: String,
    pub id: String,
    pub deployment_id: String,
    pub current_location: String,
    pub status: String,
    pub message_type: String,
    pub model_version: String,
    pub firmware_version: String,
    pub data_payload_type: PayloadType,
    pub data_payload: String,
}

impl Envelope {
    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn payload<T: DeserializeOwned>(&self, expected: PayloadType) -> Result<T, MessageError> {
        if self.data_payload_type != expected {
            return Err(MessageError::WrongPayloadType {
                expected,
                actual: self.data_payload_type,
            });
        }
        serde_json::from_str(&self.data_payload)
            .map_err(|source| MessageError::Payload { expected, source })
    }
}
