use serde::Serialize;

use crate::config::HarnessConfig;
use crate::message::{ConfigPayload, Envelope, MessageError, OrientationPayload, PayloadType};
use crate::track::TrajectorySample;

/// Source of the envelope push timestamp, in epoch seconds.
pub type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

const PLACEHOLDER: &str = "TBC";

pub struct MessageFactory {
    site: ConfigPayload,
    orientation: OrientationPayload,
    device_id: String,
    clock: Clock,
}

impl MessageFactory {
    pub fn new(site: ConfigPayload, orientation: OrientationPayload, device_id: String) -> Self {
        Self {
            site,
            orientation,
            device_id,
            clock: Box::new(|| chrono::Utc::now().timestamp()),
        }
    }

    pub fn from_config(config: &HarnessConfig, orientation: OrientationPayload) -> Self {
        Self::new(
            ConfigPayload::from(&config.site),
            orientation,
            config.hostname.clone(),
        )
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config_envelope(&self) -> Result<Envelope, MessageError> {
        self.wrap(PayloadType::Configuration, &self.site)
    }

    pub fn orientation_envelope(&self) -> Result<Envelope, MessageError> {
        self.wrap(PayloadType::Orientation, &self.orientation)
    }

    /// The payload carries every field of the sample, including columns
    /// the controller ignores.
    pub fn object_envelope(&self, sample: &TrajectorySample) -> Result<Envelope, MessageError> {
        self.wrap(PayloadType::SelectedObject, sample)
    }

    fn wrap<T: Serialize>(
        &self,
        payload_type: PayloadType,
        payload: &T,
    ) -> Result<Envelope, MessageError> {
        Ok(Envelope {
            push_timestamp: (self.clock)(),
            device_type: PLACEHOLDER.to_string(),
            id: self.device_id.clone(),
            deployment_id: PLACEHOLDER.to_string(),
            current_location: PLACEHOLDER.to_string(),
            status: "Debug".to_string(),
            message_type: "Event".to_string(),
            model_version: "null".to_string(),
            firmware_version: "v0.0.0".to_string(),
            data_payload_type: payload_type,
            data_payload: serde_json::to_string(payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ObjectPayload;

    fn factory() -> MessageFactory {
        MessageFactory::new(
            ConfigPayload {
                tripod_longitude: -77.0,
                tripod_latitude: 38.0,
                tripod_altitude: 86.46,
            },
            OrientationPayload::zero(),
            "ptz-host".to_string(),
        )
        .with_clock(Box::new(|| 1_700_000_000))
    }

    #[test]
    fn envelopes_carry_fixed_header() {
        let envelope = factory().config_envelope().unwrap();
        assert_eq!(envelope.push_timestamp, 1_700_000_000);
        assert_eq!(envelope.id, "ptz-host");
        assert_eq!(envelope.message_type, "Event");
        assert_eq!(envelope.status, "Debug");
        assert_eq!(envelope.data_payload_type, PayloadType::Configuration);

        let site: ConfigPayload = envelope.payload(PayloadType::Configuration).unwrap();
        assert_eq!(site.tripod_altitude, 86.46);
    }

    #[test]
    fn header_uses_camel_case_on_the_wire() {
        let json = factory().orientation_envelope().unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pushTimestamp"], 1_700_000_000);
        assert_eq!(value["dataPayloadType"], "Orientation");
        assert_eq!(value["firmwareVersion"], "v0.0.0");
        assert!(value["dataPayload"].is_string());
    }

    #[test]
    fn object_payload_keeps_extra_columns() {
        let mut sample = TrajectorySample::new(12.5, 38.1, -77.1, 3048.0, 200.0, -5.0)
            .with_heading(270.0);
        sample.extra.insert("callsign".to_string(), "N123".into());
        sample.extra.insert("squawk".to_string(), 1200.into());

        let envelope = factory().object_envelope(&sample).unwrap();
        assert_eq!(envelope.data_payload_type, PayloadType::SelectedObject);

        let raw: serde_json::Value = serde_json::from_str(&envelope.data_payload).unwrap();
        assert_eq!(raw["callsign"], "N123");
        assert_eq!(raw["squawk"], 1200);
        assert_eq!(raw["track"], 270.0);

        let object: ObjectPayload = envelope.payload(PayloadType::SelectedObject).unwrap();
        assert_eq!(object, ObjectPayload::from(&sample));
    }

    #[test]
    fn payload_type_mismatch_is_reported() {
        let envelope = factory().config_envelope().unwrap();
        let err = envelope
            .payload::<OrientationPayload>(PayloadType::Orientation)
            .unwrap_err();
        assert!(matches!(err, MessageError::WrongPayloadType { .. }));
    }

    #[test]
    fn envelope_survives_json_transport() {
        let envelope = factory()
            .object_envelope(&TrajectorySample::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0))
            .unwrap();
        let decoded = Envelope::from_json(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }
}
