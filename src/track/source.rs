use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::message::OrientationPayload;
use crate::track::units::{
    feet_per_minute_to_meters_per_second, feet_to_meters, knots_to_meters_per_second,
};
use crate::track::{TrackError, TrajectorySample};

const REQUIRED_COLUMNS: [&str; 6] = [
    "timestamp",
    "latitude",
    "longitude",
    "altitude",
    "horizontal_velocity",
    "vertical_velocity",
];
const HEADING_COLUMN: &str = "track";
const OBJECT_ID_COLUMN: &str = "object_id";

/// An ordered, read-only trajectory loaded once per run.
#[derive(Debug, Clone)]
pub struct TrackSource {
    id: String,
    samples: Vec<TrajectorySample>,
}

impl TrackSource {
    pub fn track_path(data_dir: &Path, track_id: &str) -> PathBuf {
        data_dir.join(format!("{}-processed-track.csv", track_id))
    }

    /// Load `<data_dir>/<track_id>-processed-track.csv`, converting feet,
    /// knots and feet/minute to meters and meters/second.
    pub fn load(data_dir: &Path, track_id: &str) -> Result<Self, TrackError> {
        let path = Self::track_path(data_dir, track_id);
        let display = path.display().to_string();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| TrackError::unavailable(&display, e))?;

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = column(name).ok_or_else(|| {
                TrackError::unavailable(&display, format!("missing column '{}'", name))
            })?;
        }
        let heading_idx = column(HEADING_COLUMN);
        let object_id_idx = column(OBJECT_ID_COLUMN);

        let mut samples = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let row = i + 1;
            let record = result?;

            let field = |idx: usize, name: &str| -> Result<f64, TrackError> {
                let raw = record
                    .get(idx)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| TrackError::malformed(row, name, "missing value"))?;
                let value = raw
                    .parse::<f64>()
                    .map_err(|e| TrackError::malformed(row, name, e))?;
                if !value.is_finite() {
                    return Err(TrackError::malformed(row, name, "value is not finite"));
                }
                Ok(value)
            };

            let values = REQUIRED_COLUMNS
                .iter()
                .zip(required)
                .map(|(&name, idx)| field(idx, name))
                .collect::<Result<Vec<_>, _>>()?;

            let heading_deg = match heading_idx {
                Some(idx) if record.get(idx).is_some_and(|s| !s.is_empty()) => {
                    Some(field(idx, HEADING_COLUMN)?)
                }
                _ => None,
            };
            let object_id = object_id_idx
                .and_then(|idx| record.get(idx))
                .filter(|s| !s.is_empty())
                .map(String::from);

            let known: Vec<usize> = required
                .iter()
                .copied()
                .chain(heading_idx)
                .chain(object_id_idx)
                .collect();
            let extra: BTreeMap<String, Value> = headers
                .iter()
                .zip(record.iter())
                .enumerate()
                .filter(|(idx, (name, _))| !known.contains(idx) && !name.is_empty())
                .map(|(_, (name, value))| (name.to_string(), cell_value(value)))
                .collect();

            samples.push(TrajectorySample {
                timestamp: values[0],
                latitude: values[1],
                longitude: values[2],
                altitude: feet_to_meters(values[3]),
                horizontal_velocity: knots_to_meters_per_second(values[4]),
                vertical_velocity: feet_per_minute_to_meters_per_second(values[5]),
                heading_deg,
                object_id,
                extra,
            });
        }

        if samples.is_empty() {
            return Err(TrackError::unavailable(&display, "track has no samples"));
        }

        log::info!("Loaded track {} ({} samples)", track_id, samples.len());
        Self::with_id(track_id, samples)
    }

    /// Wrap samples that are already in SI units.
    #[cfg(test)]
    pub fn from_samples(samples: Vec<TrajectorySample>) -> Result<Self, TrackError> {
        Self::with_id("memory", samples)
    }

    fn with_id(id: &str, samples: Vec<TrajectorySample>) -> Result<Self, TrackError> {
        if samples.is_empty() {
            return Err(TrackError::unavailable(id, "track has no samples"));
        }
        if let Some(i) = samples.iter().position(|s| !s.timestamp.is_finite()) {
            return Err(TrackError::malformed(
                i + 1,
                "timestamp",
                format!("timestamp {} is not finite", samples[i].timestamp),
            ));
        }
        for (i, pair) in samples.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(TrackError::malformed(
                    i + 2,
                    "timestamp",
                    format!(
                        "timestamps must be non-decreasing ({} then {})",
                        pair[0].timestamp, pair[1].timestamp
                    ),
                ));
            }
        }
        Ok(Self {
            id: id.to_string(),
            samples,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn first(&self) -> &TrajectorySample {
        &self.samples[0]
    }

    pub fn last_index(&self) -> usize {
        self.samples.len() - 1
    }

    /// Seconds between the first and last sample.
    pub fn span(&self) -> f64 {
        self.samples[self.last_index()].timestamp - self.samples[0].timestamp
    }

    /// Index of the newest sample at or before `time`, never earlier than `from`.
    /// Equal timestamps resolve to the later sample.
    pub fn latest_at_or_before(&self, from: usize, time: f64) -> usize {
        let ahead = self.samples[from..]
            .partition_point(|s| s.timestamp <= time)
            .max(1);
        from + ahead - 1
    }

    pub fn load_orientation(path: &Path) -> Result<OrientationPayload, TrackError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| TrackError::unavailable(&display, e))?;
        serde_json::from_str(&content).map_err(|e| TrackError::unavailable(&display, e))
    }
}

/// Numbers are kept as JSON numbers, blanks become null, anything else is text.
fn cell_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const HEADER: &str =
        "timestamp,latitude,longitude,altitude,horizontal_velocity,vertical_velocity,track,callsign";

    fn write_track(dir: &Path, id: &str, rows: &[&str]) {
        let mut content = String::from(HEADER);
        for row in rows {
            content.push('\n');
            content.push_str(row);
        }
        fs::write(TrackSource::track_path(dir, id), content).unwrap();
    }

    fn track_at(times: &[f64]) -> TrackSource {
        TrackSource::from_samples(
            times
                .iter()
                .map(|t| TrajectorySample::new(*t, 38.0, -77.0, 1000.0, 100.0, 0.0))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn load_converts_units() {
        let dir = tempfile::tempdir().unwrap();
        write_track(
            dir.path(),
            "A1E946",
            &[
                "1000.0,38.1,-77.1,10000,400,-600,90.0,AAL12",
                "1001.0,38.1,-77.09,9990,400,-600,90.0,AAL12",
            ],
        );

        let track = TrackSource::load(dir.path(), "A1E946").unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.id(), "A1E946");

        let first = track.first();
        assert_eq!(first.timestamp, 1000.0);
        assert_relative_eq!(first.altitude, 10000.0 * 0.3048);
        assert_relative_eq!(first.horizontal_velocity, 400.0 * 6076.12 / 3600.0 * 0.3048);
        assert_relative_eq!(first.vertical_velocity, -600.0 * 0.3048 / 60.0);
        assert_eq!(first.heading_deg, Some(90.0));
        assert_eq!(first.extra.get("callsign"), Some(&Value::from("AAL12")));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrackSource::load(dir.path(), "NOPE").unwrap_err();
        assert!(matches!(err, TrackError::DataUnavailable { .. }));
    }

    #[test]
    fn missing_column_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            TrackSource::track_path(dir.path(), "X"),
            "timestamp,latitude,longitude,altitude,horizontal_velocity\n0,1,2,3,4\n",
        )
        .unwrap();
        let err = TrackSource::load(dir.path(), "X").unwrap_err();
        match err {
            TrackError::DataUnavailable { reason, .. } => {
                assert!(reason.contains("vertical_velocity"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_cell_is_malformed_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        write_track(
            dir.path(),
            "X",
            &["0,38,-77,100,10,0,0,A", "1,38,-77,,10,0,0,A"],
        );
        let err = TrackSource::load(dir.path(), "X").unwrap_err();
        match err {
            TrackError::MalformedRecord { row, field, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "altitude");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_only_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write_track(dir.path(), "X", &[]);
        assert!(matches!(
            TrackSource::load(dir.path(), "X"),
            Err(TrackError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn decreasing_timestamps_are_rejected() {
        let samples = vec![
            TrajectorySample::new(5.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            TrajectorySample::new(4.0, 0.0, 0.0, 0.0, 0.0, 0.0),
        ];
        assert!(matches!(
            TrackSource::from_samples(samples),
            Err(TrackError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn latest_selection_prefers_newest_crossed_sample() {
        let track = track_at(&[0.0, 5.0, 11.0, 12.0]);
        assert_eq!(track.latest_at_or_before(0, 4.0), 0);
        assert_eq!(track.latest_at_or_before(0, 6.0), 1);
        assert_eq!(track.latest_at_or_before(0, 12.0), 3);
        assert_eq!(track.latest_at_or_before(2, 11.5), 2);
    }

    #[test]
    fn equal_timestamps_resolve_to_last() {
        let track = track_at(&[0.0, 2.0, 2.0, 2.0, 4.0]);
        assert_eq!(track.latest_at_or_before(0, 2.0), 3);
        assert_eq!(track.span(), 4.0);
    }

    #[test]
    fn orientation_reference_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orientation_msg_0s.json");
        assert!(matches!(
            TrackSource::load_orientation(&path),
            Err(TrackError::DataUnavailable { .. })
        ));

        fs::write(
            &path,
            r#"{"tripod_yaw": 0.0, "tripod_pitch": 0.0, "tripod_roll": 0.0}"#,
        )
        .unwrap();
        let orientation = TrackSource::load_orientation(&path).unwrap();
        assert_eq!(orientation, OrientationPayload::zero());
    }

    #[test]
    fn non_finite_last_timestamp_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_track(
            dir.path(),
            "X",
            &["0,38,-77,100,10,0,0,A", "NaN,38,-77,100,10,0,0,A"],
        );
        match TrackSource::load(dir.path(), "X").unwrap_err() {
            TrackError::MalformedRecord { row, field, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "timestamp");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_position_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_track(dir.path(), "X", &["0,38,inf,100,10,0,0,A"]);
        match TrackSource::load(dir.path(), "X").unwrap_err() {
            TrackError::MalformedRecord { row, field, .. } => {
                assert_eq!(row, 1);
                assert_eq!(field, "longitude");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn infinite_last_sample_is_rejected() {
        let samples = vec![
            TrajectorySample::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            TrajectorySample::new(f64::INFINITY, 0.0, 0.0, 0.0, 0.0, 0.0),
        ];
        match TrackSource::from_samples(samples).unwrap_err() {
            TrackError::MalformedRecord { row, .. } => assert_eq!(row, 2),
            other => panic!("unexpected error: {other}"),
        }
        let single = vec![TrajectorySample::new(f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0)];
        assert!(TrackSource::from_samples(single).is_err());
    }

    #[test]
    fn heading_column_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            TrackSource::track_path(dir.path(), "X"),
            "timestamp,latitude,longitude,altitude,horizontal_velocity,vertical_velocity\n\
             0,38,-77,100,10,0\n",
        )
        .unwrap();

        let track = TrackSource::load(dir.path(), "X").unwrap();
        let first = track.first();
        assert_eq!(first.heading_deg, None);
        assert_eq!(first.object_id, None);
        assert!(first.extra.is_empty());
    }

    #[test]
    fn object_id_and_numeric_extras() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            TrackSource::track_path(dir.path(), "X"),
            "timestamp,latitude,longitude,altitude,horizontal_velocity,vertical_velocity,\
             object_id,squawk,rssi,note\n\
             0,38,-77,100,10,0,a1e946,1200,-81.5,\n",
        )
        .unwrap();

        let first = TrackSource::load(dir.path(), "X").unwrap().first().clone();
        assert_eq!(first.object_id.as_deref(), Some("a1e946"));
        assert!(!first.extra.contains_key("object_id"));
        assert_eq!(first.extra.get("squawk"), Some(&Value::from(1200)));
        assert_eq!(first.extra.get("rssi"), Some(&Value::from(-81.5)));
        assert_eq!(first.extra.get("note"), Some(&Value::Null));

        let payload = crate::message::ObjectPayload::from(&first);
        assert_eq!(payload.object_id.as_deref(), Some("a1e946"));
        assert_eq!(payload.track, None);
    }
}
