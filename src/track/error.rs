use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("data unavailable at {path}: {reason}")]
    DataUnavailable { path: String, reason: String },
    #[error("malformed record at row {row}, field '{field}': {reason}")]
    MalformedRecord {
        row: usize,
        field: String,
        reason: String,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl TrackError {
    pub fn unavailable(path: impl Into<String>, reason: impl ToString) -> Self {
        TrackError::DataUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(row: usize, field: &str, reason: impl ToString) -> Self {
        TrackError::MalformedRecord {
            row,
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
