mod error;
mod sample;
mod source;
pub mod units;

pub use error::TrackError;
pub use sample::TrajectorySample;
pub use source::TrackSource;
