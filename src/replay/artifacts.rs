use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::replay::{HistoryError, ReplayOutcome};
use crate::transport::{DeliveryStats, TransportMode};

/// Output directory for one replay: the history table for plotting tools
/// and a summary log.
pub struct RunArtifacts {
    base_dir: PathBuf,
    run_log: RunLog,
}

impl RunArtifacts {
    pub fn new(
        base_dir: &Path,
        track_id: &str,
        mode: TransportMode,
        tick_interval: f64,
    ) -> io::Result<Self> {
        fs::create_dir_all(base_dir)?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            run_log: RunLog::new(track_id.to_string(), mode, tick_interval),
        })
    }

    pub fn finish(&mut self, outcome: &ReplayOutcome) -> Result<(), HistoryError> {
        let file = fs::File::create(self.history_path())?;
        outcome.history.write_csv(io::BufWriter::new(file))?;

        self.run_log.ticks = outcome.history.len();
        self.run_log.deliveries = outcome.deliveries;
        self.run_log.dropped_samples = outcome.dropped;
        self.run_log.last_sample = outcome.selected.last().copied();
        self.run_log.delivery = outcome.stats;
        self.run_log.completed_at = Some(Utc::now());
        self.run_log.save(&self.run_log_path())?;
        Ok(())
    }

    pub fn run_log(&self) -> &RunLog {
        &self.run_log
    }

    pub fn history_path(&self) -> PathBuf {
        self.base_dir.join("history.csv")
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.base_dir.join("run_log.yaml")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunLog {
    pub track_id: String,
    pub transport: TransportMode,
    pub tick_interval_s: f64,
    pub ticks: usize,
    pub deliveries: usize,
    pub dropped_samples: usize,
    /// Index of the sample current at the final tick.
    pub last_sample: Option<usize>,
    pub delivery: DeliveryStats,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunLog {
    pub fn new(track_id: String, transport: TransportMode, tick_interval_s: f64) -> Self {
        Self {
            track_id,
            transport,
            tick_interval_s,
            ticks: 0,
            deliveries: 0,
            dropped_samples: 0,
            last_sample: None,
            delivery: DeliveryStats::default(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        fs::write(
            path,
            serde_yaml::to_string(self)
                .map_err(|e| io::Error::other(format!("Failed to serialize run log: {}", e)))?,
        )
    }
}
