use serde::Serialize;
use std::io::Write;

use crate::controller::ControllerSnapshot;
use crate::replay::HistoryError;

/// Column names of the history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Series {
    TimestampC,
    RhoO,
    TauO,
    RhoDotO,
    TauDotO,
    RhoC,
    TauC,
    RhoDotC,
    TauDotC,
}

impl Series {
    pub const ALL: [Series; 9] = [
        Series::TimestampC,
        Series::RhoO,
        Series::TauO,
        Series::RhoDotO,
        Series::TauDotO,
        Series::RhoC,
        Series::TauC,
        Series::RhoDotC,
        Series::TauDotC,
    ];

    pub fn from_name(name: &str) -> Option<Series> {
        Series::ALL.into_iter().find(|s| s.to_string() == name)
    }
}

/// One tick: simulated camera time plus the controller state read after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryRow {
    pub timestamp_c: f64,
    pub rho_o: f64,
    pub tau_o: f64,
    pub rho_dot_o: f64,
    pub tau_dot_o: f64,
    pub rho_c: f64,
    pub tau_c: f64,
    pub rho_dot_c: f64,
    pub tau_dot_c: f64,
}

impl HistoryRow {
    pub fn new(timestamp_c: f64, s: ControllerSnapshot) -> Self {
        Self {
            timestamp_c,
            rho_o: s.rho_o,
            tau_o: s.tau_o,
            rho_dot_o: s.rho_dot_o,
            tau_dot_o: s.tau_dot_o,
            rho_c: s.rho_c,
            tau_c: s.tau_c,
            rho_dot_c: s.rho_dot_c,
            tau_dot_c: s.tau_dot_c,
        }
    }

    pub fn value(&self, series: Series) -> f64 {
        match series {
            Series::TimestampC => self.timestamp_c,
            Series::RhoO => self.rho_o,
            Series::TauO => self.tau_o,
            Series::RhoDotO => self.rho_dot_o,
            Series::TauDotO => self.tau_dot_o,
            Series::RhoC => self.rho_c,
            Series::TauC => self.tau_c,
            Series::RhoDotC => self.rho_dot_c,
            Series::TauDotC => self.tau_dot_c,
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            rho_o: self.rho_o,
            tau_o: self.tau_o,
            rho_dot_o: self.rho_dot_o,
            tau_dot_o: self.tau_dot_o,
            rho_c: self.rho_c,
            tau_c: self.tau_c,
            rho_dot_c: self.rho_dot_c,
            tau_dot_c: self.tau_dot_c,
        }
    }
}

/// Accumulates one row per tick. Rows are stored whole, so every series has
/// the same length by construction.
#[derive(Debug, Default)]
pub struct HistoryRecorder {
    rows: Vec<HistoryRow>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sim_time: f64, snapshot: ControllerSnapshot) {
        self.rows.push(HistoryRow::new(sim_time, snapshot));
    }

    pub fn finalize(self) -> Result<HistoryTable, HistoryError> {
        if self.rows.is_empty() {
            return Err(HistoryError::Empty);
        }
        Ok(HistoryTable { rows: self.rows })
    }
}

/// Finished, read-only history ordered by tick index.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTable {
    rows: Vec<HistoryRow>,
}

impl HistoryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn series(&self, series: Series) -> Vec<f64> {
        self.rows.iter().map(|row| row.value(series)).collect()
    }

    pub fn series_by_name(&self, name: &str) -> Option<Vec<f64>> {
        Series::from_name(name).map(|s| self.series(s))
    }

    pub fn last(&self) -> &HistoryRow {
        &self.rows[self.rows.len() - 1]
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), HistoryError> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, HistoryError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(buffer)
    }
}
