use serde::Serialize;

/// Target and commanded pointing, in degrees and degrees per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub rho_o: f64,
    pub tau_o: f64,
    pub rho_dot_o: f64,
    pub tau_dot_o: f64,
    pub rho_c: f64,
    pub tau_c: f64,
    pub rho_dot_c: f64,
    pub tau_dot_c: f64,
}

impl ControllerSnapshot {
    #[cfg(test)]
    pub fn abs_diff_max(&self, other: &ControllerSnapshot) -> f64 {
        [
            self.rho_o - other.rho_o,
            self.tau_o - other.tau_o,
            self.rho_dot_o - other.rho_dot_o,
            self.tau_dot_o - other.tau_dot_o,
            self.rho_c - other.rho_c,
            self.tau_c - other.tau_c,
            self.rho_dot_c - other.rho_dot_c,
            self.tau_dot_c - other.tau_dot_c,
        ]
        .iter()
        .fold(0.0, |acc, d| acc.max(d.abs()))
    }
}
