use crate::config::ControllerSettings;
use crate::controller::geodesy::{enu_to_mount, pointing, Tripod};
use crate::controller::{Controller, ControllerError, ControllerSnapshot};
use crate::message::{ConfigPayload, ObjectPayload, OrientationPayload};

/// Camera-less stand-in for the PTZ controller: the commanded rates are
/// integrated instead of being sent to hardware.
#[derive(Debug, Clone)]
pub struct SimulatedController {
    settings: ControllerSettings,
    tripod: Option<Tripod>,
    orientation: OrientationPayload,
    object: Option<ObjectPayload>,
    /// Camera clock [s], tied to the latest object report.
    time_c: f64,
    state: ControllerSnapshot,
}

impl SimulatedController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            tripod: None,
            orientation: OrientationPayload::zero(),
            object: None,
            time_c: 0.0,
            state: ControllerSnapshot::default(),
        }
    }

    #[cfg(test)]
    pub fn camera_time(&self) -> f64 {
        self.time_c
    }

    fn compute_target(&mut self) {
        let (Some(tripod), Some(object)) = (self.tripod, self.object.as_ref()) else {
            return;
        };

        let elapsed = self.time_c + self.settings.lead_time - object.timestamp;
        let origin = tripod.enu_of(object.latitude, object.longitude, object.altitude);
        let heading = object.track.unwrap_or(0.0).to_radians();
        let velocity = [
            object.horizontal_velocity * heading.sin(),
            object.horizontal_velocity * heading.cos(),
            object.vertical_velocity,
        ];
        let position = [
            origin[0] + velocity[0] * elapsed,
            origin[1] + velocity[1] * elapsed,
            origin[2] + velocity[2] * elapsed,
        ];

        let (rho, tau, rho_dot, tau_dot) = pointing(
            enu_to_mount(position, &self.orientation),
            enu_to_mount(velocity, &self.orientation),
        );
        self.state.rho_o = rho;
        self.state.tau_o = tau;
        self.state.rho_dot_o = rho_dot;
        self.state.tau_dot_o = tau_dot;
    }

    fn compute_command(&mut self) {
        let s = &self.settings;
        let delta_rho = wrap_180(self.state.rho_o - self.state.rho_c);
        let delta_tau = self.state.tau_o - self.state.tau_c;

        self.state.rho_dot_c = clamp_rate(
            self.state.rho_dot_o + s.pan_gain * delta_rho,
            s.pan_rate_min,
            s.pan_rate_max,
        );
        self.state.tau_dot_c = clamp_rate(
            self.state.tau_dot_o + s.tilt_gain * delta_tau,
            s.tilt_rate_min,
            s.tilt_rate_max,
        );
    }
}

impl Controller for SimulatedController {
    fn on_config(&mut self, config: ConfigPayload) -> Result<(), ControllerError> {
        log::info!(
            "Tripod at lon {:.4}, lat {:.4}, alt {:.2} m",
            config.tripod_longitude,
            config.tripod_latitude,
            config.tripod_altitude
        );
        self.tripod = Some(Tripod::from(config));
        Ok(())
    }

    fn on_orientation(&mut self, orientation: OrientationPayload) -> Result<(), ControllerError> {
        self.orientation = orientation;
        Ok(())
    }

    fn on_object(&mut self, object: ObjectPayload) -> Result<(), ControllerError> {
        if self.tripod.is_none() {
            return Err(ControllerError::NotConfigured);
        }
        if self.object.is_none() {
            self.time_c = object.timestamp;
            log::info!(
                "Tracking object {}",
                object.object_id.as_deref().unwrap_or("without id")
            );
        }
        self.object = Some(object);
        self.compute_target();
        self.compute_command();
        Ok(())
    }

    fn update_pointing(&mut self) {
        if self.object.is_none() {
            return;
        }
        let dt = self.settings.update_interval;
        self.time_c += dt;
        self.state.rho_c = (self.state.rho_c + self.state.rho_dot_c * dt).rem_euclid(360.0);
        self.state.tau_c = (self.state.tau_c + self.state.tau_dot_c * dt).clamp(-90.0, 90.0);
        self.compute_target();
        self.compute_command();
    }

    fn snapshot(&self) -> ControllerSnapshot {
        self.state
    }
}

fn wrap_180(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Keep the sign, bound a non-zero magnitude to [min, max].
fn clamp_rate(rate: f64, min: f64, max: f64) -> f64 {
    if rate == 0.0 {
        return 0.0;
    }
    rate.signum() * rate.abs().clamp(min, max)
}
