use crate::message::{ConfigPayload, OrientationPayload};

// WGS-84
const SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;
const ECCENTRICITY_SQ: f64 = 0.00669437999014;

#[derive(Debug, Clone, Copy)]
pub struct Tripod {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl From<ConfigPayload> for Tripod {
    fn from(config: ConfigPayload) -> Self {
        Self {
            latitude_deg: config.tripod_latitude,
            longitude_deg: config.tripod_longitude,
            altitude_m: config.tripod_altitude,
        }
    }
}

impl Tripod {
    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    /// East-north-up offset of a geodetic point from the tripod, in meters.
    pub fn enu_of(&self, latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> [f64; 3] {
        let origin = geodetic_to_ecef(self.latitude_deg, self.longitude_deg, self.altitude_m);
        let point = geodetic_to_ecef(latitude_deg, longitude_deg, altitude_m);
        let dr = [
            point[0] - origin[0],
            point[1] - origin[1],
            point[2] - origin[2],
        ];
        ecef_to_enu(dr, self.lat_rad(), self.lon_rad())
    }
}

pub fn geodetic_to_ecef(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> [f64; 3] {
    let lat = latitude_deg.to_radians();
    let lon = longitude_deg.to_radians();
    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let n = SEMI_MAJOR_AXIS_M / (1.0 - ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
    [
        (n + altitude_m) * cos_lat * lon.cos(),
        (n + altitude_m) * cos_lat * lon.sin(),
        (n * (1.0 - ECCENTRICITY_SQ) + altitude_m) * sin_lat,
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> [f64; 3] {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    [east, north, up]
}

/// Express an east-north-up vector in the mount frame: yaw about up,
/// then pitch about east, then roll about north.
pub fn enu_to_mount(v: [f64; 3], orientation: &OrientationPayload) -> [f64; 3] {
    let (sy, cy) = orientation.tripod_yaw.to_radians().sin_cos();
    let (sp, cp) = orientation.tripod_pitch.to_radians().sin_cos();
    let (sr, cr) = orientation.tripod_roll.to_radians().sin_cos();

    // Yaw is clockwise from north, like a heading.
    let yawed = [cy * v[0] - sy * v[1], sy * v[0] + cy * v[1], v[2]];
    let pitched = [
        yawed[0],
        cp * yawed[1] + sp * yawed[2],
        -sp * yawed[1] + cp * yawed[2],
    ];
    [
        cr * pitched[0] - sr * pitched[2],
        pitched[1],
        sr * pitched[0] + cr * pitched[2],
    ]
}

/// Pan and tilt angles in degrees and their rates in degrees per second for
/// a target at `r` moving with `v`, both in the mount frame.
pub fn pointing(r: [f64; 3], v: [f64; 3]) -> (f64, f64, f64, f64) {
    let horizontal_sq = r[0] * r[0] + r[1] * r[1];
    let horizontal = horizontal_sq.sqrt();
    let range_sq = horizontal_sq + r[2] * r[2];

    let rho = r[0].atan2(r[1]).to_degrees().rem_euclid(360.0);
    let tau = r[2].atan2(horizontal).to_degrees();

    let rho_dot = if horizontal_sq > 0.0 {
        ((r[1] * v[0] - r[0] * v[1]) / horizontal_sq).to_degrees()
    } else {
        0.0
    };
    let tau_dot = if horizontal > 0.0 && range_sq > 0.0 {
        let radial = (r[0] * v[0] + r[1] * v[1]) / horizontal;
        ((horizontal * v[2] - r[2] * radial) / range_sq).to_degrees()
    } else {
        0.0
    };

    (rho, tau, rho_dot, tau_dot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tripod() -> Tripod {
        Tripod {
            latitude_deg: 38.0,
            longitude_deg: -77.0,
            altitude_m: 86.46,
        }
    }

    #[test]
    fn point_above_tripod_is_straight_up() {
        let enu = tripod().enu_of(38.0, -77.0, 1086.46);
        assert_relative_eq!(enu[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(enu[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(enu[2], 1000.0, epsilon = 1e-6);
    }

    #[test]
    fn point_to_the_north_has_zero_pan() {
        let enu = tripod().enu_of(38.01, -77.0, 86.46);
        let (rho, _, _, _) = pointing(enu, [0.0, 0.0, 0.0]);
        assert!(rho < 1e-6 || rho > 360.0 - 1e-6);
        assert!(enu[1] > 1000.0);
    }

    #[test]
    fn pan_is_clockwise_from_north() {
        let (rho, tau, _, _) = pointing([1000.0, 0.0, 1000.0], [0.0; 3]);
        assert_relative_eq!(rho, 90.0);
        assert_relative_eq!(tau, 45.0);

        let (rho, _, _, _) = pointing([-1000.0, 0.0, 0.0], [0.0; 3]);
        assert_relative_eq!(rho, 270.0);
    }

    #[test]
    fn crossing_target_pans_at_v_over_r() {
        // 100 m/s eastward, 1 km north of the mount.
        let (_, _, rho_dot, tau_dot) = pointing([0.0, 1000.0, 0.0], [100.0, 0.0, 0.0]);
        assert_relative_eq!(rho_dot, 0.1_f64.to_degrees(), epsilon = 1e-9);
        assert_relative_eq!(tau_dot, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_orientation_is_identity() {
        let v = [1.0, 2.0, 3.0];
        let out = enu_to_mount(v, &OrientationPayload::zero());
        assert_relative_eq!(out[0], 1.0);
        assert_relative_eq!(out[1], 2.0);
        assert_relative_eq!(out[2], 3.0);
    }

    #[test]
    fn yaw_shifts_pan() {
        let orientation = OrientationPayload {
            tripod_yaw: 90.0,
            tripod_pitch: 0.0,
            tripod_roll: 0.0,
        };
        let mount = enu_to_mount([1000.0, 0.0, 0.0], &orientation);
        let (rho, _, _, _) = pointing(mount, [0.0; 3]);
        assert_relative_eq!(rho, 0.0, epsilon = 1e-9);
    }
}
