//! Fixed conversions from the aviation units found in processed track files.

/// [m/ft]
pub const FEET_TO_METERS: f64 = 0.3048;

/// [nm/h] * [ft/nm] / [s/h] * [m/ft] = [m/s]
pub const KNOTS_TO_METERS_PER_SECOND: f64 = 6076.12 / 3600.0 * 0.3048;

/// [ft/min] * [m/ft] / [s/min] = [m/s]
pub const FEET_PER_MINUTE_TO_METERS_PER_SECOND: f64 = 0.3048 / 60.0;

pub fn feet_to_meters(feet: f64) -> f64 {
    feet * FEET_TO_METERS
}

pub fn knots_to_meters_per_second(knots: f64) -> f64 {
    knots * KNOTS_TO_METERS_PER_SECOND
}

pub fn feet_per_minute_to_meters_per_second(feet_per_minute: f64) -> f64 {
    feet_per_minute * FEET_PER_MINUTE_TO_METERS_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_use_exact_factors() {
        assert_eq!(feet_to_meters(35000.0), 35000.0 * 0.3048);
        assert_eq!(
            knots_to_meters_per_second(450.0),
            450.0 * (6076.12 / 3600.0 * 0.3048)
        );
        assert_eq!(
            feet_per_minute_to_meters_per_second(-1200.0),
            -1200.0 * (0.3048 / 60.0)
        );
    }

    #[test]
    fn one_knot_is_about_half_a_meter_per_second() {
        approx::assert_relative_eq!(KNOTS_TO_METERS_PER_SECOND, 0.514444, epsilon = 1e-6);
    }
}
