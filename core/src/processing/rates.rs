use crate::timeline::GpsStamp;

/// Folds an angle difference into (-180, 180].
pub fn wrap_degrees(delta: f64) -> f64 {
    let wrapped = (delta + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Heading rate in deg/s between consecutive rows; the first row is 0.
pub fn yaw_rates(stamps: &[GpsStamp], headings_deg: &[f64]) -> Vec<f64> {
    let mut rates = Vec::with_capacity(headings_deg.len());
    for idx in 0..headings_deg.len().min(stamps.len()) {
        if idx == 0 {
            rates.push(0.0);
            continue;
        }
        let dt = stamps[idx].seconds_since(&stamps[idx - 1]);
        let rate = if dt > 0.0 {
            wrap_degrees(headings_deg[idx] - headings_deg[idx - 1]) / dt
        } else {
            0.0
        };
        rates.push(rate);
    }
    rates
}

/// Centripetal acceleration in m/s² from speed (m/s) and yaw rate (deg/s).
pub fn lateral_acceleration(speeds: &[f64], yaw_rates_deg: &[f64]) -> Vec<f64> {
    speeds
        .iter()
        .zip(yaw_rates_deg)
        .map(|(speed, rate)| speed * rate.to_radians())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn stamps(seconds: &[u32]) -> Vec<GpsStamp> {
        seconds
            .iter()
            .map(|s| GpsStamp::parse(&format!("202409041015{:02}", s)).unwrap())
            .collect()
    }

    #[test]
    fn wrap_keeps_the_short_way_round() {
        assert_eq!(wrap_degrees(358.0), -2.0);
        assert_eq!(wrap_degrees(-358.0), 2.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert_eq!(wrap_degrees(45.0), 45.0);
    }

    #[test]
    fn yaw_rate_crosses_north_without_a_jump() {
        let rates = yaw_rates(&stamps(&[0, 1, 3]), &[358.0, 2.0, 12.0]);
        assert_eq!(rates[0], 0.0);
        assert_abs_diff_eq!(rates[1], 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rates[2], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn lateral_acceleration_uses_radians() {
        let lat = lateral_acceleration(&[10.0], &[180.0 / std::f64::consts::PI]);
        assert_abs_diff_eq!(lat[0], 10.0, epsilon = 1e-9);
    }
}
