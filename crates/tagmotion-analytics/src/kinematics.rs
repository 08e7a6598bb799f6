//! Position-based kinematics for stored windows.
//!
//! Unlike the streaming integrator this never touches the accelerometer:
//! speed comes from finite differences of recorded position, displacement
//! from a plain trapezoid over that speed series.

use glam::DVec2;

/// Speed (position units per second) at each sample; the first sample is 0.
///
/// A step with a missing position on either side or a non-increasing
/// timestamp contributes 0.
pub fn position_speeds(timestamps_micros: &[i64], positions: &[Option<DVec2>]) -> Vec<f64> {
    let mut speeds = Vec::with_capacity(timestamps_micros.len());
    if timestamps_micros.is_empty() {
        return speeds;
    }
    speeds.push(0.0);

    for i in 1..timestamps_micros.len().min(positions.len()) {
        let dt = (timestamps_micros[i] - timestamps_micros[i - 1]) as f64 / 1_000_000.0;
        let speed = match (positions[i - 1], positions[i]) {
            (Some(a), Some(b)) if dt > 0.0 => (b - a).length() / dt,
            _ => 0.0,
        };
        speeds.push(speed);
    }
    speeds
}

/// Cumulative trapezoidal integral of `speeds` over elapsed time; starts at 0.
pub fn cumulative_displacement(timestamps_micros: &[i64], speeds: &[f64]) -> Vec<f64> {
    let mut displacement = Vec::with_capacity(speeds.len());
    let mut total = 0.0;
    for i in 0..speeds.len().min(timestamps_micros.len()) {
        if i > 0 {
            let dt = (timestamps_micros[i] - timestamps_micros[i - 1]) as f64 / 1_000_000.0;
            total += (speeds[i] + speeds[i - 1]) / 2.0 * dt;
        }
        displacement.push(total);
    }
    displacement
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn speed_from_position_differences() {
        let ts = [0, 500_000, 1_000_000, 2_000_000];
        let pos = [
            Some(DVec2::new(0.0, 0.0)),
            Some(DVec2::new(3.0, 4.0)),
            Some(DVec2::new(3.0, 4.0)),
            Some(DVec2::new(3.0, 6.0)),
        ];
        let speeds = position_speeds(&ts, &pos);
        assert_eq!(speeds.len(), 4);
        assert!(close(speeds[0], 0.0));
        assert!(close(speeds[1], 10.0));
        assert!(close(speeds[2], 0.0));
        assert!(close(speeds[3], 2.0));
    }

    #[test]
    fn gaps_and_duplicate_timestamps_contribute_zero() {
        let ts = [0, 1_000_000, 1_000_000, 2_000_000];
        let pos = [
            Some(DVec2::ZERO),
            None,
            Some(DVec2::new(1.0, 0.0)),
            Some(DVec2::new(2.0, 0.0)),
        ];
        let speeds = position_speeds(&ts, &pos);
        assert_eq!(speeds, vec![0.0, 0.0, 0.0, 1.0]);
        assert!(position_speeds(&[], &[]).is_empty());
    }

    #[test]
    fn trapezoid_over_elapsed_time() {
        let ts = [0, 1_000_000, 3_000_000];
        let speeds = [0.0, 2.0, 2.0];
        let d = cumulative_displacement(&ts, &speeds);
        assert!(close(d[0], 0.0));
        assert!(close(d[1], 1.0));
        assert!(close(d[2], 5.0));
    }
}
