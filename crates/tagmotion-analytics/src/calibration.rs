use crate::filter::STANDARD_GRAVITY;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Static accelerometer bias, m/s^2. The z component has gravity removed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationOffset(pub DVec3);

/// Averages the first `target` samples of a stream, which is presumed
/// stationary, into a [`CalibrationOffset`].
#[derive(Debug, Clone)]
pub struct Calibrator {
    state: CalibrationState,
}

#[derive(Debug, Clone)]
enum CalibrationState {
    Collecting { sum: DVec3, count: usize, target: usize },
    Calibrated(CalibrationOffset),
}

impl Calibrator {
    pub fn new(target: usize) -> Self {
        Self {
            state: CalibrationState::Collecting {
                sum: DVec3::ZERO,
                count: 0,
                target: target.max(1),
            },
        }
    }

    /// Feed one raw acceleration sample. Returns the offset on the sample
    /// that completes calibration, `None` before and after. Non-finite
    /// samples are not counted.
    pub fn push(&mut self, accel: DVec3) -> Option<CalibrationOffset> {
        let CalibrationState::Collecting { sum, count, target } = &mut self.state else {
            return None;
        };
        if !accel.is_finite() {
            return None;
        }
        *sum += accel;
        *count += 1;
        if *count < *target {
            return None;
        }

        let mean = *sum / *count as f64;
        let offset = CalibrationOffset(DVec3::new(mean.x, mean.y, mean.z - STANDARD_GRAVITY));
        self.state = CalibrationState::Calibrated(offset);
        tracing::info!(
            cax = offset.0.x,
            cay = offset.0.y,
            caz = offset.0.z,
            "Auto-calibration complete"
        );
        Some(offset)
    }

    pub fn offset(&self) -> Option<CalibrationOffset> {
        match self.state {
            CalibrationState::Calibrated(offset) => Some(offset),
            CalibrationState::Collecting { .. } => None,
        }
    }

    /// `(collected, target)` while collecting.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match self.state {
            CalibrationState::Collecting { count, target, .. } => Some((count, target)),
            CalibrationState::Calibrated(_) => None,
        }
    }

    /// Restart calibration, e.g. after a reconnect.
    pub fn recalibrate(&mut self, target: usize) {
        *self = Self::new(target);
        tracing::info!(samples = target, "Recalibration started");
    }
}

/// One-shot calibration over a stored run of stationary samples.
/// `None` if fewer than `target` samples are available.
pub fn auto_calibrate(samples: &[DVec3], target: usize) -> Option<CalibrationOffset> {
    let mut calibrator = Calibrator::new(target);
    samples.iter().find_map(|&s| calibrator.push(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stationary(n: usize) -> Vec<DVec3> {
        (0..n)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.01 } else { -0.01 };
                DVec3::new(0.12 + wobble, -0.05, 9.9 + wobble)
            })
            .collect()
    }

    #[test]
    fn offset_is_mean_minus_gravity_on_z() {
        let offset = auto_calibrate(&stationary(1024), 1024).unwrap();
        assert!((offset.0.x - 0.12).abs() < 1e-9);
        assert!((offset.0.y + 0.05).abs() < 1e-9);
        assert!((offset.0.z - (9.9 - STANDARD_GRAVITY)).abs() < 1e-9);
    }

    #[test]
    fn calibration_is_idempotent() {
        let samples = stationary(300);
        let a = auto_calibrate(&samples, 256).unwrap();
        let b = auto_calibrate(&samples, 256).unwrap();
        assert!((a.0 - b.0).length() < 1e-12);
    }

    #[test]
    fn completes_exactly_at_target() {
        let mut calibrator = Calibrator::new(3);
        assert!(calibrator.push(DVec3::ZERO).is_none());
        assert_eq!(calibrator.progress(), Some((1, 3)));
        assert!(calibrator.push(DVec3::ZERO).is_none());
        assert!(calibrator.push(DVec3::ZERO).is_some());
        assert!(calibrator.offset().is_some());
        // Further samples do not move the offset.
        assert!(calibrator.push(DVec3::splat(100.0)).is_none());
        assert_eq!(calibrator.offset().unwrap().0.x, 0.0);

        calibrator.recalibrate(2);
        assert!(calibrator.offset().is_none());
        assert_eq!(calibrator.progress(), Some((0, 2)));
    }

    #[test]
    fn non_finite_samples_are_skipped() {
        let mut calibrator = Calibrator::new(3);
        calibrator.push(DVec3::new(0.2, 0.0, 9.9));
        assert!(calibrator.push(DVec3::new(f64::NAN, 0.0, 9.8)).is_none());
        assert!(calibrator.push(DVec3::new(0.0, f64::INFINITY, 9.8)).is_none());
        assert_eq!(calibrator.progress(), Some((1, 3)));

        calibrator.push(DVec3::new(0.2, 0.0, 9.9));
        let offset = calibrator.push(DVec3::new(0.2, 0.0, 9.9)).unwrap();
        assert!(offset.0.is_finite());
        assert!((offset.0.x - 0.2).abs() < 1e-9);
    }

    #[test]
    fn too_few_samples() {
        assert!(auto_calibrate(&stationary(10), 20).is_none());
    }
}
