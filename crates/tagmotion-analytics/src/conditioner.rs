use crate::calibration::{CalibrationOffset, Calibrator};
use crate::filter::{motion_magnitude, TriangularFilter};
use glam::DVec3;
use tagmotion_config::AnalyticsConfig;
use tagmotion_link::RawFrame;

/// Output of conditioning one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conditioned {
    /// Sample went into calibration; nothing downstream may run yet.
    Calibrating { collected: usize, target: usize },
    Ready(ConditionedSample),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionedSample {
    /// `|a| - 9.81`, the input of the event detectors.
    pub magnitude: f64,
    /// Triangular low-pass output for the integrator. `None` while the
    /// window fills or when the window holds a NaN.
    pub filtered: Option<DVec3>,
    pub offset: CalibrationOffset,
}

/// Calibration + streaming low-pass + gravity compensation for one stream.
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    calibrator: Calibrator,
    smoother: TriangularFilter,
    calibration_samples: usize,
}

impl SignalConditioner {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            calibrator: Calibrator::new(config.calibration_samples),
            smoother: TriangularFilter::new(config.smoothing_window),
            calibration_samples: config.calibration_samples,
        }
    }

    pub fn condition(&mut self, frame: &RawFrame) -> Conditioned {
        let Some(offset) = self.calibrator.offset() else {
            self.calibrator.push(frame.accel);
            let (collected, target) = self
                .calibrator
                .progress()
                .unwrap_or((self.calibration_samples, self.calibration_samples));
            return Conditioned::Calibrating { collected, target };
        };

        let filtered = self.smoother.push(frame.accel).filter(|f| !f.is_nan());
        Conditioned::Ready(ConditionedSample {
            magnitude: motion_magnitude(frame.accel),
            filtered,
            offset,
        })
    }

    pub fn offset(&self) -> Option<CalibrationOffset> {
        self.calibrator.offset()
    }

    /// Drop calibration and filter state; the next frames recalibrate.
    pub fn reset(&mut self) {
        self.calibrator.recalibrate(self.calibration_samples);
        self.smoother.reset();
    }
}
