//! Causal per-stream pipeline.
//!
//! Owns the conditioner, integrator and detector state of exactly one
//! stream. Frames must arrive in capture order; nothing here is shared.

use crate::conditioner::{Conditioned, SignalConditioner};
use crate::integrator::{KinematicIntegrator, ReportRecord};
use crate::jump::JumpDetector;
use crate::phase::{MovementPhase, SpeedHistory};
use crate::speed::SpeedEstimator;
use crate::step::StepDetector;
use serde::{Deserialize, Serialize};
use tagmotion_config::AnalyticsConfig;
use tagmotion_link::RawFrame;

/// Per-frame metrics once the stream is calibrated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    /// Gravity-compensated acceleration magnitude (m/s²).
    pub magnitude: f64,
    /// Streaming speed estimate (km/h, corrected).
    pub speed: f64,
    pub phase: MovementPhase,
    pub step_count: u64,
    pub jump_count: u64,
    /// A step completed on this frame.
    pub step: bool,
    /// A jump peak was confirmed on this frame.
    pub jump: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    /// `None` while calibrating or for NaN samples.
    pub live: Option<LiveMetrics>,
    pub report: Option<ReportRecord>,
}

pub struct StreamPipeline {
    conditioner: SignalConditioner,
    integrator: KinematicIntegrator,
    steps: StepDetector,
    jumps: JumpDetector,
    speed: SpeedEstimator,
    history: SpeedHistory,
    sample_count: u64,
}

impl StreamPipeline {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            conditioner: SignalConditioner::new(config),
            integrator: KinematicIntegrator::new(config.sample_period_s, config.reporting_interval_s),
            steps: StepDetector::new(config.step_threshold),
            jumps: JumpDetector::new(config),
            speed: SpeedEstimator::new(config.speed_window),
            history: SpeedHistory::new(config.phase_history_capacity),
            sample_count: 0,
        }
    }

    pub fn process(&mut self, frame: &RawFrame) -> FrameOutput {
        let sample = match self.conditioner.condition(frame) {
            Conditioned::Calibrating { collected, target } => {
                if collected % 256 == 0 {
                    tracing::debug!(collected, target, "Calibrating");
                }
                return FrameOutput::default();
            }
            Conditioned::Ready(sample) => sample,
        };

        if sample.magnitude.is_nan() {
            tracing::trace!("Skipping NaN sample");
            return FrameOutput::default();
        }
        self.sample_count += 1;

        let ts = frame.timestamp_secs();
        let active = frame.is_active();
        let step = self
            .steps
            .update(sample.magnitude, frame.timestamp_micros, active)
            .is_some();
        let jump = self.jumps.update(sample.magnitude, ts).is_some();
        let speed = self.speed.update(frame.accel.z, ts, active);
        self.history.push(speed);

        if let Some(filtered) = sample.filtered {
            self.integrator.update(filtered, sample.offset);
        }
        let report = self.integrator.maybe_flush(frame.timestamp_micros);
        if let Some(report) = &report {
            tracing::info!(
                vx = report.velocity.x,
                vy = report.velocity.y,
                vz = report.velocity.z,
                samples = self.sample_count,
                "Kinematic report"
            );
        }

        FrameOutput {
            live: Some(LiveMetrics {
                magnitude: sample.magnitude,
                speed,
                phase: self.history.phase(),
                step_count: self.steps.step_count(),
                jump_count: self.jumps.jump_count(),
                step,
                jump,
            }),
            report,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.conditioner.offset().is_some()
    }

    /// Start over as a new stream: recalibrate and zero all detector and
    /// integrator state.
    pub fn reset(&mut self) {
        self.conditioner.reset();
        self.integrator.reset();
        self.steps.reset();
        self.jumps.reset();
        self.speed.reset();
        self.history.clear();
        self.sample_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::STANDARD_GRAVITY;
    use glam::DVec3;

    const PERIOD_MICROS: i64 = 20_000;

    fn frame(index: i64, accel: DVec3) -> RawFrame {
        RawFrame {
            position: None,
            accel,
            gyro: DVec3::ZERO,
            battery_life: 100,
            heart_rate: 80,
            serial_number: 1,
            activity_status: 1,
            timestamp_micros: index * PERIOD_MICROS,
        }
    }

    fn config() -> AnalyticsConfig {
        AnalyticsConfig {
            calibration_samples: 8,
            smoothing_window: 4,
            reporting_interval_s: 1.0,
            ..AnalyticsConfig::default()
        }
    }

    #[test]
    fn no_metrics_until_calibrated() {
        let mut pipeline = StreamPipeline::new(&config());
        for i in 0..8 {
            let out = pipeline.process(&frame(i, DVec3::new(0.0, 0.0, STANDARD_GRAVITY)));
            assert_eq!(out, FrameOutput::default());
        }
        assert!(pipeline.is_calibrated());
        let out = pipeline.process(&frame(8, DVec3::new(0.0, 0.0, STANDARD_GRAVITY)));
        let live = out.live.unwrap();
        assert_eq!(live.step_count, 0);
        assert_eq!(live.phase, MovementPhase::Idle);
    }

    #[test]
    fn counts_steps_and_reports_each_interval() {
        let mut pipeline = StreamPipeline::new(&config());
        let mut index = 0;
        for _ in 0..8 {
            pipeline.process(&frame(index, DVec3::new(0.0, 0.0, STANDARD_GRAVITY)));
            index += 1;
        }

        // One rest sample primes the step detector's previous value.
        pipeline.process(&frame(index, DVec3::new(0.0, 0.0, 9.81)));
        index += 1;

        // Square bounce: 5 samples at +3 m/s² over gravity, 5 at rest.
        let mut reports = Vec::new();
        let mut last = None;
        for cycle in 0..15 {
            for k in 0..10 {
                let bump = if k < 5 { 3.0 } else { 0.0 };
                let accel = DVec3::new(0.2 * (cycle as f64), 0.0, 9.81 + bump);
                let out = pipeline.process(&frame(index, accel));
                index += 1;
                if let Some(report) = out.report {
                    reports.push(report);
                }
                last = out.live;
            }
        }

        let live = last.unwrap();
        assert_eq!(live.step_count, 15);
        // 151 samples at 20 ms span ~3 s; the first one starts the interval.
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.velocity.x >= 0.0));
        assert!(reports[0].velocity.x > 0.0);
    }

    #[test]
    fn nan_during_calibration_does_not_poison_the_integrator() {
        let mut pipeline = StreamPipeline::new(&config());
        let rest = DVec3::new(0.0, 0.0, STANDARD_GRAVITY);
        let mut index = 0;
        // Eight good samples with one NaN reading among them.
        for i in 0..9 {
            let accel = if i == 3 { DVec3::new(f64::NAN, 0.0, 9.8) } else { rest };
            assert_eq!(pipeline.process(&frame(index, accel)), FrameOutput::default());
            index += 1;
        }
        assert!(pipeline.is_calibrated());
        assert!(pipeline.conditioner.offset().unwrap().0.is_finite());

        // +-3 m/s² square wave on x.
        let mut reports = Vec::new();
        for i in 0..192 {
            let x = if (i / 5) % 2 == 0 { 3.0 } else { -3.0 };
            let out = pipeline.process(&frame(index, DVec3::new(x, 0.0, STANDARD_GRAVITY)));
            index += 1;
            reports.extend(out.report);
        }

        assert!(!reports.is_empty());
        assert!(reports.iter().all(|r| r.velocity.x.is_finite() && r.acceleration.x.is_finite()));
        assert!(reports.iter().any(|r| r.velocity.x != 0.0));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut pipeline = StreamPipeline::new(&config());
        for i in 0..20 {
            pipeline.process(&frame(i, DVec3::new(0.0, 0.0, STANDARD_GRAVITY)));
        }
        assert!(pipeline.is_calibrated());
        pipeline.reset();
        assert!(!pipeline.is_calibrated());
        let out = pipeline.process(&frame(21, DVec3::new(0.0, 0.0, STANDARD_GRAVITY)));
        assert!(out.live.is_none());
    }

    #[test]
    fn nan_frames_are_skipped() {
        let mut pipeline = StreamPipeline::new(&config());
        for i in 0..8 {
            pipeline.process(&frame(i, DVec3::new(0.0, 0.0, STANDARD_GRAVITY)));
        }
        let out = pipeline.process(&frame(8, DVec3::new(f64::NAN, 0.0, 9.8)));
        assert_eq!(out, FrameOutput::default());
    }
}
