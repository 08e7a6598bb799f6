//! Streaming per-axis integration: acceleration -> velocity -> displacement.
//!
//! Each level uses a split-sign trapezoid: the half-difference term is added
//! when the filtered input is non-negative and subtracted when it is
//! negative. This is not the textbook trapezoid and must stay that way; it
//! suppresses cancellation artifacts of the tag's accelerometer.
//!
//! ```text
//! V = A_prev·T ± |(A − A_prev)/2|·T
//! D = V_prev·T ± |(V − V_prev)/2|·T
//! ```
//!
//! Units: acceleration mm/s², velocity mm/s, displacement mm.

use crate::calibration::CalibrationOffset;
use crate::filter::STANDARD_GRAVITY;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Per-axis values `{x, y, z}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisTriple {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Peak kinematics since the previous flush.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Flush time, microseconds since the Unix epoch.
    #[serde(rename = "tstamp")]
    pub timestamp_micros: i64,
    /// Displacement (mm) at the velocity peak.
    #[serde(rename = "D")]
    pub displacement: AxisTriple,
    /// Peak |velocity| (mm/s).
    #[serde(rename = "V")]
    pub velocity: AxisTriple,
    /// Acceleration (mm/s²) at the velocity peak.
    #[serde(rename = "A")]
    pub acceleration: AxisTriple,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AxisPeak {
    a: f64,
    v: f64,
    d: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct AxisIntegrator {
    prev_a: f64,
    prev_v: f64,
    peak: AxisPeak,
}

impl AxisIntegrator {
    /// `a` in mm/s²; `non_negative` selects the branch.
    fn step(&mut self, a: f64, non_negative: bool, t: f64) {
        let half_a = ((a - self.prev_a) / 2.0).abs() * t;
        let v = if non_negative {
            self.prev_a * t + half_a
        } else {
            self.prev_a * t - half_a
        };

        let half_v = ((v - self.prev_v) / 2.0).abs() * t;
        let d = if non_negative {
            self.prev_v * t + half_v
        } else {
            self.prev_v * t - half_v
        };

        self.prev_a = a;
        self.prev_v = v;

        if self.peak.v < v.abs() {
            self.peak = AxisPeak {
                a: a.abs(),
                v: v.abs(),
                d: d.abs(),
            };
        }
    }
}

/// Causal integrator for one stream, with windowed peak capture.
#[derive(Debug, Clone)]
pub struct KinematicIntegrator {
    axes: [AxisIntegrator; 3],
    period_s: f64,
    interval_micros: i64,
    last_flush: Option<i64>,
}

impl KinematicIntegrator {
    pub fn new(period_s: f64, reporting_interval_s: f64) -> Self {
        Self {
            axes: [AxisIntegrator::default(); 3],
            period_s,
            interval_micros: (reporting_interval_s * 1_000_000.0) as i64,
            last_flush: None,
        }
    }

    /// Integrate one low-pass filtered sample (m/s²).
    pub fn update(&mut self, filtered: DVec3, offset: CalibrationOffset) {
        let bias = offset.0;
        let t = self.period_s;

        self.axes[0].step((filtered.x - bias.x) * 1000.0, filtered.x >= 0.0, t);
        self.axes[1].step((filtered.y - bias.y) * 1000.0, filtered.y >= 0.0, t);

        let az = if filtered.z >= 0.0 {
            (filtered.z - bias.z - STANDARD_GRAVITY) * 1000.0
        } else {
            (filtered.z - bias.z + STANDARD_GRAVITY) * 1000.0
        };
        self.axes[2].step(az, filtered.z >= 0.0, t);
    }

    /// Emit and reset the peaks once more than one reporting interval has
    /// passed since the previous flush (or since the first call).
    pub fn maybe_flush(&mut self, timestamp_micros: i64) -> Option<ReportRecord> {
        let last = *self.last_flush.get_or_insert(timestamp_micros);
        if timestamp_micros - last <= self.interval_micros {
            return None;
        }
        self.last_flush = Some(timestamp_micros);
        Some(self.flush(timestamp_micros))
    }

    /// Build a report from the current peaks and zero them. Previous
    /// acceleration/velocity carry over.
    pub fn flush(&mut self, timestamp_micros: i64) -> ReportRecord {
        let [x, y, z] = self.axes.map(|axis| axis.peak);
        for axis in &mut self.axes {
            axis.peak = AxisPeak::default();
        }
        ReportRecord {
            timestamp_micros,
            displacement: AxisTriple { x: x.d, y: y.d, z: z.d },
            velocity: AxisTriple { x: x.v, y: y.v, z: z.v },
            acceleration: AxisTriple { x: x.a, y: y.a, z: z.a },
        }
    }

    pub fn reset(&mut self) {
        self.axes = [AxisIntegrator::default(); 3];
        self.last_flush = None;
    }
}
