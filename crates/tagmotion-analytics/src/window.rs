//! Retrospective analysis of a stored window of samples.
//!
//! Every invocation builds fresh detector state; nothing is shared with the
//! live streams, so concurrent queries are independent.

use crate::filter::motion_magnitude;
use crate::jump::detect_jumps;
use crate::kinematics::{cumulative_displacement, position_speeds};
use crate::phase::{classify_phase, MovementPhase};
use crate::step::detect_steps;
use serde::{Deserialize, Serialize};
use tagmotion_config::AnalyticsConfig;
use tagmotion_link::RawFrame;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSeries {
    pub data: Vec<f64>,
    pub timestamps: Vec<i64>,
    pub average: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplacementSeries {
    pub data: Vec<f64>,
    pub timestamps: Vec<i64>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub count: usize,
    /// Completion time of each step.
    pub timestamps: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpSummary {
    pub count: usize,
    /// Peak time of each jump.
    pub timestamps: Vec<i64>,
    pub magnitudes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeSeries {
    pub data: Vec<f64>,
    pub timestamps: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowAnalytics {
    pub speeds: SpeedSeries,
    pub displacement: DisplacementSeries,
    pub steps: StepSummary,
    pub jumps: JumpSummary,
    pub acceleration_magnitude: MagnitudeSeries,
    /// Phase at the end of the window, from the position-based speeds.
    pub phase: MovementPhase,
}

/// Analyze samples ordered by timestamp. `None` for an empty window.
pub fn analyze_window(samples: &[RawFrame], config: &AnalyticsConfig) -> Option<WindowAnalytics> {
    if samples.is_empty() {
        return None;
    }

    let timestamps: Vec<i64> = samples.iter().map(|s| s.timestamp_micros).collect();
    let seconds: Vec<f64> = samples.iter().map(RawFrame::timestamp_secs).collect();
    let positions: Vec<_> = samples.iter().map(|s| s.position).collect();
    let magnitudes: Vec<f64> = samples.iter().map(|s| motion_magnitude(s.accel)).collect();

    let speeds = position_speeds(&timestamps, &positions);
    let average = speeds.iter().sum::<f64>() / speeds.len() as f64;
    let max = speeds.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let displacement = cumulative_displacement(&timestamps, &speeds);
    let total = displacement.last().copied().unwrap_or(0.0);

    let steps = detect_steps(&magnitudes, &timestamps, config.step_threshold);

    let jumps = detect_jumps(&magnitudes, &seconds, config);
    // Events carry the exact f64 they were fed, so map back to the source sample.
    let jump_timestamps = jumps
        .iter()
        .filter_map(|j| seconds.iter().position(|&s| s == j.timestamp_s))
        .map(|i| timestamps[i])
        .collect();

    let history_start = speeds.len().saturating_sub(config.phase_history_capacity.max(1));
    let phase = classify_phase(&speeds[history_start..]);

    tracing::debug!(
        samples = samples.len(),
        steps = steps.len(),
        jumps = jumps.len(),
        "Window analyzed"
    );

    Some(WindowAnalytics {
        speeds: SpeedSeries {
            data: speeds,
            timestamps: timestamps.clone(),
            average,
            max,
        },
        displacement: DisplacementSeries {
            data: displacement,
            timestamps: timestamps.clone(),
            total,
        },
        steps: StepSummary {
            count: steps.len(),
            timestamps: steps.iter().map(|s| s.end_micros).collect(),
        },
        jumps: JumpSummary {
            count: jumps.len(),
            timestamps: jump_timestamps,
            magnitudes: jumps.iter().map(|j| j.magnitude).collect(),
        },
        acceleration_magnitude: MagnitudeSeries {
            data: magnitudes,
            timestamps,
        },
        phase,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DVec2, DVec3};

    const PERIOD_MICROS: i64 = 20_000;

    fn sample(index: i64, x: f64, extra_z: f64) -> RawFrame {
        RawFrame {
            position: Some(DVec2::new(x, 0.0)),
            accel: DVec3::new(0.0, 0.0, 9.81 + extra_z),
            gyro: DVec3::ZERO,
            battery_life: 100,
            heart_rate: 90,
            serial_number: 2,
            // Batch analysis does not gate on activity.
            activity_status: 0,
            timestamp_micros: 1_700_000_000_000_000 + index * PERIOD_MICROS,
        }
    }

    #[test]
    fn empty_window_has_no_data() {
        assert!(analyze_window(&[], &AnalyticsConfig::default()).is_none());
    }

    #[test]
    fn series_are_timestamp_aligned() {
        // Walk at 5 m/s (0.1 m per 20 ms) with a step bump and a jump spike.
        let samples: Vec<RawFrame> = (0..50)
            .map(|i| {
                let extra = match i {
                    10..=12 => 3.0,
                    30 => 40.0,
                    _ => 0.0,
                };
                sample(i, 0.1 * i as f64, extra)
            })
            .collect();

        let result = analyze_window(&samples, &AnalyticsConfig::default()).unwrap();
        let n = samples.len();
        assert_eq!(result.speeds.data.len(), n);
        assert_eq!(result.speeds.timestamps.len(), n);
        assert_eq!(result.displacement.data.len(), n);
        assert_eq!(result.acceleration_magnitude.data.len(), n);
        assert_eq!(result.acceleration_magnitude.timestamps[0], samples[0].timestamp_micros);

        assert_eq!(result.speeds.data[0], 0.0);
        assert!((result.speeds.max - 5.0).abs() < 1e-6);
        assert!((result.speeds.average - 5.0 * 49.0 / 50.0).abs() < 1e-6);
        assert!((result.displacement.total - 4.85).abs() < 1e-6);

        // Bump 10..=12 and the spike at 30 both cross the step threshold.
        assert_eq!(result.steps.count, 2);
        assert_eq!(result.steps.timestamps[0], samples[13].timestamp_micros);
        assert_eq!(result.jumps.count, 1);
        assert_eq!(result.jumps.timestamps[0], samples[30].timestamp_micros);
        assert_eq!(result.phase, MovementPhase::MaxVelocity);
    }

    #[test]
    fn pure_imu_window_has_zero_speed() {
        let samples: Vec<RawFrame> = (0..5)
            .map(|i| RawFrame {
                position: None,
                ..sample(i, 0.0, 0.0)
            })
            .collect();
        let result = analyze_window(&samples, &AnalyticsConfig::default()).unwrap();
        assert!(result.speeds.data.iter().all(|&s| s == 0.0));
        assert_eq!(result.displacement.total, 0.0);
        assert_eq!(result.phase, MovementPhase::Idle);
    }
}
