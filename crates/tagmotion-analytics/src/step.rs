//! Hysteresis step counter on the gravity-compensated magnitude.
//!
//! A step begins on an upward crossing of the threshold (`prev < thr <= cur`)
//! and completes on the next downward crossing (`prev >= thr > cur`). No
//! refractory period.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    pub begin_micros: i64,
    pub end_micros: i64,
}

#[derive(Debug, Clone)]
pub struct StepDetector {
    threshold: f64,
    prev_acc: Option<f64>,
    step_begin: Option<i64>,
    step_count: u64,
}

impl StepDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            prev_acc: None,
            step_begin: None,
            step_count: 0,
        }
    }

    /// Feed one magnitude sample. Inactive samples move the previous value
    /// forward but never begin or end a step. NaN samples are ignored.
    pub fn update(&mut self, magnitude: f64, timestamp_micros: i64, active: bool) -> Option<StepEvent> {
        if magnitude.is_nan() {
            return None;
        }
        let prev = self.prev_acc.replace(magnitude)?;
        if !active {
            return None;
        }

        let thr = self.threshold;
        if prev < thr && thr <= magnitude {
            self.step_begin = Some(timestamp_micros);
        } else if prev >= thr && thr > magnitude {
            if let Some(begin) = self.step_begin {
                if timestamp_micros > begin {
                    self.step_count += 1;
                    return Some(StepEvent {
                        begin_micros: begin,
                        end_micros: timestamp_micros,
                    });
                }
            }
        }
        None
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.threshold);
    }
}

/// Batch form: fold a fresh detector over the whole window.
pub fn detect_steps(magnitudes: &[f64], timestamps_micros: &[i64], threshold: f64) -> Vec<StepEvent> {
    let mut detector = StepDetector::new(threshold);
    magnitudes
        .iter()
        .zip(timestamps_micros)
        .filter_map(|(&m, &ts)| detector.update(m, ts, true))
        .collect()
}
