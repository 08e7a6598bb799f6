//! Jump counter: exponential low-pass over the magnitude, strict local
//! maxima above a threshold, and a refractory policy.
//!
//! The detector is causal. Whether `filtered[i]` is a local maximum is only
//! known once `filtered[i + 1]` arrives, so events lag one sample and carry
//! the timestamp of the peak itself.

use crate::filter::ExponentialFilter;
use serde::{Deserialize, Serialize};
use tagmotion_config::{AnalyticsConfig, JumpPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpEvent {
    /// Peak time, seconds.
    pub timestamp_s: f64,
    /// Filtered magnitude at the peak.
    pub magnitude: f64,
}

#[derive(Debug, Clone)]
pub struct JumpDetector {
    filter: ExponentialFilter,
    threshold: f64,
    min_distance: usize,
    cooldown_s: f64,
    policy: JumpPolicy,
    /// Filtered values at `index - 2` and `index - 1`.
    before_peak: f64,
    peak: Option<(f64, f64)>,
    index: usize,
    last_jump_time: Option<f64>,
    jump_count: u64,
}

impl JumpDetector {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            filter: ExponentialFilter::new(config.jump_filter_alpha),
            threshold: config.jump_threshold,
            min_distance: config.jump_min_distance,
            cooldown_s: config.jump_cooldown_s,
            policy: config.jump_policy,
            before_peak: f64::NAN,
            peak: None,
            index: 0,
            last_jump_time: None,
            jump_count: 0,
        }
    }

    /// Feed one magnitude sample taken at `timestamp_s`. Returns a jump when
    /// the previous sample turns out to be a counted peak.
    pub fn update(&mut self, magnitude: f64, timestamp_s: f64) -> Option<JumpEvent> {
        if magnitude.is_nan() {
            return None;
        }
        let filtered = self.filter.apply(magnitude);

        let event = match self.peak {
            Some((candidate, candidate_ts)) if self.index >= 2 => {
                self.check_candidate(self.index - 1, candidate, candidate_ts, filtered)
            }
            _ => None,
        };

        if let Some((value, _)) = self.peak {
            self.before_peak = value;
        }
        self.peak = Some((filtered, timestamp_s));
        self.index += 1;
        event
    }

    fn check_candidate(&mut self, i: usize, value: f64, ts: f64, next: f64) -> Option<JumpEvent> {
        let is_peak = value > self.before_peak && value > next && value > self.threshold;
        if !is_peak || !(i == 1 || i - 1 >= self.min_distance) {
            return None;
        }

        if self.policy == JumpPolicy::Cooldown {
            if let Some(last) = self.last_jump_time {
                if ts - last <= self.cooldown_s {
                    return None;
                }
            }
        }

        self.jump_count += 1;
        self.last_jump_time = Some(ts);
        Some(JumpEvent {
            timestamp_s: ts,
            magnitude: value,
        })
    }

    pub fn jump_count(&self) -> u64 {
        self.jump_count
    }

    pub fn last_jump_time(&self) -> Option<f64> {
        self.last_jump_time
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.before_peak = f64::NAN;
        self.peak = None;
        self.index = 0;
        self.last_jump_time = None;
        self.jump_count = 0;
    }
}

/// Batch form: fold a fresh detector over the whole window.
pub fn detect_jumps(magnitudes: &[f64], timestamps_s: &[f64], config: &AnalyticsConfig) -> Vec<JumpEvent> {
    let mut detector = JumpDetector::new(config);
    magnitudes
        .iter()
        .zip(timestamps_s)
        .filter_map(|(&m, &ts)| detector.update(m, ts))
        .collect()
}
