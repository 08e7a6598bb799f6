//! Low-pass filters and gravity compensation.
//!
//! Two filter shapes live here and they are deliberately separate:
//! - [`TriangularFilter`]: weighted moving average over a full window, per
//!   axis, feeding the streaming integrator. Emits nothing until the window
//!   is full.
//! - [`ExponentialFilter`]: single-pole IIR over the scalar magnitude,
//!   ahead of jump detection.

use glam::DVec3;
use std::collections::VecDeque;

/// Gravity removed from the acceleration magnitude for event detection.
pub const DETECTION_GRAVITY: f64 = 9.81;

/// Standard gravity used by calibration and per-axis integration.
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Scalar motion signal: `|a| - 9.81`.
pub fn motion_magnitude(accel: DVec3) -> f64 {
    accel.length() - DETECTION_GRAVITY
}

/// Triangular window weights of length `n`.
///
/// Odd `n`: `2k/(n+1)`, even `n`: `(2k-1)/n`, for `k = 1..` up to the
/// centre, mirrored. Never touches zero at the edges.
pub fn triangular_weights(n: usize) -> Vec<f64> {
    let mut weights = vec![0.0; n];
    for i in 0..(n + 1) / 2 {
        let k = (i + 1) as f64;
        let w = if n % 2 == 1 {
            2.0 * k / (n as f64 + 1.0)
        } else {
            (2.0 * k - 1.0) / n as f64
        };
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    weights
}

/// Causal triangular moving average over 3-axis samples.
#[derive(Debug, Clone)]
pub struct TriangularFilter {
    weights: Vec<f64>,
    weight_sum: f64,
    window: VecDeque<DVec3>,
}

impl TriangularFilter {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        let weights = triangular_weights(window);
        let weight_sum = weights.iter().sum();
        Self {
            weights,
            weight_sum,
            window: VecDeque::with_capacity(window),
        }
    }

    /// Push a raw sample. Returns `None` until the window is full; after
    /// that, the weighted mean of the last `window` samples (NaN if any of
    /// them was NaN).
    pub fn push(&mut self, sample: DVec3) -> Option<DVec3> {
        if self.window.len() == self.weights.len() {
            self.window.pop_front();
        }
        self.window.push_back(sample);
        if self.window.len() < self.weights.len() {
            return None;
        }

        let sum = self
            .window
            .iter()
            .zip(&self.weights)
            .fold(DVec3::ZERO, |acc, (s, w)| acc + *s * *w);
        Some(sum / self.weight_sum)
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

/// `y[i] = α·x[i] + (1−α)·y[i−1]`, with `y[0] = x[0]`.
#[derive(Debug, Clone)]
pub struct ExponentialFilter {
    alpha: f64,
    state: Option<f64>,
}

impl ExponentialFilter {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    pub fn apply(&mut self, x: f64) -> f64 {
        let y = match self.state {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.state = Some(y);
        y
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// Batch form of [`ExponentialFilter`].
pub fn exponential_filter(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut filter = ExponentialFilter::new(alpha);
    values.iter().map(|&v| filter.apply(v)).collect()
}
