use std::collections::VecDeque;

/// m/s -> km/h composed with the tag's fitted correction factor.
pub const SPEED_SCALE: f64 = 3.6 * 4.5;

/// Live speed from the z-axis accelerometer alone.
///
/// Each sample contributes `|round(az·Δt, 1)|` to a fixed-size window
/// (initially all zeros); the reported speed is the window mean times
/// [`SPEED_SCALE`]. An inactive sample forces zero; a non-positive mean
/// holds the previous value.
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    window: VecDeque<f64>,
    prev_ts: Option<f64>,
    last_nonzero: f64,
}

impl SpeedEstimator {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window: std::iter::repeat(0.0).take(window).collect(),
            prev_ts: None,
            last_nonzero: 0.0,
        }
    }

    pub fn update(&mut self, az: f64, timestamp_s: f64, active: bool) -> f64 {
        let dt = self.prev_ts.map_or(0.0, |prev| timestamp_s - prev);
        self.prev_ts = Some(timestamp_s);

        let velocity = ((az * dt * 10.0).round_ties_even() / 10.0).abs();
        self.window.pop_front();
        self.window.push_back(velocity);
        let mean = self.window.iter().sum::<f64>() / self.window.len() as f64;

        if !active {
            self.last_nonzero = 0.0;
        } else if mean > 0.0 {
            self.last_nonzero = mean;
        }
        self.last_nonzero * SPEED_SCALE
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.window.len());
    }
}
