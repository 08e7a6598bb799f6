use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Speed above which the stream is considered accelerating.
pub const ACCELERATION_SPEED: f64 = 1.11;
/// Speed that every one of the last [`MAX_VELOCITY_SAMPLES`] must exceed.
pub const MAX_VELOCITY_SPEED: f64 = 4.0;
pub const MAX_VELOCITY_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPhase {
    Idle,
    Acceleration,
    MaxVelocity,
    Deceleration,
}

/// Classify the most recent movement phase from a speed history (oldest
/// first). Checked in order: max velocity, acceleration, deceleration.
pub fn classify_phase(history: &[f64]) -> MovementPhase {
    let Some((&latest, earlier)) = history.split_last() else {
        return MovementPhase::Idle;
    };

    if history.len() >= MAX_VELOCITY_SAMPLES
        && history[history.len() - MAX_VELOCITY_SAMPLES..]
            .iter()
            .all(|&s| s > MAX_VELOCITY_SPEED)
    {
        MovementPhase::MaxVelocity
    } else if latest > ACCELERATION_SPEED {
        MovementPhase::Acceleration
    } else if earlier.iter().any(|&s| s > MAX_VELOCITY_SPEED) {
        MovementPhase::Deceleration
    } else {
        MovementPhase::Idle
    }
}

/// Bounded FIFO of recent speeds.
#[derive(Debug, Clone)]
pub struct SpeedHistory {
    speeds: VecDeque<f64>,
    capacity: usize,
}

impl SpeedHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MAX_VELOCITY_SAMPLES);
        Self {
            speeds: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, speed: f64) {
        if self.speeds.len() == self.capacity {
            self.speeds.pop_front();
        }
        self.speeds.push_back(speed);
    }

    /// Phase of the current history; recomputed on every call.
    pub fn phase(&mut self) -> MovementPhase {
        classify_phase(self.speeds.make_contiguous())
    }

    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }

    pub fn clear(&mut self) {
        self.speeds.clear();
    }
}
