use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// One decoded sensor sample from a tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Planar position, absent for pure-IMU tags (sent as NaN on the wire).
    pub position: Option<DVec2>,
    /// Accelerometer linear acceleration (m/s^2).
    pub accel: DVec3,
    /// Gyroscope angular velocity, in the tag's own scaling.
    pub gyro: DVec3,
    pub battery_life: u8,
    pub heart_rate: u8,
    pub serial_number: u8,
    /// 0 = inactive.
    pub activity_status: u8,
    /// Capture time, microseconds since the Unix epoch.
    pub timestamp_micros: i64,
}

impl RawFrame {
    pub fn is_active(&self) -> bool {
        self.activity_status != 0
    }

    /// Capture time in seconds.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_micros as f64 / 1_000_000.0
    }
}

/// Connection state of a link session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

/// Snapshot published by a session on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: LinkState,
    /// Reconnect attempts since the last successful subscribe.
    pub retry_count: u32,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            state: LinkState::Disconnected,
            retry_count: 0,
        }
    }
}
