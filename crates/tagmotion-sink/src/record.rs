//! Record shapes handed to storage and publish.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tagmotion_analytics::LiveMetrics;
use tagmotion_config::PlayerRecord;
use tagmotion_link::RawFrame;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<DVec3> for Axes {
    fn from(v: DVec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Axes> for DVec3 {
    fn from(a: Axes) -> Self {
        DVec3::new(a.x, a.y, a.z)
    }
}

/// One decoded sample joined with the player wearing the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSample {
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub accelerometer: Axes,
    pub gyroscope: Axes,
    pub battery_life: u8,
    pub heart_rate: u8,
    pub serial_number: u8,
    pub activity_status: u8,
    pub tag_id: String,
    #[serde(rename = "tstamp")]
    pub timestamp_micros: i64,
    pub player: PlayerRecord,
    /// Live analytics, present once the stream is calibrated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<LiveMetrics>,
}

impl EnrichedSample {
    pub fn new(tag_id: &str, frame: &RawFrame, player: PlayerRecord, metrics: Option<LiveMetrics>) -> Self {
        Self {
            x_position: frame.position.map(|p| p.x),
            y_position: frame.position.map(|p| p.y),
            accelerometer: frame.accel.into(),
            gyroscope: frame.gyro.into(),
            battery_life: frame.battery_life,
            heart_rate: frame.heart_rate,
            serial_number: frame.serial_number,
            activity_status: frame.activity_status,
            tag_id: tag_id.to_string(),
            timestamp_micros: frame.timestamp_micros,
            player,
            metrics,
        }
    }

    /// The raw measurement, for re-analysis of stored windows.
    pub fn frame(&self) -> RawFrame {
        let position = match (self.x_position, self.y_position) {
            (Some(x), Some(y)) => Some(DVec2::new(x, y)),
            _ => None,
        };
        RawFrame {
            position,
            accel: self.accelerometer.into(),
            gyro: self.gyroscope.into(),
            battery_life: self.battery_life,
            heart_rate: self.heart_rate,
            serial_number: self.serial_number,
            activity_status: self.activity_status,
            timestamp_micros: self.timestamp_micros,
        }
    }
}
