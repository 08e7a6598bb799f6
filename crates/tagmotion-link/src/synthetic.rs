use crate::protocol::encode_frame;
use crate::transport::{LinkConnection, LinkError, LinkTransport};
use crate::types::RawFrame;
use async_trait::async_trait;
use glam::{DVec2, DVec3};
use std::time::Duration;

const GRAVITY: f64 = 9.80665;

/// In-process stand-in for a tag, for running the gateway without hardware.
///
/// Emits stationary frames for `quiet_samples` (enough to calibrate), then a
/// periodic vertical bounce while walking along the x axis.
pub struct SyntheticTransport {
    period: Duration,
    quiet_samples: u64,
}

impl SyntheticTransport {
    /// A zero `period` is raised to 1 ms.
    pub fn new(period: Duration, quiet_samples: u64) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            quiet_samples,
        }
    }
}

#[async_trait]
impl LinkTransport for SyntheticTransport {
    type Connection = SyntheticConnection;

    async fn connect(&self, address: &str) -> Result<SyntheticConnection, LinkError> {
        tracing::info!(%address, "Synthetic tag connected");
        Ok(SyntheticConnection {
            interval: tokio::time::interval(self.period),
            period_s: self.period.as_secs_f64(),
            quiet_samples: self.quiet_samples,
            index: 0,
            subscribed: false,
        })
    }
}

pub struct SyntheticConnection {
    interval: tokio::time::Interval,
    period_s: f64,
    quiet_samples: u64,
    index: u64,
    subscribed: bool,
}

impl SyntheticConnection {
    fn frame(&self) -> RawFrame {
        let mut accel = DVec3::new(0.0, 0.0, GRAVITY);
        let mut position = DVec2::ZERO;
        if self.index >= self.quiet_samples {
            let t = (self.index - self.quiet_samples) as f64 * self.period_s;
            // ~2 strides per second, 5 m/s^2 peaks.
            accel.z += 5.0 * (2.0 * std::f64::consts::PI * 2.0 * t).sin();
            accel.x = 0.8 * (2.0 * std::f64::consts::PI * 2.0 * t).cos();
            position.x = 1.5 * t;
        }
        RawFrame {
            position: Some(position),
            accel,
            gyro: DVec3::ZERO,
            battery_life: 100,
            heart_rate: 70,
            serial_number: 1,
            activity_status: u8::from(self.index >= self.quiet_samples),
            timestamp_micros: 0,
        }
    }
}

#[async_trait]
impl LinkConnection for SyntheticConnection {
    async fn subscribe(&mut self, _characteristic: &str) -> Result<(), LinkError> {
        self.subscribed = true;
        Ok(())
    }

    async fn next_notification(&mut self) -> Result<Option<Vec<u8>>, LinkError> {
        if !self.subscribed {
            return Ok(None);
        }
        self.interval.tick().await;
        let bytes = encode_frame(&self.frame());
        self.index += 1;
        Ok(Some(bytes.to_vec()))
    }

    async fn disconnect(&mut self) {
        self.subscribed = false;
    }
}
