use crate::types::RawFrame;
use glam::{DVec2, DVec3};
use thiserror::Error;

/// Wire size of one notification: 8 x f32 LE + 4 x u8.
pub const FRAME_LEN: usize = 36;

/// Offset of the four trailing status bytes.
const STATUS_OFFSET: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Malformed frame: {len} bytes (expected {FRAME_LEN})")]
    MalformedFrame { len: usize },
}

/// Decode one notification payload.
///
/// Layout: `[x, y, ax, ay, az, gx, gy, gz]` as little-endian f32, then
/// `[battery, heart_rate, serial, activity]` as u8. The tag does not
/// timestamp its samples, so the caller supplies the capture time.
pub fn decode_frame(data: &[u8], timestamp_micros: i64) -> Result<RawFrame, FrameError> {
    let data: &[u8; FRAME_LEN] = data
        .try_into()
        .map_err(|_| FrameError::MalformedFrame { len: data.len() })?;

    let f = |index: usize| -> f64 {
        let offset = index * 4;
        f32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as f64
    };

    let (x, y) = (f(0), f(1));
    let position = if x.is_nan() || y.is_nan() {
        None
    } else {
        Some(DVec2::new(x, y))
    };

    Ok(RawFrame {
        position,
        accel: DVec3::new(f(2), f(3), f(4)),
        gyro: DVec3::new(f(5), f(6), f(7)),
        battery_life: data[STATUS_OFFSET],
        heart_rate: data[STATUS_OFFSET + 1],
        serial_number: data[STATUS_OFFSET + 2],
        activity_status: data[STATUS_OFFSET + 3],
        timestamp_micros,
    })
}

/// Encode a frame in wire layout. Values are narrowed to f32; an absent
/// position is written as NaN.
pub fn encode_frame(frame: &RawFrame) -> [u8; FRAME_LEN] {
    let position = frame.position.unwrap_or(DVec2::splat(f64::NAN));
    let floats = [
        position.x,
        position.y,
        frame.accel.x,
        frame.accel.y,
        frame.accel.z,
        frame.gyro.x,
        frame.gyro.y,
        frame.gyro.z,
    ];

    let mut out = [0u8; FRAME_LEN];
    for (chunk, value) in out[..STATUS_OFFSET].chunks_exact_mut(4).zip(floats) {
        chunk.copy_from_slice(&(value as f32).to_le_bytes());
    }
    out[STATUS_OFFSET] = frame.battery_life;
    out[STATUS_OFFSET + 1] = frame.heart_rate;
    out[STATUS_OFFSET + 2] = frame.serial_number;
    out[STATUS_OFFSET + 3] = frame.activity_status;
    out
}

/// Colon-separated hex, as frames are logged at debug level.
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
