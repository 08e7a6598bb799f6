//! Link layer for wearable motion tags.
//!
//! Decodes the fixed 36-byte notification frames and keeps one session per
//! tag connected through an explicit reconnect loop.

pub mod protocol;
pub mod session;
pub mod synthetic;
pub mod tcp;
pub mod transport;
pub mod types;

pub use protocol::{decode_frame, encode_frame, FrameError, FRAME_LEN};
pub use session::{FrameHandler, FrameRejection, LinkSession};
pub use synthetic::SyntheticTransport;
pub use tcp::TcpTransport;
pub use transport::{LinkConnection, LinkError, LinkTransport};
pub use types::{LinkState, LinkStatus, RawFrame};
