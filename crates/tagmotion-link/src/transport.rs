use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Connect to {address} failed: {reason}")]
    Connect { address: String, reason: String },
    #[error("Subscribe to {characteristic} failed: {reason}")]
    Subscribe {
        characteristic: String,
        reason: String,
    },
    #[error("Link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Establishes connections to tags.
///
/// Pairing and discovery happen outside this crate; a transport only
/// knows how to reach an already-known address.
#[async_trait]
pub trait LinkTransport: Send + Sync {
    type Connection: LinkConnection;

    async fn connect(&self, address: &str) -> Result<Self::Connection, LinkError>;
}

/// One live connection to a tag.
#[async_trait]
pub trait LinkConnection: Send {
    /// Enable notifications on `characteristic`.
    async fn subscribe(&mut self, characteristic: &str) -> Result<(), LinkError>;

    /// Wait for the next notification payload. `Ok(None)` means the peer
    /// disconnected cleanly.
    async fn next_notification(&mut self) -> Result<Option<Vec<u8>>, LinkError>;

    /// Tear the connection down. Errors are irrelevant at this point.
    async fn disconnect(&mut self);
}
