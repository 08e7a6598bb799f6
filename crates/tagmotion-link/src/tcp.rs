//! TCP bridge transport.
//!
//! The radio side lives in a bridge process that exposes every paired tag
//! on a TCP port. After connecting, the gateway sends one line
//! `SUBSCRIBE <characteristic>\n`; the bridge then streams notifications,
//! each prefixed with a single length byte.

use crate::transport::{LinkConnection, LinkError, LinkTransport};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Connection timeout for a single attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TcpTransport {
    /// Notifications buffered between the socket reader and the session.
    buffer: usize,
}

impl TcpTransport {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
        }
    }
}

#[async_trait]
impl LinkTransport for TcpTransport {
    type Connection = TcpConnection;

    async fn connect(&self, address: &str) -> Result<TcpConnection, LinkError> {
        tracing::info!(%address, "Connecting to tag bridge");

        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address))
            .await
            .map_err(|_| LinkError::Connect {
                address: address.to_string(),
                reason: format!("timed out after {CONNECT_TIMEOUT:?}"),
            })?
            .map_err(|e| LinkError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;

        let (mut read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(self.buffer);
        let address = address.to_string();

        // The reader never waits on the session: when the buffer is full the
        // newest notification is dropped so the radio side is never stalled.
        let reader = tokio::spawn(async move {
            let mut dropped: u64 = 0;
            loop {
                let len = match read_half.read_u8().await {
                    Ok(len) => len as usize,
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                        tracing::warn!(%address, "Tag bridge closed the connection");
                        return;
                    }
                    Err(e) => {
                        let _ = tx.send(Err(LinkError::Io(e))).await;
                        return;
                    }
                };
                let mut payload = vec![0u8; len];
                if let Err(e) = read_half.read_exact(&mut payload).await {
                    let _ = tx.send(Err(LinkError::Io(e))).await;
                    return;
                }
                match tx.try_send(Ok(payload)) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped += 1;
                        if dropped % 100 == 1 {
                            tracing::warn!(%address, dropped, "Session lagging, notifications dropped");
                        }
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => return,
                }
            }
        });

        Ok(TcpConnection {
            writer: write_half,
            notifications: rx,
            reader,
        })
    }
}

pub struct TcpConnection {
    writer: OwnedWriteHalf,
    notifications: mpsc::Receiver<Result<Vec<u8>, LinkError>>,
    reader: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl LinkConnection for TcpConnection {
    async fn subscribe(&mut self, characteristic: &str) -> Result<(), LinkError> {
        let request = format!("SUBSCRIBE {characteristic}\n");
        self.writer
            .write_all(request.as_bytes())
            .await
            .map_err(|e| LinkError::Subscribe {
                characteristic: characteristic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn next_notification(&mut self) -> Result<Option<Vec<u8>>, LinkError> {
        self.notifications.recv().await.transpose()
    }

    async fn disconnect(&mut self) {
        self.reader.abort();
        let _ = self.writer.shutdown().await;
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn subscribes_and_streams_length_prefixed_notifications() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let bridge = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            let mut lines = tokio::io::BufReader::new(read_half).lines();
            let request = lines.next_line().await.unwrap().unwrap();

            write_half.write_all(&[3, 1, 2, 3]).await.unwrap();
            write_half.write_all(&[1, 9]).await.unwrap();
            request
        });

        let transport = TcpTransport::new(8);
        let mut conn = transport.connect(&address).await.unwrap();
        conn.subscribe("ef47b05a").await.unwrap();

        assert_eq!(conn.next_notification().await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(conn.next_notification().await.unwrap(), Some(vec![9]));

        let request = bridge.await.unwrap();
        assert_eq!(request, "SUBSCRIBE ef47b05a");

        // Bridge task dropped its socket: clean end of stream.
        assert_eq!(conn.next_notification().await.unwrap(), None);
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let transport = TcpTransport::new(8);
        let err = transport.connect(&address).await.err().unwrap();
        assert!(matches!(err, LinkError::Connect { .. }));
    }
}
