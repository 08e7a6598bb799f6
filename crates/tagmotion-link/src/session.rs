use crate::protocol::{decode_frame, hex_dump};
use crate::transport::{LinkConnection, LinkError, LinkTransport};
use crate::types::{LinkState, LinkStatus, RawFrame};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tagmotion_config::{LinkConfig, TagConfig};
use tokio::sync::watch;

/// Error type handlers use to reject a single frame.
pub type FrameRejection = Box<dyn std::error::Error + Send + Sync>;

/// Receives the decoded frames of one session, inside the session task.
pub trait FrameHandler: Send {
    /// Called after every successful subscribe. Anything derived from the
    /// previous connection (calibration, filters, detectors) restarts here.
    fn on_link_up(&mut self);

    /// Process one frame. An error drops that frame; the link stays up.
    fn on_frame(&mut self, frame: RawFrame) -> Result<(), FrameRejection>;
}

/// Keeps one tag connected for the life of the process.
///
/// `Disconnected -> Connecting -> Connected -> Subscribed`, and on any link
/// failure back to `Disconnected`, a fixed backoff, and `Connecting` again.
/// There is no terminal state.
pub struct LinkSession {
    tag_id: String,
    address: String,
    characteristic: String,
    backoff: Duration,
    retry_count: u32,
    status_tx: watch::Sender<LinkStatus>,
    /// Last assigned capture time; keeps timestamps non-decreasing.
    last_timestamp: i64,
    frame_count: u64,
    dropped_frames: u64,
}

impl LinkSession {
    pub fn new(tag: &TagConfig, link: &LinkConfig) -> Self {
        let (status_tx, _) = watch::channel(LinkStatus::default());
        Self {
            tag_id: tag.tag_id.clone(),
            address: tag.address.clone(),
            characteristic: tag.characteristic.clone(),
            backoff: Duration::from_millis(link.reconnect_backoff_ms),
            retry_count: 0,
            status_tx,
            last_timestamp: 0,
            frame_count: 0,
            dropped_frames: 0,
        }
    }

    pub fn tag_id(&self) -> &str {
        &self.tag_id
    }

    /// Watch the session's connection state.
    pub fn status(&self) -> watch::Receiver<LinkStatus> {
        self.status_tx.subscribe()
    }

    /// Drive the session forever.
    pub async fn run<T, H>(mut self, transport: T, mut handler: H)
    where
        T: LinkTransport,
        H: FrameHandler,
    {
        loop {
            self.set_state(LinkState::Connecting);

            match self.connect_and_stream(&transport, &mut handler).await {
                Ok(()) => tracing::warn!(tag = %self.tag_id, "Disconnected from tag"),
                Err(e) => tracing::error!(tag = %self.tag_id, %e, "Link failure"),
            }

            self.set_state(LinkState::Disconnected);
            self.retry_count += 1;
            tracing::info!(
                tag = %self.tag_id,
                retry = self.retry_count,
                backoff_ms = self.backoff.as_millis() as u64,
                "Reconnecting after backoff"
            );
            tokio::time::sleep(self.backoff).await;
        }
    }

    async fn connect_and_stream<T, H>(
        &mut self,
        transport: &T,
        handler: &mut H,
    ) -> Result<(), LinkError>
    where
        T: LinkTransport,
        H: FrameHandler,
    {
        let mut conn = transport.connect(&self.address).await?;
        self.set_state(LinkState::Connected);
        tracing::info!(tag = %self.tag_id, address = %self.address, "Connected to tag");

        if let Err(e) = conn.subscribe(&self.characteristic).await {
            conn.disconnect().await;
            return Err(e);
        }
        self.retry_count = 0;
        self.set_state(LinkState::Subscribed);
        tracing::info!(tag = %self.tag_id, characteristic = %self.characteristic, "Subscribed to notifications");
        handler.on_link_up();

        let result = loop {
            match conn.next_notification().await {
                Ok(Some(payload)) => self.handle_notification(&payload, handler),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        conn.disconnect().await;
        result
    }

    fn handle_notification<H: FrameHandler>(&mut self, payload: &[u8], handler: &mut H) {
        tracing::debug!(tag = %self.tag_id, data = %hex_dump(payload), "Notification");

        let timestamp = self.next_timestamp();
        let frame = match decode_frame(payload, timestamp) {
            Ok(frame) => frame,
            Err(e) => {
                self.dropped_frames += 1;
                tracing::warn!(tag = %self.tag_id, %e, dropped = self.dropped_frames, "Dropping frame");
                return;
            }
        };

        if let Err(e) = handler.on_frame(frame) {
            self.dropped_frames += 1;
            tracing::warn!(tag = %self.tag_id, %e, dropped = self.dropped_frames, "Frame processing failed");
            return;
        }

        self.frame_count += 1;
        if self.frame_count % 1000 == 0 {
            tracing::debug!(tag = %self.tag_id, frames = self.frame_count, "Frames processed");
        }
    }

    fn next_timestamp(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        self.last_timestamp = now.max(self.last_timestamp);
        self.last_timestamp
    }

    fn set_state(&mut self, state: LinkState) {
        tracing::debug!(tag = %self.tag_id, ?state, "Link state");
        self.status_tx.send_replace(LinkStatus {
            state,
            retry_count: self.retry_count,
        });
    }
}
