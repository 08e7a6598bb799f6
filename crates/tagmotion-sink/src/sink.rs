//! Fire-and-forget hand-off from the sessions to storage and publish.
//!
//! Sessions push into a bounded queue and never wait; a single worker
//! drains it. Every collaborator failure is logged and the item dropped.

use crate::collaborator::{IdentityLookup, Publisher, SampleStore};
use crate::error::CollaboratorError;
use crate::record::EnrichedSample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tagmotion_analytics::{LiveMetrics, ReportRecord};
use tagmotion_config::SinkConfig;
use tagmotion_link::RawFrame;
use tokio::sync::mpsc;

#[derive(Debug)]
enum SinkMessage {
    Sample {
        tag_id: String,
        frame: RawFrame,
        metrics: Option<LiveMetrics>,
    },
    Report {
        tag_id: String,
        report: ReportRecord,
    },
}

/// Cloneable producer side. One clone per session.
#[derive(Clone)]
pub struct MetricsSink {
    tx: mpsc::Sender<SinkMessage>,
    dropped: Arc<AtomicU64>,
}

impl MetricsSink {
    /// Start the worker. It runs until every `MetricsSink` clone is dropped.
    pub fn spawn(
        config: &SinkConfig,
        store: Arc<dyn SampleStore>,
        identity: Arc<dyn IdentityLookup>,
        publisher: Arc<dyn Publisher>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let worker = SinkWorker {
            base_topic: config.publish_base_topic.trim_end_matches('/').to_string(),
            publish_reports: config.publish_reports,
            store,
            identity,
            publisher,
        };
        let task = tokio::spawn(worker.run(rx));
        let sink = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, task)
    }

    /// Queue a decoded sample. Returns false if it was dropped.
    pub fn submit_sample(&self, tag_id: &str, frame: RawFrame, metrics: Option<LiveMetrics>) -> bool {
        self.submit(SinkMessage::Sample {
            tag_id: tag_id.to_string(),
            frame,
            metrics,
        })
    }

    pub fn submit_report(&self, tag_id: &str, report: ReportRecord) -> bool {
        self.submit(SinkMessage::Report {
            tag_id: tag_id.to_string(),
            report,
        })
    }

    /// Items dropped because the queue was full or the worker gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn submit(&self, message: SinkMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped % 100 == 1 {
                    let reason = match e {
                        mpsc::error::TrySendError::Full(_) => "queue full",
                        mpsc::error::TrySendError::Closed(_) => "worker stopped",
                    };
                    tracing::warn!(dropped, reason, "Sink hand-off dropped");
                }
                false
            }
        }
    }
}

struct SinkWorker {
    base_topic: String,
    publish_reports: bool,
    store: Arc<dyn SampleStore>,
    identity: Arc<dyn IdentityLookup>,
    publisher: Arc<dyn Publisher>,
}

impl SinkWorker {
    async fn run(self, mut rx: mpsc::Receiver<SinkMessage>) {
        while let Some(message) = rx.recv().await {
            let result = match message {
                SinkMessage::Sample {
                    tag_id,
                    frame,
                    metrics,
                } => self.handle_sample(&tag_id, frame, metrics).await,
                SinkMessage::Report { tag_id, report } => self.handle_report(&tag_id, &report).await,
            };
            if let Err(e) = result {
                tracing::error!(%e, "Sink item dropped");
            }
        }
        tracing::debug!("Sink worker stopped");
    }

    async fn handle_sample(
        &self,
        tag_id: &str,
        frame: RawFrame,
        metrics: Option<LiveMetrics>,
    ) -> Result<(), CollaboratorError> {
        let Some(player) = self.identity.resolve(tag_id).await? else {
            tracing::warn!(tag = %tag_id, "No player assigned to tag, sample dropped");
            return Ok(());
        };

        let sample = EnrichedSample::new(tag_id, &frame, player, metrics);
        let payload = serde_json::to_string(&sample)?;
        self.store.insert(sample).await?;

        let topic = format!("{}/{}", self.base_topic, tag_id);
        self.publisher.publish(&topic, payload).await?;
        tracing::trace!(tag = %tag_id, "Sample stored and published");
        Ok(())
    }

    async fn handle_report(&self, tag_id: &str, report: &ReportRecord) -> Result<(), CollaboratorError> {
        if !self.publish_reports {
            return Ok(());
        }
        let payload = serde_json::to_string(report)?;
        let topic = format!("{}/{}/report", self.base_topic, tag_id);
        self.publisher.publish(&topic, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, StaticIdentity};
    use async_trait::async_trait;
    use glam::DVec3;
    use std::sync::Mutex;
    use tagmotion_config::{PlayerRecord, TagConfig};

    #[derive(Default)]
    struct RecordingPublisher {
        messages: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, topic: &str, payload: String) -> Result<(), CollaboratorError> {
            self.messages.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl SampleStore for FailingStore {
        async fn insert(&self, _: EnrichedSample) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::Storage("disk full".into()))
        }
        async fn query(&self, _: &str, _: i64, _: i64) -> Result<Vec<EnrichedSample>, CollaboratorError> {
            Ok(Vec::new())
        }
        async fn latest(&self, _: &str) -> Result<Option<EnrichedSample>, CollaboratorError> {
            Ok(None)
        }
        async fn time_range(&self, _: &str) -> Result<Option<(i64, i64)>, CollaboratorError> {
            Ok(None)
        }
    }

    fn tags() -> Vec<TagConfig> {
        let mut tag = TagConfig::default();
        tag.tag_id = "0f1c".into();
        tag.player = Some(PlayerRecord {
            id: "p-1".into(),
            name: Some("Alex".into()),
            initials: None,
            height: None,
            weight: None,
            team_id: None,
            team_name: None,
        });
        vec![tag]
    }

    fn frame(ts: i64) -> RawFrame {
        RawFrame {
            position: None,
            accel: DVec3::new(0.0, 0.0, 9.81),
            gyro: DVec3::ZERO,
            battery_life: 90,
            heart_rate: 100,
            serial_number: 3,
            activity_status: 1,
            timestamp_micros: ts,
        }
    }

    #[tokio::test]
    async fn samples_are_stored_and_published_per_tag() {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let (sink, task) = MetricsSink::spawn(
            &SinkConfig::default(),
            store.clone(),
            Arc::new(StaticIdentity::from_tags(&tags())),
            publisher.clone(),
        );

        assert!(sink.submit_sample("0f1c", frame(1), None));
        // Unassigned tag: dropped by the worker, not by the queue.
        assert!(sink.submit_sample("beef", frame(2), None));
        assert!(sink.submit_report("0f1c", ReportRecord::default()));
        drop(sink);
        task.await.unwrap();

        assert_eq!(store.query("0f1c", 0, 10).await.unwrap().len(), 1);
        assert!(store.latest("beef").await.unwrap().is_none());

        let messages = publisher.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, "leaps/1234/node/uplink/ble_location/0f1c");
        let sample: serde_json::Value = serde_json::from_str(&messages[0].1).unwrap();
        assert_eq!(sample["player"]["_id"], "p-1");
        assert_eq!(messages[1].0, "leaps/1234/node/uplink/ble_location/0f1c/report");
        let report: serde_json::Value = serde_json::from_str(&messages[1].1).unwrap();
        assert!(report.get("tstamp").is_some());
    }

    #[tokio::test]
    async fn storage_failure_skips_publish_and_keeps_going() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (sink, task) = MetricsSink::spawn(
            &SinkConfig::default(),
            Arc::new(FailingStore),
            Arc::new(StaticIdentity::from_tags(&tags())),
            publisher.clone(),
        );
        assert!(sink.submit_sample("0f1c", frame(1), None));
        assert!(sink.submit_report("0f1c", ReportRecord::default()));
        drop(sink);
        task.await.unwrap();

        let messages = publisher.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].0.ends_with("/report"));
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_waiting() {
        let mut config = SinkConfig::default();
        config.queue_capacity = 2;
        let (sink, task) = MetricsSink::spawn(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(StaticIdentity::from_tags(&tags())),
            Arc::new(RecordingPublisher::default()),
        );

        // The worker cannot run until this task yields.
        let accepted = (0..5).filter(|&i| sink.submit_sample("0f1c", frame(i), None)).count();
        assert_eq!(accepted, 2);
        assert_eq!(sink.dropped(), 3);
        drop(sink);
        task.await.unwrap();
    }
}
