//! In-process collaborators: enough to run the gateway standalone.

use crate::collaborator::{IdentityLookup, Publisher, SampleStore};
use crate::error::CollaboratorError;
use crate::record::EnrichedSample;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tagmotion_config::{PlayerRecord, TagConfig};
use tokio::sync::RwLock;

/// Samples kept per tag, sorted by timestamp.
///
/// With a retention set, each insert prunes that tag's samples older than
/// its newest sample minus the retention.
#[derive(Default)]
pub struct MemoryStore {
    samples: RwLock<HashMap<String, Vec<EnrichedSample>>>,
    retention_micros: Option<i64>,
}

impl MemoryStore {
    /// Keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            samples: RwLock::default(),
            retention_micros: Some(i64::try_from(retention.as_micros()).unwrap_or(i64::MAX)),
        }
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn insert(&self, sample: EnrichedSample) -> Result<(), CollaboratorError> {
        let mut samples = self.samples.write().await;
        let series = samples.entry(sample.tag_id.clone()).or_default();
        // Frames usually arrive in order; this is a push in the common case.
        let at = series.partition_point(|s| s.timestamp_micros <= sample.timestamp_micros);
        series.insert(at, sample);

        if let (Some(retention), Some(newest)) = (self.retention_micros, series.last()) {
            let cutoff = newest.timestamp_micros.saturating_sub(retention);
            let stale = series.partition_point(|s| s.timestamp_micros < cutoff);
            if stale > 0 {
                series.drain(..stale);
                tracing::trace!(pruned = stale, "Retention pruned samples");
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        tag_id: &str,
        start_micros: i64,
        end_micros: i64,
    ) -> Result<Vec<EnrichedSample>, CollaboratorError> {
        let samples = self.samples.read().await;
        let Some(series) = samples.get(tag_id) else {
            return Ok(Vec::new());
        };
        let from = series.partition_point(|s| s.timestamp_micros < start_micros);
        let to = series.partition_point(|s| s.timestamp_micros <= end_micros);
        Ok(series[from..to.max(from)].to_vec())
    }

    async fn latest(&self, tag_id: &str) -> Result<Option<EnrichedSample>, CollaboratorError> {
        let samples = self.samples.read().await;
        Ok(samples.get(tag_id).and_then(|s| s.last().cloned()))
    }

    async fn time_range(&self, tag_id: &str) -> Result<Option<(i64, i64)>, CollaboratorError> {
        let samples = self.samples.read().await;
        Ok(samples.get(tag_id).and_then(|series| {
            let first = series.first()?.timestamp_micros;
            let last = series.last()?.timestamp_micros;
            Some((first, last))
        }))
    }
}

/// Tag-to-player assignments taken from the configuration.
pub struct StaticIdentity {
    players: HashMap<String, PlayerRecord>,
}

impl StaticIdentity {
    pub fn from_tags(tags: &[TagConfig]) -> Self {
        let players = tags
            .iter()
            .filter_map(|t| t.player.clone().map(|p| (t.tag_id.clone(), p)))
            .collect();
        Self { players }
    }
}

#[async_trait]
impl IdentityLookup for StaticIdentity {
    async fn resolve(&self, tag_id: &str) -> Result<Option<PlayerRecord>, CollaboratorError> {
        Ok(self.players.get(tag_id).cloned())
    }
}

/// Publishes by logging the payload.
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), CollaboratorError> {
        tracing::debug!(%topic, %payload, "Published");
        Ok(())
    }
}
