//! Seams to the systems the gateway hands its output to.

use crate::error::CollaboratorError;
use crate::record::EnrichedSample;
use async_trait::async_trait;
use tagmotion_config::PlayerRecord;

#[async_trait]
pub trait SampleStore: Send + Sync {
    async fn insert(&self, sample: EnrichedSample) -> Result<(), CollaboratorError>;

    /// Samples of `tag_id` with `start <= timestamp <= end`, ordered by timestamp.
    async fn query(&self, tag_id: &str, start_micros: i64, end_micros: i64)
        -> Result<Vec<EnrichedSample>, CollaboratorError>;

    async fn latest(&self, tag_id: &str) -> Result<Option<EnrichedSample>, CollaboratorError>;

    /// Timestamps of the oldest and newest stored samples of `tag_id`.
    async fn time_range(&self, tag_id: &str) -> Result<Option<(i64, i64)>, CollaboratorError>;
}

#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Player currently wearing `tag_id`, if any.
    async fn resolve(&self, tag_id: &str) -> Result<Option<PlayerRecord>, CollaboratorError>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), CollaboratorError>;
}
