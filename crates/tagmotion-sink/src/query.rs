//! Historical query path: pull a stored window and analyze it from scratch.

use crate::collaborator::SampleStore;
use crate::error::QueryError;
use crate::record::EnrichedSample;
use std::sync::Arc;
use tagmotion_analytics::{analyze_window, WindowAnalytics};
use tagmotion_config::AnalyticsConfig;
use tagmotion_link::RawFrame;

/// Stateless between calls; safe to share across concurrent requests.
#[derive(Clone)]
pub struct WindowQuery {
    store: Arc<dyn SampleStore>,
    config: AnalyticsConfig,
}

impl WindowQuery {
    pub fn new(store: Arc<dyn SampleStore>, config: AnalyticsConfig) -> Self {
        Self { store, config }
    }

    /// Analytics over `start..=end` of one tag's samples.
    ///
    /// An empty or inverted range is `InvalidRange`; a valid range without
    /// samples is `NoData`.
    pub async fn analyze(
        &self,
        tag_id: &str,
        start_micros: i64,
        end_micros: i64,
    ) -> Result<WindowAnalytics, QueryError> {
        if start_micros >= end_micros {
            return Err(QueryError::InvalidRange {
                start: start_micros,
                end: end_micros,
            });
        }

        let samples = self.store.query(tag_id, start_micros, end_micros).await?;
        let frames: Vec<RawFrame> = samples.iter().map(EnrichedSample::frame).collect();
        tracing::debug!(tag = %tag_id, samples = frames.len(), "Window query");

        analyze_window(&frames, &self.config).ok_or(QueryError::NoData)
    }

    pub async fn latest(&self, tag_id: &str) -> Result<EnrichedSample, QueryError> {
        self.store.latest(tag_id).await?.ok_or(QueryError::NoData)
    }

    /// `(first, last)` stored timestamps, for picking a window to analyze.
    pub async fn time_range(&self, tag_id: &str) -> Result<(i64, i64), QueryError> {
        self.store.time_range(tag_id).await?.ok_or(QueryError::NoData)
    }
}
