use crate::sink::MetricsSink;
use tagmotion_analytics::StreamPipeline;
use tagmotion_config::AnalyticsConfig;
use tagmotion_link::{FrameHandler, FrameRejection, RawFrame};

/// Runs a tag's frames through its own pipeline and hands the results to
/// the sink. Lives inside the session task.
pub struct GatewayHandler {
    tag_id: String,
    pipeline: StreamPipeline,
    sink: MetricsSink,
}

impl GatewayHandler {
    pub fn new(tag_id: &str, config: &AnalyticsConfig, sink: MetricsSink) -> Self {
        Self {
            tag_id: tag_id.to_string(),
            pipeline: StreamPipeline::new(config),
            sink,
        }
    }
}

impl FrameHandler for GatewayHandler {
    fn on_link_up(&mut self) {
        // A new connection may be a re-seated tag; calibrate again.
        self.pipeline.reset();
        tracing::info!(tag = %self.tag_id, "Calibrating");
    }

    fn on_frame(&mut self, frame: RawFrame) -> Result<(), FrameRejection> {
        let output = self.pipeline.process(&frame);
        self.sink.submit_sample(&self.tag_id, frame, output.live);
        if let Some(report) = output.report {
            self.sink.submit_report(&self.tag_id, report);
        }
        Ok(())
    }
}
