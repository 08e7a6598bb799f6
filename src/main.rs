use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tagmotion_config::{AppConfig, TransportKind};
use tagmotion_link::{LinkSession, SyntheticTransport, TcpTransport};
use tagmotion_sink::{GatewayHandler, LogPublisher, MemoryStore, MetricsSink, StaticIdentity};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tagmotion_gateway=info,tagmotion_link=info,tagmotion_analytics=info,tagmotion_sink=info"
                    .into()
            }),
        )
        .init();

    info!("Tag motion gateway starting");

    // Load config.
    let config = tagmotion_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if config.tags.is_empty() {
        anyhow::bail!("No tags configured");
    }
    config.validate()?;
    info!(tags = config.tags.len(), transport = ?config.link.transport, "Config loaded");

    let (sink, sink_task) = MetricsSink::spawn(
        &config.sink,
        Arc::new(MemoryStore::with_retention(Duration::from_secs(config.sink.retention_s))),
        Arc::new(StaticIdentity::from_tags(&config.tags)),
        Arc::new(LogPublisher),
    );

    // One task per tag; sessions only end with the process.
    let mut sessions = Vec::with_capacity(config.tags.len());
    for tag in &config.tags {
        if tag.player.is_none() {
            warn!(tag = %tag.tag_id, "Tag has no player assigned, its samples will be dropped");
        }
        let session = LinkSession::new(tag, &config.link);
        let handler = GatewayHandler::new(&tag.tag_id, &config.analytics, sink.clone());

        let task = match config.link.transport {
            TransportKind::Tcp => {
                let transport = TcpTransport::new(config.link.notification_buffer);
                tokio::spawn(session.run(transport, handler))
            }
            TransportKind::Synthetic => {
                let period = Duration::from_secs_f64(config.analytics.sample_period_s);
                let quiet = config.analytics.calibration_samples as u64 + 50;
                let transport = SyntheticTransport::new(period, quiet);
                tokio::spawn(session.run(transport, handler))
            }
        };
        sessions.push((tag.tag_id.clone(), task));
    }
    drop(sink);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    for (tag_id, task) in &sessions {
        task.abort();
        info!(tag = %tag_id, "Session stopped");
    }
    // Sessions held the remaining sink handles; the worker drains and exits.
    for (_, task) in sessions {
        let _ = task.await;
    }
    sink_task.await?;

    Ok(())
}
