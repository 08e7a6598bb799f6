use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Signal conditioning, integration and detector parameters.
    pub analytics: AnalyticsConfig,
    /// Link session behaviour.
    pub link: LinkConfig,
    /// Storage / publish hand-off.
    pub sink: SinkConfig,
    /// One entry per wearable tag; each gets its own link session.
    pub tags: Vec<TagConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analytics: AnalyticsConfig::default(),
            link: LinkConfig::default(),
            sink: SinkConfig::default(),
            tags: vec![TagConfig::default()],
        }
    }
}

impl AppConfig {
    /// Reject settings the pipeline cannot run with. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        self.analytics.validate()?;
        self.link.validate()?;
        self.sink.validate()?;
        for tag in &self.tags {
            ensure!(!tag.tag_id.is_empty(), "tag_id must not be empty");
            ensure!(!tag.address.is_empty(), "tag {} has no address", tag.tag_id);
        }
        Ok(())
    }
}

/// Refractory policy of the jump detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpPolicy {
    /// A peak counts only if more than `jump_cooldown_s` elapsed since the last counted jump.
    Cooldown,
    /// Index-position check only (`i == 1 || i - 1 >= min_distance`), no time gap.
    /// Produces different counts than `Cooldown`; kept for consumers that still expect it.
    LegacyIndexDistance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Fixed sample period `T` in seconds (0.02 = 50 Hz).
    pub sample_period_s: f64,
    /// Number of stationary samples averaged for the static bias.
    pub calibration_samples: usize,
    /// Triangular moving-average window (samples) for the streaming integrator input.
    pub smoothing_window: usize,
    /// Exponential filter coefficient ahead of jump detection.
    pub jump_filter_alpha: f64,
    /// Step threshold on the gravity-compensated magnitude (m/s^2).
    pub step_threshold: f64,
    /// Jump threshold on the filtered magnitude (m/s^2).
    pub jump_threshold: f64,
    /// Minimum index distance from the sequence start for a jump peak.
    pub jump_min_distance: usize,
    /// Minimum time between two counted jumps (seconds).
    pub jump_cooldown_s: f64,
    pub jump_policy: JumpPolicy,
    /// Rolling window (samples) of the streaming speed estimator.
    pub speed_window: usize,
    /// Capacity of the speed history used by the phase classifier.
    pub phase_history_capacity: usize,
    /// Period between integrator report flushes (seconds).
    pub reporting_interval_s: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            sample_period_s: 0.02,
            calibration_samples: 1024,
            smoothing_window: 20,
            jump_filter_alpha: 0.2,
            step_threshold: 2.0,
            jump_threshold: 4.0,
            jump_min_distance: 5,
            jump_cooldown_s: 0.3,
            jump_policy: JumpPolicy::Cooldown,
            speed_window: 10,
            phase_history_capacity: 32,
            reporting_interval_s: 60.0,
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.sample_period_s.is_finite() && self.sample_period_s > 0.0,
            "analytics.sample_period_s must be a positive number, got {}",
            self.sample_period_s
        );
        ensure!(
            self.reporting_interval_s.is_finite() && self.reporting_interval_s > 0.0,
            "analytics.reporting_interval_s must be a positive number, got {}",
            self.reporting_interval_s
        );
        ensure!(
            self.jump_filter_alpha > 0.0 && self.jump_filter_alpha <= 1.0,
            "analytics.jump_filter_alpha must be in (0, 1], got {}",
            self.jump_filter_alpha
        );
        ensure!(
            self.step_threshold.is_finite() && self.jump_threshold.is_finite(),
            "analytics step/jump thresholds must be finite"
        );
        ensure!(
            self.jump_cooldown_s.is_finite() && self.jump_cooldown_s >= 0.0,
            "analytics.jump_cooldown_s must be non-negative, got {}",
            self.jump_cooldown_s
        );
        ensure!(self.calibration_samples > 0, "analytics.calibration_samples must be non-zero");
        ensure!(self.smoothing_window > 0, "analytics.smoothing_window must be non-zero");
        ensure!(self.speed_window > 0, "analytics.speed_window must be non-zero");
        ensure!(
            self.phase_history_capacity > 0,
            "analytics.phase_history_capacity must be non-zero"
        );
        Ok(())
    }
}

/// How link sessions reach the tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Radio bridge exposing each tag's notification channel over TCP.
    Tcp,
    /// In-process generator of stationary frames, for running without hardware.
    Synthetic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Fixed delay before every reconnect attempt.
    pub reconnect_backoff_ms: u64,
    pub transport: TransportKind,
    /// Notifications buffered between the transport reader and the session.
    pub notification_buffer: usize,
}

impl LinkConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.reconnect_backoff_ms > 0, "link.reconnect_backoff_ms must be non-zero");
        ensure!(self.notification_buffer > 0, "link.notification_buffer must be non-zero");
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff_ms: 5000,
            transport: TransportKind::Tcp,
            notification_buffer: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Topic prefix; samples go to `<base>/<tag_id>`.
    pub publish_base_topic: String,
    /// Pending hand-offs before new ones are dropped.
    pub queue_capacity: usize,
    /// Also publish integrator reports to `<base>/<tag_id>/report`.
    pub publish_reports: bool,
    /// Stored samples older than this, relative to a tag's newest sample, are pruned.
    pub retention_s: u64,
}

impl SinkConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.queue_capacity > 0, "sink.queue_capacity must be non-zero");
        ensure!(self.retention_s > 0, "sink.retention_s must be non-zero");
        Ok(())
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            publish_base_topic: "leaps/1234/node/uplink/ble_location".into(),
            queue_capacity: 256,
            publish_reports: true,
            retention_s: 30 * 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    /// Logical tag identifier; also the stream id in storage and the topic suffix.
    pub tag_id: String,
    /// Link address of the tag (bridge `host:port` for the TCP transport).
    pub address: String,
    /// Notification characteristic to subscribe to.
    pub characteristic: String,
    /// Identity served by the static lookup table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerRecord>,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            tag_id: "0f1c".into(),
            address: "127.0.0.1:7000".into(),
            characteristic: "ef47b05a-5571-4688-8aba-9c6b51463208".into(),
            player: None,
        }
    }
}

/// Player identity attached to every stored sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, rename = "teamid", skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, rename = "teamName", skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
}
