mod types;

pub use types::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

/// Returns the config directory: <platform config dir>/tagmotion/
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("tagmotion");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Returns the config file path: <platform config dir>/tagmotion/config.toml
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from disk. When none exists the defaults are written out
/// so there is a file to edit.
pub fn load_config() -> Result<AppConfig> {
    let path = config_path()?;
    if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        let config = parse_config(&contents)?;
        info!(?path, tags = config.tags.len(), "Loaded config");
        Ok(config)
    } else {
        info!(?path, "No config found, writing defaults");
        let config = AppConfig::default();
        if let Err(e) = save_config(&config) {
            warn!(?e, "Could not write default config");
        }
        Ok(config)
    }
}

/// Parse a TOML document. Missing sections and fields take their defaults.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    Ok(toml::from_str(contents)?)
}

/// Save config to disk.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let path = config_path()?;
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    info!(?path, "Saved config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.analytics.calibration_samples, 1024);
        assert_eq!(config.analytics.smoothing_window, 20);
        assert_eq!(config.link.reconnect_backoff_ms, 5000);
        assert_eq!(config.tags.len(), 1);
    }

    #[test]
    fn partial_analytics_section_keeps_other_defaults() {
        let config = parse_config(
            r#"
            [analytics]
            step_threshold = 2.5
            jump_policy = "legacy_index_distance"
            "#,
        )
        .unwrap();
        assert_eq!(config.analytics.step_threshold, 2.5);
        assert_eq!(config.analytics.jump_policy, JumpPolicy::LegacyIndexDistance);
        assert_eq!(config.analytics.jump_threshold, 4.0);
        assert!((config.analytics.sample_period_s - 0.02).abs() < 1e-12);
    }

    #[test]
    fn tags_with_player_identity() {
        let config = parse_config(
            r#"
            [[tags]]
            tag_id = "0f1c"
            address = "127.0.0.1:7000"
            characteristic = "ef47b05a-5571-4688-8aba-9c6b51463208"

            [tags.player]
            _id = "66cefbaf86b267ee00f54487"
            name = "Sam"
            teamName = "Blue"
            "#,
        )
        .unwrap();
        assert_eq!(config.tags.len(), 1);
        let player = config.tags[0].player.as_ref().unwrap();
        assert_eq!(player.id, "66cefbaf86b267ee00f54487");
        assert_eq!(player.team_name.as_deref(), Some("Blue"));
        assert!(player.height.is_none());
    }

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_unusable_sample_period() {
        for period in [0.0, -0.02, f64::NAN, f64::INFINITY] {
            let mut config = AppConfig::default();
            config.analytics.sample_period_s = period;
            assert!(config.validate().is_err(), "period {period} accepted");
        }
    }

    #[test]
    fn rejects_bad_analytics_settings() {
        let bad: [fn(&mut AnalyticsConfig); 8] = [
            |a| a.reporting_interval_s = 0.0,
            |a| a.jump_filter_alpha = 0.0,
            |a| a.jump_filter_alpha = 1.5,
            |a| a.step_threshold = f64::NAN,
            |a| a.jump_cooldown_s = -1.0,
            |a| a.calibration_samples = 0,
            |a| a.smoothing_window = 0,
            |a| a.speed_window = 0,
        ];
        for (i, breaks) in bad.iter().enumerate() {
            let mut analytics = AnalyticsConfig::default();
            breaks(&mut analytics);
            assert!(analytics.validate().is_err(), "case {i} accepted");
        }
        let mut alpha_one = AnalyticsConfig::default();
        alpha_one.jump_filter_alpha = 1.0;
        alpha_one.validate().unwrap();
    }

    #[test]
    fn rejects_bad_link_and_sink_settings() {
        let mut config = AppConfig::default();
        config.link.reconnect_backoff_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sink.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sink.retention_s = 0;
        assert!(config.validate().is_err());

        let config = parse_config("[analytics]\nsample_period_s = 0.0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = parse_config(&text).unwrap();
        assert_eq!(back.sink.publish_base_topic, config.sink.publish_base_topic);
        assert_eq!(back.tags[0].tag_id, config.tags[0].tag_id);
        assert_eq!(back.link.transport, TransportKind::Tcp);
    }
}
