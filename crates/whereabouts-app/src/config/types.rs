//! Configuration types for Whereabouts
//!
//! Defines:
//! - `Settings` - Global settings (config.toml)
//! - `LocationSettings` - Subscription policy
//! - `NotificationSettings` - Persistent notification content
//! - `BehaviorSettings` - Coordinator timing and lifecycle knobs
//! - `SimulatorSettings` - Bundled simulated location source

use std::time::Duration;

use serde::{Deserialize, Serialize};
use whereabouts_core::{
    LocationPolicy, LocationPriority, NotificationTemplate, DEFAULT_CHANNEL_ID,
    DEFAULT_NOTIFICATION_ID, DEFAULT_PLACEHOLDER_TEXT,
};

/// Application settings (config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub location: LocationSettings,

    #[serde(default)]
    pub notification: NotificationSettings,

    #[serde(default)]
    pub behavior: BehaviorSettings,

    #[serde(default)]
    pub simulator: SimulatorSettings,
}

/// Location subscription policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationSettings {
    /// Desired interval between fixes, in seconds (inexact)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Fastest interval between fixes, in seconds (exact floor)
    #[serde(default = "default_fastest_interval_secs")]
    pub fastest_interval_secs: u64,

    /// Maximum batching delay, in seconds
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    #[serde(default)]
    pub priority: LocationPriority,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fastest_interval_secs: default_fastest_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            priority: LocationPriority::default(),
        }
    }
}

impl LocationSettings {
    pub fn policy(&self) -> LocationPolicy {
        LocationPolicy {
            interval: Duration::from_secs(self.interval_secs),
            fastest_interval: Duration::from_secs(self.fastest_interval_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
            priority: self.priority,
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_fastest_interval_secs() -> u64 {
    30
}

fn default_max_wait_secs() -> u64 {
    120
}

/// Persistent notification content
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotificationSettings {
    #[serde(default = "default_notification_id")]
    pub id: u32,

    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    #[serde(default = "default_title")]
    pub title: String,

    /// Body text before the first fix arrives
    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,

    #[serde(default = "default_open_app_label")]
    pub open_app_label: String,

    #[serde(default = "default_stop_tracking_label")]
    pub stop_tracking_label: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            id: default_notification_id(),
            channel_id: default_channel_id(),
            title: default_title(),
            placeholder_text: default_placeholder_text(),
            open_app_label: default_open_app_label(),
            stop_tracking_label: default_stop_tracking_label(),
        }
    }
}

impl NotificationSettings {
    pub fn template(&self) -> NotificationTemplate {
        NotificationTemplate {
            id: self.id,
            channel_id: self.channel_id.clone(),
            title: self.title.clone(),
            placeholder_text: self.placeholder_text.clone(),
            open_app_label: self.open_app_label.clone(),
            stop_tracking_label: self.stop_tracking_label.clone(),
        }
    }
}

fn default_notification_id() -> u32 {
    DEFAULT_NOTIFICATION_ID
}

fn default_channel_id() -> String {
    DEFAULT_CHANNEL_ID.to_string()
}

fn default_title() -> String {
    "Whereabouts".to_string()
}

fn default_placeholder_text() -> String {
    DEFAULT_PLACEHOLDER_TEXT.to_string()
}

fn default_open_app_label() -> String {
    "Open app".to_string()
}

fn default_stop_tracking_label() -> String {
    "Stop tracking".to_string()
}

/// Coordinator behavior settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BehaviorSettings {
    /// Upper bound on waiting for the platform to confirm an unsubscribe
    #[serde(default = "default_unsubscribe_timeout_ms")]
    pub unsubscribe_timeout_ms: u64,

    /// How long a consumer may stay detached during a configuration change
    /// before the change is considered over. 0 waits for the re-attach.
    #[serde(default)]
    pub config_change_grace_ms: u64,

    /// Unsubscribe before the engine exits
    #[serde(default = "default_true")]
    pub stop_on_shutdown: bool,

    /// Re-subscribe at startup when the stored preference says tracking was on
    #[serde(default)]
    pub resume_on_start: bool,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            unsubscribe_timeout_ms: default_unsubscribe_timeout_ms(),
            config_change_grace_ms: 0,
            stop_on_shutdown: true,
            resume_on_start: false,
        }
    }
}

impl BehaviorSettings {
    pub fn unsubscribe_timeout(&self) -> Duration {
        Duration::from_millis(self.unsubscribe_timeout_ms)
    }

    pub fn config_change_grace(&self) -> Option<Duration> {
        (self.config_change_grace_ms > 0).then(|| Duration::from_millis(self.config_change_grace_ms))
    }
}

fn default_unsubscribe_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

/// Permission answer the simulated platform gives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulatedPermission {
    #[default]
    Granted,
    Denied,
}

/// Simulated location source settings (headless runner)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulatorSettings {
    #[serde(default = "default_start_latitude")]
    pub start_latitude: f64,

    #[serde(default = "default_start_longitude")]
    pub start_longitude: f64,

    /// Maximum distance walked per fix, in degrees
    #[serde(default = "default_step_degrees")]
    pub step_degrees: f64,

    /// Delivery period override in milliseconds. 0 follows the policy interval.
    #[serde(default)]
    pub tick_ms: u64,

    #[serde(default)]
    pub permission: SimulatedPermission,

    /// Make every unsubscribe fail, to exercise the rollback path
    #[serde(default)]
    pub fail_unsubscribe: bool,

    /// Artificial delay before an unsubscribe completes
    #[serde(default = "default_unsubscribe_delay_ms")]
    pub unsubscribe_delay_ms: u64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            start_latitude: default_start_latitude(),
            start_longitude: default_start_longitude(),
            step_degrees: default_step_degrees(),
            tick_ms: 0,
            permission: SimulatedPermission::default(),
            fail_unsubscribe: false,
            unsubscribe_delay_ms: default_unsubscribe_delay_ms(),
        }
    }
}

fn default_start_latitude() -> f64 {
    37.4220
}

fn default_start_longitude() -> f64 {
    -122.0841
}

fn default_step_degrees() -> f64 {
    0.0005
}

fn default_unsubscribe_delay_ms() -> u64 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.location.interval_secs, 60);
        assert_eq!(settings.notification.id, 12_345_678);
        assert_eq!(settings.notification.placeholder_text, "no fix yet");
        assert_eq!(settings.behavior.unsubscribe_timeout_ms, 5_000);
        assert!(settings.behavior.stop_on_shutdown);
        assert!(!settings.behavior.resume_on_start);
        assert_eq!(settings.simulator.permission, SimulatedPermission::Granted);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[location]
interval_secs = 10
fastest_interval_secs = 5
priority = "low_power"

[behavior]
config_change_grace_ms = 1500
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.location.interval_secs, 10);
        assert_eq!(settings.location.max_wait_secs, 120);
        assert_eq!(settings.location.priority, LocationPriority::LowPower);
        assert_eq!(
            settings.behavior.config_change_grace(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(settings.notification, NotificationSettings::default());
    }

    #[test]
    fn test_policy_from_location_settings() {
        let policy = LocationSettings::default().policy();
        assert_eq!(policy, LocationPolicy::default());
    }

    #[test]
    fn test_zero_grace_means_wait_for_reattach() {
        assert_eq!(BehaviorSettings::default().config_change_grace(), None);
    }

    #[test]
    fn test_template_carries_labels() {
        let settings = NotificationSettings {
            title: "Tracker".to_string(),
            ..NotificationSettings::default()
        };
        let template = settings.template();
        assert_eq!(template.title, "Tracker");
        assert_eq!(template.channel_id, "while_in_use_channel_01");
    }

    #[test]
    fn test_simulator_permission_parses_lowercase() {
        let toml = r#"
[simulator]
permission = "denied"
fail_unsubscribe = true
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.simulator.permission, SimulatedPermission::Denied);
        assert!(settings.simulator.fail_unsubscribe);
    }
}
