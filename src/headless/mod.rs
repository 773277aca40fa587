//! Headless mode - JSON event output for scripting and end-to-end tests
//!
//! The runner prints structured events to stdout so scripts can drive the
//! coordinator over stdin and assert on what it did.
//!
//! # Event Format
//!
//! Events are output as NDJSON (newline-delimited JSON), one event per line.
//! Each event has an "event" field indicating its type, along with event-specific data.
//!
//! # Example Output
//!
//! ```json
//! {"event":"preference_changed","enabled":true,"timestamp":1704700001000}
//! {"event":"tracking_state_changed","old":"idle","new":"active_foreground_bound","timestamp":1704700001010}
//! {"event":"notification_shown","text":"no fix yet","timestamp":1704700002000}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use whereabouts_app::{EngineEvent, StatusSnapshot};
use whereabouts_core::TrackingState;

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    TrackingStateChanged {
        old: TrackingState,
        new: TrackingState,
        timestamp: i64,
    },

    /// Fix delivered to the attached consumer
    LocationFix {
        latitude: f64,
        longitude: f64,
        text: String,
        timestamp: i64,
    },

    PreferenceChanged { enabled: bool, timestamp: i64 },

    SubscribeFailed {
        reason: String,
        permission_denied: bool,
        timestamp: i64,
    },

    UnsubscribeFailed { reason: String, timestamp: i64 },

    NotificationFailed { reason: String, timestamp: i64 },

    PreferenceWriteFailed { reason: String, timestamp: i64 },

    NotificationShown { text: String, timestamp: i64 },

    NotificationUpdated { text: String, timestamp: i64 },

    NotificationCancelled { timestamp: i64 },

    OpenAppRequested { timestamp: i64 },

    /// Reply to the `status` command
    Status {
        #[serde(flatten)]
        status: StatusSnapshot,
        timestamp: i64,
    },

    /// Host-side problem (bad command, lagging event stream)
    Error { message: String, timestamp: i64 },

    Shutdown { timestamp: i64 },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // Write to stdout with newline (NDJSON format)
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn status(status: StatusSnapshot) -> Self {
        Self::Status {
            status,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: Self::now(),
        }
    }
}

impl From<EngineEvent> for HeadlessEvent {
    fn from(event: EngineEvent) -> Self {
        let timestamp = Self::now();
        match event {
            EngineEvent::TrackingStateChanged { old, new } => Self::TrackingStateChanged {
                old,
                new,
                timestamp,
            },
            EngineEvent::LocationFix { fix } => Self::LocationFix {
                latitude: fix.latitude,
                longitude: fix.longitude,
                text: fix.to_text(),
                timestamp,
            },
            EngineEvent::PreferenceChanged { enabled } => Self::PreferenceChanged {
                enabled,
                timestamp,
            },
            EngineEvent::SubscribeFailed {
                reason,
                permission_denied,
            } => Self::SubscribeFailed {
                reason,
                permission_denied,
                timestamp,
            },
            EngineEvent::UnsubscribeFailed { reason } => {
                Self::UnsubscribeFailed { reason, timestamp }
            }
            EngineEvent::NotificationFailed { reason } => {
                Self::NotificationFailed { reason, timestamp }
            }
            EngineEvent::PreferenceWriteFailed { reason } => {
                Self::PreferenceWriteFailed { reason, timestamp }
            }
            EngineEvent::NotificationShown { text } => Self::NotificationShown { text, timestamp },
            EngineEvent::NotificationUpdated { text } => {
                Self::NotificationUpdated { text, timestamp }
            }
            EngineEvent::NotificationCancelled => Self::NotificationCancelled { timestamp },
            EngineEvent::OpenAppRequested => Self::OpenAppRequested { timestamp },
            EngineEvent::Shutdown => Self::Shutdown { timestamp },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whereabouts_app::CoordinatorState;
    use whereabouts_core::LocationFix;

    fn to_value(event: &HeadlessEvent) -> serde_json::Value {
        let json = serde_json::to_string(event).expect("serialization failed");
        serde_json::from_str(&json).expect("invalid JSON")
    }

    #[test]
    fn test_tracking_state_changed_serialization() {
        let event = HeadlessEvent::from(EngineEvent::TrackingStateChanged {
            old: TrackingState::ActiveForegroundBound,
            new: TrackingState::ActiveBackgroundPromoted,
        });
        let value = to_value(&event);

        assert_eq!(value["event"], "tracking_state_changed");
        assert_eq!(value["old"], "active_foreground_bound");
        assert_eq!(value["new"], "active_background_promoted");
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_location_fix_carries_display_text() {
        let event = HeadlessEvent::from(EngineEvent::LocationFix {
            fix: LocationFix::new(10.0, 20.0),
        });
        let value = to_value(&event);

        assert_eq!(value["event"], "location_fix");
        assert_eq!(value["latitude"], 10.0);
        assert_eq!(value["text"], "(10, 20)");
    }

    #[test]
    fn test_subscribe_failed_serialization() {
        let event = HeadlessEvent::from(EngineEvent::SubscribeFailed {
            reason: "Location permission denied: user said no".to_string(),
            permission_denied: true,
        });
        let value = to_value(&event);

        assert_eq!(value["event"], "subscribe_failed");
        assert_eq!(value["permission_denied"], true);
    }

    #[test]
    fn test_unit_events_have_only_tag_and_timestamp() {
        let value = to_value(&HeadlessEvent::from(EngineEvent::NotificationCancelled));

        assert_eq!(value["event"], "notification_cancelled");
        assert_eq!(value.as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn test_status_is_flattened() {
        let state = CoordinatorState::with_defaults();
        let value = to_value(&HeadlessEvent::status(state.status()));

        assert_eq!(value["event"], "status");
        assert_eq!(value["tracking"], "idle");
        assert_eq!(value["tracking_enabled"], false);
        assert_eq!(value["fix_count"], 0);
        assert!(value["current_fix"].is_null());
    }

    #[test]
    fn test_error_serialization() {
        let value = to_value(&HeadlessEvent::error("unknown command: dance"));

        assert_eq!(value["event"], "error");
        assert_eq!(value["message"], "unknown command: dance");
    }
}
