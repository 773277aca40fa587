//! Domain events emitted by the Engine for external consumers
//!
//! Hosts (the headless runner, a UI) subscribe via `Engine::subscribe()`.
//! Coordinator events are derived after each message processing cycle;
//! notification events are emitted once the presenter has acted.

use whereabouts_core::{LocationFix, TrackingState};

/// Domain events emitted by the Engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Tracking
    // ─────────────────────────────────────────────────────────
    /// The coordinator changed tracking state
    TrackingStateChanged {
        old: TrackingState,
        new: TrackingState,
    },

    /// New fix for the attached foreground consumer.
    /// Only emitted while a consumer is attached.
    LocationFix { fix: LocationFix },

    /// The stored tracking preference changed
    PreferenceChanged { enabled: bool },

    // ─────────────────────────────────────────────────────────
    // Failures (surfaced for user-initiated retry)
    // ─────────────────────────────────────────────────────────
    /// Subscribe was rejected; `permission_denied` tells the host to ask
    /// the user for the permission
    SubscribeFailed {
        reason: String,
        permission_denied: bool,
    },

    /// Unsubscribe failed or timed out; tracking continues
    UnsubscribeFailed { reason: String },

    /// The presenter failed to show, update or cancel
    NotificationFailed { reason: String },

    /// The tracking preference could not be written
    PreferenceWriteFailed { reason: String },

    // ─────────────────────────────────────────────────────────
    // Notification
    // ─────────────────────────────────────────────────────────
    NotificationShown { text: String },

    NotificationUpdated { text: String },

    NotificationCancelled,

    /// The user asked to bring the host back to the foreground
    OpenAppRequested,

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Engine is shutting down
    Shutdown,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TrackingStateChanged { .. } => "tracking_state_changed",
            Self::LocationFix { .. } => "location_fix",
            Self::PreferenceChanged { .. } => "preference_changed",
            Self::SubscribeFailed { .. } => "subscribe_failed",
            Self::UnsubscribeFailed { .. } => "unsubscribe_failed",
            Self::NotificationFailed { .. } => "notification_failed",
            Self::PreferenceWriteFailed { .. } => "preference_write_failed",
            Self::NotificationShown { .. } => "notification_shown",
            Self::NotificationUpdated { .. } => "notification_updated",
            Self::NotificationCancelled => "notification_cancelled",
            Self::OpenAppRequested => "open_app_requested",
            Self::Shutdown => "shutdown",
        }
    }

    /// True for the failure variants
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::SubscribeFailed { .. }
                | Self::UnsubscribeFailed { .. }
                | Self::NotificationFailed { .. }
                | Self::PreferenceWriteFailed { .. }
        )
    }
}
