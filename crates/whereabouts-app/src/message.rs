//! Message types for the coordinator (TEA pattern)

use whereabouts_core::{Error, LocationFix, NotificationAction, Result, SubscriptionHandle};

/// Everything that can happen to the coordinator.
///
/// Host lifecycle events, user requests and asynchronous completions all
/// arrive through the same queue and are applied one at a time.
#[derive(Debug, Clone)]
pub enum Message {
    /// Engine startup: reconcile the stored preference with reality
    Initialize,

    // ─────────────────────────────────────────────────────────
    // User requests
    // ─────────────────────────────────────────────────────────
    /// Start tracking
    Subscribe,

    /// Stop tracking
    Unsubscribe,

    /// Single start/stop button: stop when the preference says tracking is
    /// enabled, start otherwise
    ToggleTracking,

    // ─────────────────────────────────────────────────────────
    // Host lifecycle
    // ─────────────────────────────────────────────────────────
    /// A foreground consumer bound to the coordinator
    ConsumerAttached,

    /// A foreground consumer went away
    ConsumerDetached,

    /// The host is about to recreate its consumer (rotation etc.); the
    /// following detach is not the user leaving
    ConfigurationChanged,

    /// Grace period for configuration change `generation` ran out
    ConfigurationChangeExpired { generation: u64 },

    // ─────────────────────────────────────────────────────────
    // Location source
    // ─────────────────────────────────────────────────────────
    /// New fix from the location source
    LocationFix(LocationFix),

    /// Answer to a subscribe request
    SubscribeCompleted(Result<SubscriptionHandle>),

    /// Answer to an unsubscribe request (timeouts included)
    UnsubscribeCompleted {
        handle: SubscriptionHandle,
        result: Result<()>,
    },

    // ─────────────────────────────────────────────────────────
    // Notification surface
    // ─────────────────────────────────────────────────────────
    /// The user pressed one of the notification's buttons
    NotificationActionInvoked(NotificationAction),

    /// The presenter could not show, update or cancel the notification
    NotificationFailed { call: NotificationCall, error: Error },

    /// Shut down (signal handler, `quit` command)
    Quit,
}

/// The presenter call a [`Message::NotificationFailed`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCall {
    Show,
    Update,
    Cancel,
}
