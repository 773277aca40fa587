//! Main update function - handles state transitions (TEA pattern)
//!
//! Handler implementations live in:
//! - `tracking`: subscribe/unsubscribe lifecycle, fixes, quit
//! - `consumer`: attach/detach and configuration changes
//! - `notification`: notification actions and failures

use crate::message::Message;
use crate::state::CoordinatorState;

use super::{consumer, notification, tracking, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut CoordinatorState, message: Message) -> UpdateResult {
    match message {
        Message::Initialize => tracking::handle_initialize(state),

        // ─────────────────────────────────────────────────────────
        // User requests
        // ─────────────────────────────────────────────────────────
        Message::Subscribe => tracking::handle_subscribe(state),
        Message::Unsubscribe => tracking::handle_unsubscribe(state),
        Message::ToggleTracking => {
            if state.preferences.is_tracking_enabled() {
                UpdateResult::message(Message::Unsubscribe)
            } else {
                UpdateResult::message(Message::Subscribe)
            }
        }

        // ─────────────────────────────────────────────────────────
        // Host lifecycle
        // ─────────────────────────────────────────────────────────
        Message::ConsumerAttached => consumer::handle_attached(state),
        Message::ConsumerDetached => consumer::handle_detached(state),
        Message::ConfigurationChanged => consumer::handle_configuration_changed(state),
        Message::ConfigurationChangeExpired { generation } => {
            consumer::handle_configuration_change_expired(state, generation)
        }

        // ─────────────────────────────────────────────────────────
        // Location source
        // ─────────────────────────────────────────────────────────
        Message::LocationFix(fix) => tracking::handle_location_fix(state, fix),
        Message::SubscribeCompleted(result) => tracking::handle_subscribe_completed(state, result),
        Message::UnsubscribeCompleted { handle, result } => {
            tracking::handle_unsubscribe_completed(state, handle, result)
        }

        // ─────────────────────────────────────────────────────────
        // Notification surface
        // ─────────────────────────────────────────────────────────
        Message::NotificationActionInvoked(action) => {
            notification::handle_action_invoked(state, action)
        }
        Message::NotificationFailed { call, error } => {
            notification::handle_failed(state, call, error)
        }

        Message::Quit => tracking::handle_quit(state),
    }
}
