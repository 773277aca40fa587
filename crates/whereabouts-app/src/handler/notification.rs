//! Notification handlers and helpers

use whereabouts_core::prelude::*;
use whereabouts_core::{Notification, NotificationAction};

use crate::message::{Message, NotificationCall};
use crate::state::{CoordinatorState, FailureKind};

use super::{UpdateAction, UpdateResult};

/// Show the notification for the current fix, or update it when already up
pub(crate) fn present_notification(state: &mut CoordinatorState) -> UpdateResult {
    let notification = Notification::for_fix(state.current_fix.as_ref(), &state.template);
    let action = if state.notification_visible {
        UpdateAction::UpdateNotification(notification)
    } else {
        UpdateAction::ShowNotification(notification)
    };
    state.notification_visible = true;
    UpdateResult::action(action)
}

/// Take the notification down if it is up
pub(crate) fn cancel_notification(state: &mut CoordinatorState) -> UpdateResult {
    if !state.notification_visible {
        return UpdateResult::none();
    }
    state.notification_visible = false;
    UpdateResult::action(UpdateAction::CancelNotification {
        id: state.template.id,
    })
}

pub fn handle_action_invoked(
    state: &mut CoordinatorState,
    action: NotificationAction,
) -> UpdateResult {
    info!("Notification action: {:?}", action);
    match action {
        NotificationAction::StopTracking => UpdateResult::message(Message::Unsubscribe),
        NotificationAction::OpenApp => {
            state.open_app_requests += 1;
            UpdateResult::none()
        }
    }
}

/// The presenter failed. A failed `Show` left nothing on screen, so the
/// next presentation starts with a fresh `Show`. After a failed `Update` or
/// `Cancel` the previous notification may still be up and must still be
/// cancelled once it is no longer wanted.
pub fn handle_failed(
    state: &mut CoordinatorState,
    call: NotificationCall,
    error: Error,
) -> UpdateResult {
    match call {
        NotificationCall::Show => state.notification_visible = false,
        NotificationCall::Update => {}
        NotificationCall::Cancel => state.notification_visible = true,
    }
    state.record_failure(FailureKind::Notification, error);
    UpdateResult::none()
}
