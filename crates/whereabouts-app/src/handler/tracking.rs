//! Tracking lifecycle handlers
//!
//! Subscribe/unsubscribe requests and their completions, location fixes,
//! startup reconciliation and quit.

use whereabouts_core::prelude::*;
use whereabouts_core::{LocationFix, SubscriptionHandle, TrackingState};

use crate::message::Message;
use crate::state::{CoordinatorState, FailureKind, PendingRequest};

use super::notification::{cancel_notification, present_notification};
use super::{UpdateAction, UpdateResult};

/// Reconcile a preference left enabled by a previous run.
///
/// Nothing is subscribed after a restart, so the flag is either honored
/// (`resume_on_start`) or reset to match reality.
pub fn handle_initialize(state: &mut CoordinatorState) -> UpdateResult {
    if !state.preferences.is_tracking_enabled()
        || state.tracking.is_active()
        || state.pending.is_some()
    {
        return UpdateResult::none();
    }

    if state.settings.behavior.resume_on_start {
        info!("Tracking was enabled before shutdown, resuming");
        // The preference already reads "enabled"; Subscribe rewrites it.
        return UpdateResult::message(Message::Subscribe);
    }

    info!("Clearing stale tracking preference");
    state.persist_preference(false);
    UpdateResult::none()
}

/// Start tracking
pub fn handle_subscribe(state: &mut CoordinatorState) -> UpdateResult {
    if state.quitting {
        debug!("Ignoring subscribe: shutting down");
        return UpdateResult::none();
    }

    if let Some(pending) = state.pending {
        debug!("Ignoring subscribe: {} in progress", pending.label());
        return UpdateResult::none();
    }

    if state.tracking.is_active() {
        debug!("Ignoring subscribe: already {}", state.tracking);
        return UpdateResult::none();
    }

    // The flag must be durable before the platform is asked
    if !state.persist_preference(true) {
        return UpdateResult::none();
    }

    info!("Requesting location updates");
    state.pending = Some(PendingRequest::Subscribing {
        stop_requested: false,
    });
    UpdateResult::action(UpdateAction::Subscribe {
        policy: state.settings.location.policy(),
    })
}

/// Handle the location source's answer to a subscribe request
pub fn handle_subscribe_completed(
    state: &mut CoordinatorState,
    result: Result<SubscriptionHandle>,
) -> UpdateResult {
    let stop_requested = match state.pending {
        Some(PendingRequest::Subscribing { stop_requested }) => stop_requested,
        _ => {
            // Nobody is waiting for this subscription; release it right away
            return match result {
                Ok(handle) => {
                    warn!("Unexpected subscription {}, releasing it", handle);
                    UpdateResult::action(UpdateAction::Unsubscribe {
                        handle,
                        timeout: state.settings.behavior.unsubscribe_timeout(),
                    })
                }
                Err(e) => {
                    debug!("Ignoring stale subscribe failure: {}", e);
                    UpdateResult::none()
                }
            };
        }
    };
    state.pending = None;

    match result {
        Ok(handle) => {
            info!("Location updates granted ({})", handle);
            state.subscription = Some(handle);
            state.subscriptions_granted += 1;

            if stop_requested {
                info!("Stop was requested while subscribing");
                begin_unsubscribe(state, handle)
            } else {
                activate(state)
            }
        }
        Err(e) => {
            state.persist_preference(false);
            state.record_failure(FailureKind::Subscribe, e);
            UpdateResult::none()
        }
    }
}

/// Stop tracking
pub fn handle_unsubscribe(state: &mut CoordinatorState) -> UpdateResult {
    match state.pending {
        Some(PendingRequest::Subscribing { .. }) => {
            info!("Stop requested while subscribing, deferring");
            state.pending = Some(PendingRequest::Subscribing {
                stop_requested: true,
            });
            state.persist_preference(false);
            return UpdateResult::none();
        }
        Some(PendingRequest::Unsubscribing { .. }) => {
            debug!("Ignoring unsubscribe: already unsubscribing");
            return UpdateResult::none();
        }
        None => {}
    }

    match state.subscription {
        Some(handle) => begin_unsubscribe(state, handle),
        None => {
            debug!("Ignoring unsubscribe: not tracking");
            UpdateResult::none()
        }
    }
}

/// Handle the location source's answer to an unsubscribe request
pub fn handle_unsubscribe_completed(
    state: &mut CoordinatorState,
    handle: SubscriptionHandle,
    result: Result<()>,
) -> UpdateResult {
    match state.pending {
        Some(PendingRequest::Unsubscribing { handle: pending }) if pending == handle => {}
        _ => {
            debug!("Ignoring unsubscribe completion for {}", handle);
            return UpdateResult::none();
        }
    }
    state.pending = None;

    match result {
        Ok(()) => {
            info!("Location updates removed ({})", handle);
            state.subscription = None;
            state.successful_unsubscribes += 1;
            state.persist_preference(false);
            state.set_tracking(TrackingState::Idle);
            cancel_notification(state)
        }
        Err(e) => {
            // Keep tracking rather than lose track of a subscription that
            // may still be live.
            state.record_failure(FailureKind::Unsubscribe, e);
            state.persist_preference(true);
            match state.tracking {
                TrackingState::Idle => activate(state),
                // The consumer may have left while the request was in flight
                TrackingState::ActiveForegroundBound
                    if !state.visibility.is_attached() && !state.visibility.in_config_change() =>
                {
                    activate(state)
                }
                _ => UpdateResult::none(),
            }
        }
    }
}

/// Store the latest fix; refresh the notification when promoted
pub fn handle_location_fix(state: &mut CoordinatorState, fix: LocationFix) -> UpdateResult {
    trace!("Location fix {}", fix);
    state.current_fix = Some(fix);
    state.fix_count += 1;

    if state.tracking.is_promoted() {
        present_notification(state)
    } else {
        UpdateResult::none()
    }
}

/// Begin shutting down; unsubscribe first when configured to
pub fn handle_quit(state: &mut CoordinatorState) -> UpdateResult {
    if state.quitting {
        return UpdateResult::none();
    }
    state.quitting = true;
    info!("Quit requested");

    if !state.settings.behavior.stop_on_shutdown {
        return UpdateResult::none();
    }

    match state.pending {
        Some(PendingRequest::Subscribing { .. }) => {
            state.pending = Some(PendingRequest::Subscribing {
                stop_requested: true,
            });
            UpdateResult::none()
        }
        Some(PendingRequest::Unsubscribing { .. }) => UpdateResult::none(),
        None => match state.subscription {
            Some(handle) => begin_unsubscribe(state, handle),
            None => UpdateResult::none(),
        },
    }
}

/// Issue the unsubscribe request for `handle`
fn begin_unsubscribe(state: &mut CoordinatorState, handle: SubscriptionHandle) -> UpdateResult {
    info!("Removing location updates ({})", handle);
    state.persist_preference(false);
    state.pending = Some(PendingRequest::Unsubscribing { handle });
    UpdateResult::action(UpdateAction::Unsubscribe {
        handle,
        timeout: state.settings.behavior.unsubscribe_timeout(),
    })
}

/// Enter an active state: bound while a consumer is (or is about to be)
/// attached, promoted with the notification otherwise
fn activate(state: &mut CoordinatorState) -> UpdateResult {
    let flag = state.visibility.flag();
    if flag.attached || flag.in_config_change {
        state.set_tracking(TrackingState::ActiveForegroundBound);
        UpdateResult::none()
    } else {
        state.set_tracking(TrackingState::ActiveBackgroundPromoted);
        present_notification(state)
    }
}
