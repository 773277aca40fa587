//! Foreground consumer handlers
//!
//! Attach/detach flip between foreground-bound and background-promoted
//! tracking. A configuration change suppresses promotion until the consumer
//! re-attaches or the grace period expires.

use whereabouts_core::prelude::*;
use whereabouts_core::TrackingState;

use crate::state::CoordinatorState;

use super::notification::{cancel_notification, present_notification};
use super::{UpdateAction, UpdateResult};

/// A consumer attached: demote and take the notification down
pub fn handle_attached(state: &mut CoordinatorState) -> UpdateResult {
    state.visibility.attach();
    debug!("Consumer attached ({} total)", state.visibility.consumer_count());

    if state.tracking.is_promoted() {
        state.set_tracking(TrackingState::ActiveForegroundBound);
    }
    // Also retries a cancel that failed earlier
    cancel_notification(state)
}

/// A consumer detached: promote unless someone is still attached or a
/// configuration change is in progress
pub fn handle_detached(state: &mut CoordinatorState) -> UpdateResult {
    let flag = state.visibility.detach();
    debug!("Consumer detached ({} left)", state.visibility.consumer_count());

    if flag.attached {
        return UpdateResult::none();
    }

    if flag.in_config_change {
        debug!("Detached during configuration change, not promoting");
        return match state.settings.behavior.config_change_grace() {
            Some(after) => UpdateResult::action(UpdateAction::ScheduleConfigChangeExpiry {
                generation: state.visibility.config_change_generation(),
                after,
            }),
            None => UpdateResult::none(),
        };
    }

    maybe_promote(state)
}

pub fn handle_configuration_changed(state: &mut CoordinatorState) -> UpdateResult {
    let generation = state.visibility.begin_config_change();
    debug!("Configuration change #{} started", generation);
    UpdateResult::none()
}

/// Grace period ran out without a re-attach
pub fn handle_configuration_change_expired(
    state: &mut CoordinatorState,
    generation: u64,
) -> UpdateResult {
    if !state.visibility.expire_config_change(generation) {
        trace!("Configuration change #{} already over", generation);
        return UpdateResult::none();
    }

    info!(
        "No consumer returned after configuration change #{}",
        generation
    );
    maybe_promote(state)
}

/// Promote to the background when tracking is enabled and nobody is watching
fn maybe_promote(state: &mut CoordinatorState) -> UpdateResult {
    let flag = state.visibility.flag();
    let should_promote = state.tracking == TrackingState::ActiveForegroundBound
        && !flag.attached
        && !flag.in_config_change
        && state.preferences.is_tracking_enabled();

    if !should_promote {
        return UpdateResult::none();
    }

    state.set_tracking(TrackingState::ActiveBackgroundPromoted);
    present_notification(state)
}
