//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `tracking`: Subscribe/unsubscribe lifecycle and location fixes
//! - `consumer`: Attach/detach and configuration-change handling
//! - `notification`: Notification presentation and notification actions

pub(crate) mod consumer;
pub(crate) mod notification;
pub(crate) mod tracking;
pub(crate) mod update;


use std::time::Duration;

use crate::message::Message;
use whereabouts_core::{LocationPolicy, Notification, SubscriptionHandle};

// Re-export main entry point
pub use update::update;

/// Actions that the engine should perform after update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Ask the location source for a subscription
    Subscribe { policy: LocationPolicy },

    /// Release a subscription, giving up after `timeout`
    Unsubscribe {
        handle: SubscriptionHandle,
        timeout: Duration,
    },

    /// Put the persistent notification up
    ShowNotification(Notification),

    /// Refresh the notification that is already up
    UpdateNotification(Notification),

    /// Take the notification down
    CancelNotification { id: u32 },

    /// Deliver `ConfigurationChangeExpired { generation }` after `after`
    ScheduleConfigChangeExpiry { generation: u64, after: Duration },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the engine to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }
}
