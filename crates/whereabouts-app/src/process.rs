//! Message processing
//!
//! Runs the TEA update loop for one incoming message, following up on any
//! returned messages and dispatching the resulting actions.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::handler;
use crate::message::Message;
use crate::notifier::NotificationCommand;
use crate::services::LocationSource;
use crate::state::CoordinatorState;

use super::actions::handle_action;

/// Process a message through the TEA update function
pub fn process_message<L>(
    state: &mut CoordinatorState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    location: &Arc<L>,
    notifications: &mpsc::UnboundedSender<NotificationCommand>,
) where
    L: LocationSource + Sync + 'static,
{
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            handle_action(action, msg_tx.clone(), location, notifications);
        }

        // Continue with follow-up message
        msg = result.message;
    }
}
