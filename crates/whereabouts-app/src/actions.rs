//! Action handlers: UpdateAction dispatch and background task spawning

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use whereabouts_core::prelude::*;
use whereabouts_core::{LocationPolicy, SubscriptionHandle};

use crate::handler::UpdateAction;
use crate::message::Message;
use crate::notifier::NotificationCommand;
use crate::services::{FixSink, LocationSource};

/// Execute an action. Nothing here blocks: platform calls run on spawned
/// tasks and report back through `msg_tx`.
pub fn handle_action<L>(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    location: &Arc<L>,
    notifications: &mpsc::UnboundedSender<NotificationCommand>,
) where
    L: LocationSource + Sync + 'static,
{
    match action {
        UpdateAction::Subscribe { policy } => {
            spawn_subscribe(location.clone(), policy, msg_tx);
        }

        UpdateAction::Unsubscribe { handle, timeout } => {
            spawn_unsubscribe(location.clone(), handle, timeout, msg_tx);
        }

        UpdateAction::ShowNotification(notification) => {
            queue_notification(notifications, NotificationCommand::Show(notification));
        }

        UpdateAction::UpdateNotification(notification) => {
            queue_notification(notifications, NotificationCommand::Update(notification));
        }

        UpdateAction::CancelNotification { id } => {
            queue_notification(notifications, NotificationCommand::Cancel { id });
        }

        UpdateAction::ScheduleConfigChangeExpiry { generation, after } => {
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let _ = msg_tx
                    .send(Message::ConfigurationChangeExpired { generation })
                    .await;
            });
        }
    }
}

fn spawn_subscribe<L>(location: Arc<L>, policy: LocationPolicy, msg_tx: mpsc::Sender<Message>)
where
    L: LocationSource + Sync + 'static,
{
    tokio::spawn(async move {
        let sink = FixSink::new(msg_tx.clone());
        let result = location.subscribe(policy, sink).await;
        if let Err(e) = &result {
            warn!("Subscribe failed: {}", e);
        }
        if msg_tx.send(Message::SubscribeCompleted(result)).await.is_err() {
            error!("Coordinator gone before subscribe completed");
        }
    });
}

fn spawn_unsubscribe<L>(
    location: Arc<L>,
    handle: SubscriptionHandle,
    timeout: Duration,
    msg_tx: mpsc::Sender<Message>,
) where
    L: LocationSource + Sync + 'static,
{
    tokio::spawn(async move {
        let result = match tokio::time::timeout(timeout, location.unsubscribe(handle)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Unsubscribe of {} timed out after {:?}", handle, timeout);
                Err(Error::UnsubscribeTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };
        let _ = msg_tx
            .send(Message::UnsubscribeCompleted { handle, result })
            .await;
    });
}

fn queue_notification(
    notifications: &mpsc::UnboundedSender<NotificationCommand>,
    command: NotificationCommand,
) {
    if notifications.send(command).is_err() {
        warn!("Notification worker is not running");
    }
}
