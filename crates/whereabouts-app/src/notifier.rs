//! Notification worker
//!
//! Presenter calls are executed one at a time, in the order the coordinator
//! issued them, on a dedicated task. Show/update/cancel therefore never
//! overtake each other even though they are async.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use whereabouts_core::prelude::*;
use whereabouts_core::Notification;

use crate::engine_event::EngineEvent;
use crate::message::{Message, NotificationCall};
use crate::services::NotificationPresenter;

/// A presenter call queued for the worker
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationCommand {
    Show(Notification),
    Update(Notification),
    Cancel { id: u32 },
}

impl NotificationCommand {
    pub fn call(&self) -> NotificationCall {
        match self {
            Self::Show(_) => NotificationCall::Show,
            Self::Update(_) => NotificationCall::Update,
            Self::Cancel { .. } => NotificationCall::Cancel,
        }
    }
}

/// Spawn the worker. It runs until every sender is dropped.
///
/// Successful calls are broadcast as [`EngineEvent`]s; failures go back to
/// the coordinator as [`Message::NotificationFailed`].
pub fn spawn_notifier<N>(
    presenter: Arc<N>,
    msg_tx: mpsc::Sender<Message>,
    event_tx: broadcast::Sender<EngineEvent>,
) -> (mpsc::UnboundedSender<NotificationCommand>, JoinHandle<()>)
where
    N: NotificationPresenter + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationCommand>();

    let task = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            let (result, event) = match &command {
                NotificationCommand::Show(n) => (
                    presenter.show(n).await,
                    EngineEvent::NotificationShown {
                        text: n.text.clone(),
                    },
                ),
                NotificationCommand::Update(n) => (
                    presenter.update(n).await,
                    EngineEvent::NotificationUpdated {
                        text: n.text.clone(),
                    },
                ),
                NotificationCommand::Cancel { id } => {
                    (presenter.cancel(*id).await, EngineEvent::NotificationCancelled)
                }
            };

            match result {
                Ok(()) => {
                    let _ = event_tx.send(event);
                }
                Err(error) => {
                    warn!("Notification {:?} failed: {}", command, error);
                    let failed = Message::NotificationFailed {
                        call: command.call(),
                        error,
                    };
                    if msg_tx.send(failed).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Notification worker stopped");
    });

    (tx, task)
}
