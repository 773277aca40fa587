//! Engine - owns the coordinator and drives it from its message queue
//!
//! The Engine encapsulates the coordinator state, the message channel that
//! marshals every asynchronous completion onto a single owner, the location
//! and notification collaborators, and the event broadcast hosts listen to.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use whereabouts_core::prelude::*;
use whereabouts_core::TrackingState;

use crate::config::{self, Settings};
use crate::engine_event::EngineEvent;
use crate::message::Message;
use crate::notifier::{spawn_notifier, NotificationCommand};
use crate::preferences::{PreferenceStore, TomlPreferenceFile};
use crate::process;
use crate::services::{
    LocationSource, LogNotificationPresenter, NotificationPresenter, SimulatedLocationSource,
};
use crate::state::{CoordinatorState, FailureKind, StatusSnapshot};

/// Capacity of the coordinator's message queue
const MESSAGE_QUEUE_CAPACITY: usize = 256;

/// Capacity of the event broadcast
const EVENT_CAPACITY: usize = 256;

/// How long shutdown waits for queued notification calls
const NOTIFIER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone)]
struct StateSnapshot {
    tracking: TrackingState,
    preference_enabled: bool,
    fix_count: u64,
    failure_count: u64,
    open_app_requests: u64,
}

impl StateSnapshot {
    fn capture(state: &CoordinatorState) -> Self {
        Self {
            tracking: state.tracking,
            preference_enabled: state.preferences.is_tracking_enabled(),
            fix_count: state.fix_count,
            failure_count: state.failure_count,
            open_app_requests: state.open_app_requests,
        }
    }
}

/// Orchestration engine for the tracking coordinator.
pub struct Engine<L, N> {
    /// Coordinator state (the Model)
    pub state: CoordinatorState,

    /// Sender half of the message channel.
    /// Clone this to give to input sources (signal handler, host UI).
    msg_tx: mpsc::Sender<Message>,

    msg_rx: mpsc::Receiver<Message>,

    location: Arc<L>,

    presenter: Arc<N>,

    /// Queue to the notification worker; `None` after shutdown
    notifications: Option<mpsc::UnboundedSender<NotificationCommand>>,

    notifier_task: Option<JoinHandle<()>>,

    event_tx: broadcast::Sender<EngineEvent>,
}

impl Engine<SimulatedLocationSource, LogNotificationPresenter> {
    /// Engine for the headless runner: settings and the tracking preference
    /// from `data_dir`, a simulated location source and a logging presenter.
    pub fn from_data_dir(data_dir: &Path) -> Self {
        let settings = config::load_settings(data_dir);
        let preferences = PreferenceStore::open(TomlPreferenceFile::in_data_dir(data_dir));
        let location = Arc::new(SimulatedLocationSource::new(settings.simulator.clone()));
        let presenter = Arc::new(LogNotificationPresenter::new());
        Self::new(settings, preferences, location, presenter)
    }
}

impl<L, N> Engine<L, N>
where
    L: LocationSource + Sync + 'static,
    N: NotificationPresenter + Sync + 'static,
{
    /// Create an engine. Must be called inside a tokio runtime.
    ///
    /// `Message::Initialize` is queued first so the stored preference is
    /// reconciled before anything else is processed.
    pub fn new(
        settings: Settings,
        preferences: PreferenceStore,
        location: Arc<L>,
        presenter: Arc<N>,
    ) -> Self {
        let state = CoordinatorState::new(settings, preferences);

        let (msg_tx, msg_rx) = mpsc::channel::<Message>(MESSAGE_QUEUE_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let (notifications, notifier_task) =
            spawn_notifier(presenter.clone(), msg_tx.clone(), event_tx.clone());

        if msg_tx.try_send(Message::Initialize).is_err() {
            warn!("Could not queue initialization");
        }

        Self {
            state,
            msg_tx,
            msg_rx,
            location,
            presenter,
            notifications: Some(notifications),
            notifier_task: Some(notifier_task),
            event_tx,
        }
    }

    /// Subscribe to engine events.
    ///
    /// If the subscriber falls behind (buffer full), older events are
    /// dropped. Use `broadcast::error::RecvError::Lagged` to detect this.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Process a single message through the TEA update cycle and emit
    /// events for whatever changed.
    pub fn process_message(&mut self, msg: Message) {
        let Some(notifications) = self.notifications.as_ref() else {
            warn!("Engine is shut down, dropping {:?}", msg);
            return;
        };

        let pre = StateSnapshot::capture(&self.state);

        process::process_message(
            &mut self.state,
            msg,
            &self.msg_tx,
            &self.location,
            notifications,
        );

        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Wait for the next message and process it.
    ///
    /// Returns false when the channel is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.msg_rx.recv().await {
            Some(msg) => {
                self.process_message(msg);
                true
            }
            None => false,
        }
    }

    /// Process messages until the coordinator is ready to quit
    pub async fn run(&mut self) {
        while !self.should_quit() {
            if !self.process_next().await {
                break;
            }
        }
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Check if the engine should stop.
    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.state.status()
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn location_source(&self) -> &Arc<L> {
        &self.location
    }

    pub fn presenter(&self) -> &Arc<N> {
        &self.presenter
    }

    /// Stop the notification worker after it has flushed queued calls.
    pub async fn shutdown(&mut self) {
        self.emit(EngineEvent::Shutdown);

        // Dropping the sender lets the worker finish its queue and exit
        self.notifications = None;

        if let Some(task) = self.notifier_task.take() {
            match tokio::time::timeout(NOTIFIER_DRAIN_TIMEOUT, task).await {
                Ok(Ok(())) => debug!("Notification worker stopped"),
                Ok(Err(e)) => warn!("Notification worker panicked: {}", e),
                Err(_) => warn!("Notification worker did not stop in time"),
            }
        }

        if self.state.tracking.is_active() {
            info!(
                "Exiting while {} (stop_on_shutdown is off)",
                self.state.tracking
            );
        }
    }

    /// Emit EngineEvents based on state changes after processing.
    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        if pre.tracking != post.tracking {
            self.emit(EngineEvent::TrackingStateChanged {
                old: pre.tracking,
                new: post.tracking,
            });
        }

        if pre.preference_enabled != post.preference_enabled {
            self.emit(EngineEvent::PreferenceChanged {
                enabled: post.preference_enabled,
            });
        }

        // Fixes go to the consumer only while one is attached
        if post.fix_count > pre.fix_count && self.state.visibility.is_attached() {
            if let Some(fix) = self.state.current_fix {
                self.emit(EngineEvent::LocationFix { fix });
            }
        }

        if post.failure_count > pre.failure_count {
            if let Some(failure) = &self.state.last_failure {
                let reason = failure.error.to_string();
                let event = match failure.kind {
                    FailureKind::Subscribe => EngineEvent::SubscribeFailed {
                        permission_denied: failure.error.is_permission_denied(),
                        reason,
                    },
                    FailureKind::Unsubscribe => EngineEvent::UnsubscribeFailed { reason },
                    FailureKind::Notification => EngineEvent::NotificationFailed { reason },
                    FailureKind::Preference => EngineEvent::PreferenceWriteFailed { reason },
                };
                self.emit(event);
            }
        }

        if post.open_app_requests > pre.open_app_requests {
            self.emit(EngineEvent::OpenAppRequested);
        }
    }

    /// send() returns Err only if there are no receivers, which is fine.
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}
