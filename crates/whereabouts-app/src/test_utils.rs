//! Test utilities for the coordinator and engine
//!
//! Provides recording collaborators and engine constructors. Available to
//! this crate's unit tests and, through the `test-helpers` feature, to
//! integration tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use whereabouts_core::prelude::*;
use whereabouts_core::{LocationFix, LocationPolicy, Notification, SubscriptionHandle};

use crate::config::Settings;
use crate::engine::Engine;
use crate::preferences::{MemoryPreferences, PreferenceStore};
use crate::services::{FixSink, LocationSource, NotificationPresenter};
use crate::state::CoordinatorState;

/// Engine type used by tests
pub type TestEngine = Engine<RecordingLocationSource, RecordingNotificationPresenter>;

// ─────────────────────────────────────────────────────────────────────────────
// Recording location source
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LocationLog {
    subscribe_calls: usize,
    granted: u64,
    unsubscribe_calls: usize,
    unsubscribed: u64,
    active: HashSet<SubscriptionHandle>,
    last_sink: Option<FixSink>,
    last_policy: Option<LocationPolicy>,
}

/// Location source that records calls and can be told to misbehave
#[derive(Debug, Default)]
pub struct RecordingLocationSource {
    log: Mutex<LocationLog>,
    next_handle: AtomicU64,
    deny: AtomicBool,
    fail_unsubscribe: AtomicBool,
    hold_subscribe: AtomicBool,
    hold_unsubscribe: AtomicBool,
    subscribe_gate: Notify,
    unsubscribe_gate: Notify,
}

impl RecordingLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, LocationLog> {
        // A panicking test thread is the only way to poison this
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refuse subscriptions with `PermissionDenied`
    pub fn deny_permission(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Fail unsubscribes with a platform error
    pub fn fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::SeqCst);
    }

    /// Park subscribe calls until [`release_subscribe`](Self::release_subscribe)
    pub fn hold_subscribe(&self, hold: bool) {
        self.hold_subscribe.store(hold, Ordering::SeqCst);
    }

    pub fn release_subscribe(&self) {
        self.subscribe_gate.notify_one();
    }

    /// Park unsubscribe calls until [`release_unsubscribe`](Self::release_unsubscribe)
    pub fn hold_unsubscribe(&self, hold: bool) {
        self.hold_unsubscribe.store(hold, Ordering::SeqCst);
    }

    pub fn release_unsubscribe(&self) {
        self.unsubscribe_gate.notify_one();
    }

    pub fn subscribe_calls(&self) -> usize {
        self.log().subscribe_calls
    }

    /// Subscriptions granted so far
    pub fn granted(&self) -> u64 {
        self.log().granted
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.log().unsubscribe_calls
    }

    /// Unsubscribes that succeeded
    pub fn unsubscribed(&self) -> u64 {
        self.log().unsubscribed
    }

    pub fn active_subscriptions(&self) -> usize {
        self.log().active.len()
    }

    pub fn last_policy(&self) -> Option<LocationPolicy> {
        self.log().last_policy
    }

    /// Deliver a fix through the most recent subscription's sink
    pub async fn push_fix(&self, latitude: f64, longitude: f64) -> Result<()> {
        let sink = self
            .log()
            .last_sink
            .clone()
            .ok_or_else(|| Error::platform("no subscription to deliver to"))?;
        sink.deliver(LocationFix::new(latitude, longitude)).await
    }
}

impl LocationSource for RecordingLocationSource {
    async fn subscribe(
        &self,
        policy: LocationPolicy,
        sink: FixSink,
    ) -> Result<SubscriptionHandle> {
        {
            let mut log = self.log();
            log.subscribe_calls += 1;
            log.last_policy = Some(policy);
        }

        if self.hold_subscribe.load(Ordering::SeqCst) {
            self.subscribe_gate.notified().await;
        }

        if self.deny.load(Ordering::SeqCst) {
            return Err(Error::permission_denied("denied by test"));
        }

        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        let mut log = self.log();
        log.granted += 1;
        log.active.insert(handle);
        log.last_sink = Some(sink);
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        self.log().unsubscribe_calls += 1;

        if self.hold_unsubscribe.load(Ordering::SeqCst) {
            self.unsubscribe_gate.notified().await;
        }

        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(Error::platform("unsubscribe rejected by test"));
        }

        let mut log = self.log();
        if !log.active.remove(&handle) {
            return Err(Error::platform(format!("unknown subscription {}", handle)));
        }
        log.unsubscribed += 1;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recording notification presenter
// ─────────────────────────────────────────────────────────────────────────────

/// A call made to the presenter
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterCall {
    Show(Notification),
    Update(Notification),
    Cancel(u32),
}

impl PresenterCall {
    /// Body text for show/update calls
    pub fn text(&self) -> Option<&str> {
        match self {
            PresenterCall::Show(n) | PresenterCall::Update(n) => Some(&n.text),
            PresenterCall::Cancel(_) => None,
        }
    }
}

/// Presenter that records every call
#[derive(Debug, Default)]
pub struct RecordingNotificationPresenter {
    calls: Mutex<Vec<PresenterCall>>,
    failing: AtomicBool,
    changed: Notify,
}

impl RecordingNotificationPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (it is still recorded)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Wait until at least `count` calls were made; returns all calls
    pub async fn wait_for_calls(&self, count: usize) -> Vec<PresenterCall> {
        loop {
            let notified = self.changed.notified();
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            notified.await;
        }
    }

    fn record(&self, call: PresenterCall) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        self.changed.notify_waiters();
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::notification("presenter failure injected by test"))
        } else {
            Ok(())
        }
    }
}

impl NotificationPresenter for RecordingNotificationPresenter {
    async fn show(&self, notification: &Notification) -> Result<()> {
        self.record(PresenterCall::Show(notification.clone()))
    }

    async fn update(&self, notification: &Notification) -> Result<()> {
        self.record(PresenterCall::Update(notification.clone()))
    }

    async fn cancel(&self, id: u32) -> Result<()> {
        self.record(PresenterCall::Cancel(id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Engine with recording collaborators and an in-memory preference.
///
/// The queued `Initialize` message has already been processed.
pub fn test_engine(
    settings: Settings,
) -> (
    TestEngine,
    Arc<RecordingLocationSource>,
    Arc<RecordingNotificationPresenter>,
) {
    test_engine_with_preferences(settings, Arc::new(MemoryPreferences::new()))
}

/// Like [`test_engine`], sharing the given preference backend
pub fn test_engine_with_preferences(
    settings: Settings,
    preferences: Arc<MemoryPreferences>,
) -> (
    TestEngine,
    Arc<RecordingLocationSource>,
    Arc<RecordingNotificationPresenter>,
) {
    let location = Arc::new(RecordingLocationSource::new());
    let presenter = Arc::new(RecordingNotificationPresenter::new());
    let mut engine = Engine::new(
        settings,
        PreferenceStore::open(preferences),
        location.clone(),
        presenter.clone(),
    );
    engine.drain_pending_messages();
    (engine, location, presenter)
}

/// Process queued messages until `done` holds, or fail after `timeout`
pub async fn process_until<F>(engine: &mut TestEngine, timeout: Duration, done: F) -> bool
where
    F: Fn(&CoordinatorState) -> bool,
{
    let work = async {
        while !done(&engine.state) {
            if !engine.process_next().await {
                return false;
            }
        }
        true
    };
    tokio::time::timeout(timeout, work).await.unwrap_or(false)
}
