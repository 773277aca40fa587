//! Coordinator state (Model in TEA pattern)

use serde::Serialize;
use whereabouts_core::prelude::*;
use whereabouts_core::{
    LocationFix, NotificationTemplate, SubscriptionHandle, TrackingState, VisibilityFlag,
};

use crate::config::Settings;
use crate::preferences::PreferenceStore;
use crate::visibility::VisibilityTracker;

/// A location-source request that has been issued but not yet answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequest {
    /// Waiting for `LocationSource::subscribe`.
    ///
    /// `stop_requested` records an Unsubscribe that arrived meanwhile; it is
    /// carried out as soon as the subscription is granted.
    Subscribing { stop_requested: bool },

    /// Waiting for `LocationSource::unsubscribe` on `handle`
    Unsubscribing { handle: SubscriptionHandle },
}

impl PendingRequest {
    pub fn label(&self) -> &'static str {
        match self {
            PendingRequest::Subscribing { .. } => "subscribing",
            PendingRequest::Unsubscribing { .. } => "unsubscribing",
        }
    }
}

/// Which operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Subscribe,
    Unsubscribe,
    Notification,
    Preference,
}

/// A failure surfaced to the host for user-initiated retry
#[derive(Debug, Clone)]
pub struct Failure {
    pub kind: FailureKind,
    pub error: Error,
}

/// Serializable view of the coordinator, for status queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub tracking: TrackingState,
    pub tracking_enabled: bool,
    pub attached: bool,
    pub in_config_change: bool,
    pub notification_visible: bool,
    pub pending: Option<&'static str>,
    pub current_fix: Option<LocationFix>,
    pub fix_count: u64,
    pub last_error: Option<String>,
}

/// Complete coordinator state
#[derive(Debug)]
pub struct CoordinatorState {
    /// Current tracking state. The location source is subscribed exactly
    /// when this is not `Idle` (outside of in-flight requests).
    pub tracking: TrackingState,

    pub preferences: PreferenceStore,

    pub visibility: VisibilityTracker,

    pub settings: Settings,

    /// Static notification content, built once from settings
    pub template: NotificationTemplate,

    /// Latest fix; overwritten on every delivery
    pub current_fix: Option<LocationFix>,

    /// Live subscription, if any
    pub subscription: Option<SubscriptionHandle>,

    pub pending: Option<PendingRequest>,

    /// Whether the persistent notification is currently up
    pub notification_visible: bool,

    /// Quit was requested; the engine stops once `pending` clears
    pub quitting: bool,

    pub fix_count: u64,

    /// Subscriptions granted by the location source
    pub subscriptions_granted: u64,

    /// Unsubscribes the location source confirmed
    pub successful_unsubscribes: u64,

    pub open_app_requests: u64,

    pub last_failure: Option<Failure>,

    pub failure_count: u64,
}

impl CoordinatorState {
    pub fn new(settings: Settings, preferences: PreferenceStore) -> Self {
        let template = settings.notification.template();
        Self {
            tracking: TrackingState::Idle,
            preferences,
            visibility: VisibilityTracker::new(),
            settings,
            template,
            current_fix: None,
            subscription: None,
            pending: None,
            notification_visible: false,
            quitting: false,
            fix_count: 0,
            subscriptions_granted: 0,
            successful_unsubscribes: 0,
            open_app_requests: 0,
            last_failure: None,
            failure_count: 0,
        }
    }

    /// State with default settings and an in-memory preference
    pub fn with_defaults() -> Self {
        Self::new(Settings::default(), PreferenceStore::in_memory())
    }

    pub fn should_quit(&self) -> bool {
        self.quitting && self.pending.is_none()
    }

    pub fn visibility_flag(&self) -> VisibilityFlag {
        self.visibility.flag()
    }

    /// Subscriptions still held according to the location source's answers
    pub fn outstanding_subscriptions(&self) -> u64 {
        self.subscriptions_granted
            .saturating_sub(self.successful_unsubscribes)
    }

    pub(crate) fn set_tracking(&mut self, new: TrackingState) {
        if self.tracking != new {
            info!("Tracking: {} -> {}", self.tracking, new);
            self.tracking = new;
        }
    }

    pub(crate) fn record_failure(&mut self, kind: FailureKind, error: Error) {
        if error.is_recoverable() {
            warn!("{:?} failed: {}", kind, error);
        } else {
            error!("{:?} failed: {}", kind, error);
        }
        self.failure_count += 1;
        self.last_failure = Some(Failure { kind, error });
    }

    /// Persist the preference, recording a failure instead of propagating it
    pub(crate) fn persist_preference(&mut self, enabled: bool) -> bool {
        match self.preferences.set_tracking_enabled(enabled) {
            Ok(()) => true,
            Err(e) => {
                self.record_failure(FailureKind::Preference, e);
                false
            }
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let flag = self.visibility.flag();
        StatusSnapshot {
            tracking: self.tracking,
            tracking_enabled: self.preferences.is_tracking_enabled(),
            attached: flag.attached,
            in_config_change: flag.in_config_change,
            notification_visible: self.notification_visible,
            pending: self.pending.as_ref().map(PendingRequest::label),
            current_fix: self.current_fix,
            fix_count: self.fix_count,
            last_error: self.last_failure.as_ref().map(|f| f.error.to_string()),
        }
    }
}
