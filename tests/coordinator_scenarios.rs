//! Integration tests driving the engine through full tracking scenarios
//!
//! Collaborators are the recording fakes from `whereabouts_app::test_utils`;
//! every asynchronous completion travels through the engine's real queue.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use whereabouts_app::config::Settings;
use whereabouts_app::preferences::{
    MemoryPreferences, PreferenceBackend, PreferenceStore, TomlPreferenceFile,
};
use whereabouts_app::test_utils::{
    process_until, test_engine, test_engine_with_preferences, PresenterCall,
    RecordingLocationSource, RecordingNotificationPresenter, TestEngine,
};
use whereabouts_app::{Engine, EngineEvent, Message};
use whereabouts_core::{NotificationAction, TrackingState, DEFAULT_NOTIFICATION_ID};

const WAIT: Duration = Duration::from_secs(5);

async fn presenter_calls(
    presenter: &RecordingNotificationPresenter,
    count: usize,
) -> Vec<PresenterCall> {
    tokio::time::timeout(WAIT, presenter.wait_for_calls(count))
        .await
        .expect("presenter calls did not arrive")
}

async fn wait_for_state(engine: &mut TestEngine, state: TrackingState) {
    assert!(
        process_until(engine, WAIT, |s| s.tracking == state).await,
        "never reached {}",
        state
    );
}

/// Attach, subscribe and wait until the subscription is granted
async fn start_in_foreground(engine: &mut TestEngine) {
    engine.process_message(Message::ConsumerAttached);
    engine.process_message(Message::Subscribe);
    wait_for_state(engine, TrackingState::ActiveForegroundBound).await;
}

fn file_engine(dir: &TempDir, settings: Settings) -> TestEngine {
    let mut engine = Engine::new(
        settings,
        PreferenceStore::open(TomlPreferenceFile::in_data_dir(dir.path())),
        Arc::new(RecordingLocationSource::new()),
        Arc::new(RecordingNotificationPresenter::new()),
    );
    engine.drain_pending_messages();
    engine
}

// ─────────────────────────────────────────────────────────
// Foreground / background promotion
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_promotion_notification_lifecycle() {
    let (mut engine, location, presenter) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;
    assert!(presenter.calls().is_empty());

    engine.process_message(Message::ConsumerDetached);
    assert_eq!(engine.state.tracking, TrackingState::ActiveBackgroundPromoted);
    let calls = presenter_calls(&presenter, 1).await;
    assert!(matches!(&calls[0], PresenterCall::Show(_)));
    assert_eq!(calls[0].text(), Some("no fix yet"));

    location.push_fix(10.0, 20.0).await.unwrap();
    assert!(process_until(&mut engine, WAIT, |s| s.fix_count == 1).await);
    let calls = presenter_calls(&presenter, 2).await;
    assert!(matches!(&calls[1], PresenterCall::Update(_)));
    assert_eq!(calls[1].text(), Some("(10, 20)"));

    engine.process_message(Message::ConsumerAttached);
    assert_eq!(engine.state.tracking, TrackingState::ActiveForegroundBound);
    let calls = presenter_calls(&presenter, 3).await;
    assert_eq!(calls[2], PresenterCall::Cancel(DEFAULT_NOTIFICATION_ID));
    assert_eq!(calls.len(), 3);
}

#[tokio::test]
async fn test_fixes_reach_attached_consumer_only() {
    let (mut engine, location, presenter) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;
    let mut events = engine.subscribe();

    location.push_fix(1.0, 2.0).await.unwrap();
    assert!(process_until(&mut engine, WAIT, |s| s.fix_count == 1).await);
    assert!(matches!(
        events.try_recv(),
        Ok(EngineEvent::LocationFix { fix }) if fix.latitude == 1.0
    ));

    engine.process_message(Message::ConsumerDetached);
    while events.try_recv().is_ok() {}

    location.push_fix(3.0, 4.0).await.unwrap();
    assert!(process_until(&mut engine, WAIT, |s| s.fix_count == 2).await);
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, EngineEvent::LocationFix { .. }),
            "fix leaked to a detached consumer"
        );
    }
    // The notification carries it instead
    let calls = presenter_calls(&presenter, 2).await;
    assert_eq!(calls[1].text(), Some("(3, 4)"));
}

#[tokio::test]
async fn test_stop_from_notification_releases_subscription() {
    let (mut engine, location, presenter) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;
    engine.process_message(Message::ConsumerDetached);
    presenter_calls(&presenter, 1).await;

    engine.process_message(Message::NotificationActionInvoked(
        NotificationAction::StopTracking,
    ));
    wait_for_state(&mut engine, TrackingState::Idle).await;

    assert_eq!(location.active_subscriptions(), 0);
    assert!(!engine.state.preferences.is_tracking_enabled());
    let calls = presenter_calls(&presenter, 2).await;
    assert_eq!(calls[1], PresenterCall::Cancel(DEFAULT_NOTIFICATION_ID));
}

#[tokio::test]
async fn test_open_app_action_is_forwarded() {
    let (mut engine, _, _) = test_engine(Settings::default());
    let mut events = engine.subscribe();

    engine.process_message(Message::NotificationActionInvoked(NotificationAction::OpenApp));

    assert_eq!(events.try_recv().unwrap(), EngineEvent::OpenAppRequested);
}

// ─────────────────────────────────────────────────────────
// Configuration changes
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_configuration_change_does_not_promote() {
    let (mut engine, _, presenter) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;

    engine.process_message(Message::ConfigurationChanged);
    engine.process_message(Message::ConsumerDetached);
    assert_eq!(engine.state.tracking, TrackingState::ActiveForegroundBound);

    engine.process_message(Message::ConsumerAttached);
    assert_eq!(engine.state.tracking, TrackingState::ActiveForegroundBound);
    assert!(!engine.state.visibility.in_config_change());

    tokio::task::yield_now().await;
    assert!(presenter.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_configuration_change_grace_expiry_promotes() {
    let mut settings = Settings::default();
    settings.behavior.config_change_grace_ms = 200;
    let (mut engine, _, presenter) = test_engine(settings);
    start_in_foreground(&mut engine).await;

    engine.process_message(Message::ConfigurationChanged);
    engine.process_message(Message::ConsumerDetached);
    assert_eq!(engine.state.tracking, TrackingState::ActiveForegroundBound);

    wait_for_state(&mut engine, TrackingState::ActiveBackgroundPromoted).await;
    let calls = presenter_calls(&presenter, 1).await;
    assert!(matches!(&calls[0], PresenterCall::Show(_)));
}

#[tokio::test(start_paused = true)]
async fn test_reattach_within_grace_cancels_expiry() {
    let mut settings = Settings::default();
    settings.behavior.config_change_grace_ms = 200;
    let (mut engine, _, presenter) = test_engine(settings);
    start_in_foreground(&mut engine).await;

    engine.process_message(Message::ConfigurationChanged);
    engine.process_message(Message::ConsumerDetached);
    engine.process_message(Message::ConsumerAttached);

    // Let the stale expiry fire and get processed
    tokio::time::sleep(Duration::from_millis(300)).await;
    engine.drain_pending_messages();

    assert_eq!(engine.state.tracking, TrackingState::ActiveForegroundBound);
    assert!(presenter.calls().is_empty());
}

// ─────────────────────────────────────────────────────────
// Failures
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_permission_denied_leaves_idle() {
    let (mut engine, location, _) = test_engine(Settings::default());
    location.deny_permission(true);
    let mut events = engine.subscribe();

    engine.process_message(Message::ConsumerAttached);
    engine.process_message(Message::Subscribe);
    assert!(process_until(&mut engine, WAIT, |s| s.failure_count == 1).await);

    assert_eq!(engine.state.tracking, TrackingState::Idle);
    assert!(engine.state.pending.is_none());
    assert!(!engine.state.preferences.is_tracking_enabled());

    let mut denied = false;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::SubscribeFailed {
            permission_denied, ..
        } = event
        {
            denied = permission_denied;
        }
    }
    assert!(denied);

    // The user grants the permission and tries again
    location.deny_permission(false);
    engine.process_message(Message::Subscribe);
    wait_for_state(&mut engine, TrackingState::ActiveForegroundBound).await;
}

#[tokio::test]
async fn test_quick_start_stop_leaks_nothing() {
    let (mut engine, location, _) = test_engine(Settings::default());
    location.hold_subscribe(true);
    engine.process_message(Message::ConsumerAttached);

    engine.process_message(Message::Subscribe);
    engine.process_message(Message::Unsubscribe);
    assert!(engine.state.pending.is_some());

    location.release_subscribe();
    assert!(
        process_until(&mut engine, WAIT, |s| s.pending.is_none()
            && s.subscription.is_none())
        .await
    );

    assert_eq!(location.granted(), 1);
    assert_eq!(location.unsubscribed(), 1);
    assert_eq!(location.active_subscriptions(), 0);
    assert_eq!(engine.state.tracking, TrackingState::Idle);
    assert!(!engine.state.preferences.is_tracking_enabled());
}

#[tokio::test]
async fn test_unsubscribe_failure_keeps_tracking_until_retry() {
    let (mut engine, location, _) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;
    location.fail_unsubscribe(true);

    engine.process_message(Message::Unsubscribe);
    assert!(process_until(&mut engine, WAIT, |s| s.failure_count == 1).await);

    assert_eq!(engine.state.tracking, TrackingState::ActiveForegroundBound);
    assert!(engine.state.preferences.is_tracking_enabled());
    assert_eq!(location.active_subscriptions(), 1);

    location.fail_unsubscribe(false);
    engine.process_message(Message::Unsubscribe);
    wait_for_state(&mut engine, TrackingState::Idle).await;
    assert_eq!(location.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_unsubscribe_failure_after_consumer_left_promotes() {
    let (mut engine, location, presenter) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;
    location.hold_unsubscribe(true);
    location.fail_unsubscribe(true);

    engine.process_message(Message::Unsubscribe);
    engine.process_message(Message::ConsumerDetached);
    assert_eq!(engine.state.tracking, TrackingState::ActiveForegroundBound);

    location.release_unsubscribe();
    assert!(process_until(&mut engine, WAIT, |s| s.failure_count == 1).await);

    assert_eq!(engine.state.tracking, TrackingState::ActiveBackgroundPromoted);
    assert!(engine.state.preferences.is_tracking_enabled());
    let calls = presenter_calls(&presenter, 1).await;
    assert!(matches!(&calls[0], PresenterCall::Show(_)));
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_timeout_is_a_failure() {
    let mut settings = Settings::default();
    settings.behavior.unsubscribe_timeout_ms = 50;
    let (mut engine, location, _) = test_engine(settings);
    start_in_foreground(&mut engine).await;
    let mut events = engine.subscribe();
    location.hold_unsubscribe(true);

    engine.process_message(Message::Unsubscribe);
    assert!(process_until(&mut engine, WAIT, |s| s.failure_count == 1).await);

    assert!(engine.state.tracking.is_active());
    assert!(engine.state.pending.is_none());
    let mut saw_timeout = false;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::UnsubscribeFailed { reason } = event {
            saw_timeout = reason.contains("50");
        }
    }
    assert!(saw_timeout);
}

#[tokio::test]
async fn test_notification_failure_then_fresh_show() {
    let (mut engine, location, presenter) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;
    presenter.set_failing(true);

    engine.process_message(Message::ConsumerDetached);
    assert!(process_until(&mut engine, WAIT, |s| s.failure_count == 1).await);
    assert!(!engine.state.notification_visible);
    assert_eq!(engine.state.tracking, TrackingState::ActiveBackgroundPromoted);

    presenter.set_failing(false);
    location.push_fix(10.0, 20.0).await.unwrap();
    assert!(process_until(&mut engine, WAIT, |s| s.fix_count == 1).await);

    let calls = presenter_calls(&presenter, 2).await;
    assert!(matches!(&calls[1], PresenterCall::Show(_)));
    assert_eq!(calls[1].text(), Some("(10, 20)"));
}

#[tokio::test]
async fn test_failed_update_is_cancelled_when_consumer_returns() {
    let (mut engine, location, presenter) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;
    engine.process_message(Message::ConsumerDetached);
    presenter_calls(&presenter, 1).await;

    presenter.set_failing(true);
    location.push_fix(10.0, 20.0).await.unwrap();
    assert!(process_until(&mut engine, WAIT, |s| s.failure_count == 1).await);
    assert!(engine.state.notification_visible);

    presenter.set_failing(false);
    engine.process_message(Message::ConsumerAttached);
    let calls = presenter_calls(&presenter, 3).await;
    assert!(matches!(&calls[1], PresenterCall::Update(_)));
    assert_eq!(calls[2], PresenterCall::Cancel(DEFAULT_NOTIFICATION_ID));
}

// ─────────────────────────────────────────────────────────
// Shutdown
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_quit_unsubscribes_before_exit() {
    let (mut engine, location, _) = test_engine(Settings::default());
    start_in_foreground(&mut engine).await;

    engine.process_message(Message::Quit);
    assert!(!engine.should_quit());

    tokio::time::timeout(WAIT, engine.run())
        .await
        .expect("engine did not stop");
    assert!(engine.should_quit());
    assert_eq!(location.active_subscriptions(), 0);
    assert_eq!(engine.state.tracking, TrackingState::Idle);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_quit_without_stop_on_shutdown_keeps_subscription() {
    let mut settings = Settings::default();
    settings.behavior.stop_on_shutdown = false;
    let (mut engine, location, _) = test_engine(settings);
    start_in_foreground(&mut engine).await;

    engine.process_message(Message::Quit);

    assert!(engine.should_quit());
    assert_eq!(location.active_subscriptions(), 1);
    assert!(engine.state.preferences.is_tracking_enabled());
}

// ─────────────────────────────────────────────────────────
// Preference persistence
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_preference_file_follows_tracking() {
    let dir = TempDir::new().unwrap();
    let mut engine = file_engine(&dir, Settings::default());
    let file = TomlPreferenceFile::in_data_dir(dir.path());

    engine.process_message(Message::Subscribe);
    assert_eq!(file.load().unwrap(), Some(true));

    wait_for_state(&mut engine, TrackingState::ActiveBackgroundPromoted).await;
    engine.process_message(Message::Unsubscribe);
    wait_for_state(&mut engine, TrackingState::Idle).await;
    assert_eq!(file.load().unwrap(), Some(false));
}

#[tokio::test]
async fn test_stale_preference_cleared_at_startup() {
    let preferences = Arc::new(MemoryPreferences::with_value(true));
    let (engine, location, _) = test_engine_with_preferences(Settings::default(), preferences);

    assert!(!engine.state.preferences.is_tracking_enabled());
    assert_eq!(engine.state.tracking, TrackingState::Idle);
    assert_eq!(location.subscribe_calls(), 0);
}

#[tokio::test]
async fn test_resume_on_start_resubscribes() {
    let mut settings = Settings::default();
    settings.behavior.resume_on_start = true;
    let preferences = Arc::new(MemoryPreferences::with_value(true));
    let (mut engine, location, _) = test_engine_with_preferences(settings, preferences);

    wait_for_state(&mut engine, TrackingState::ActiveBackgroundPromoted).await;
    assert_eq!(location.granted(), 1);
    assert!(engine.state.preferences.is_tracking_enabled());
}
