//! Location source boundary and the bundled simulator
//!
//! A location source grants subscriptions under a [`LocationPolicy`] and
//! pushes fixes into the [`FixSink`] it was given until unsubscribed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use whereabouts_core::prelude::*;
use whereabouts_core::{LocationFix, LocationPolicy, SubscriptionHandle};

use crate::config::{SimulatedPermission, SimulatorSettings};
use crate::message::Message;

/// Platform location API
///
/// Both operations may take a while; the engine runs them on spawned tasks
/// and reports the outcome back as a message.
#[trait_variant::make(LocationSource: Send)]
pub trait LocalLocationSource {
    /// Start delivering fixes to `sink`.
    ///
    /// Fails with [`Error::PermissionDenied`] when the platform refuses.
    async fn subscribe(
        &self,
        policy: LocationPolicy,
        sink: FixSink,
    ) -> Result<SubscriptionHandle>;

    /// Stop delivering fixes for `handle`.
    ///
    /// Fixes already in flight may still arrive after this returns.
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()>;
}

/// Where a location source delivers fixes.
///
/// Wraps the coordinator's message queue, so fixes are applied on the
/// coordinator's own loop no matter which task produced them.
#[derive(Debug, Clone)]
pub struct FixSink {
    tx: mpsc::Sender<Message>,
}

impl FixSink {
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }

    /// Queue a fix, waiting for room in the queue
    pub async fn deliver(&self, fix: LocationFix) -> Result<()> {
        self.tx
            .send(Message::LocationFix(fix))
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// True once the coordinator is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated source
// ─────────────────────────────────────────────────────────────────────────────

/// Location source that random-walks from a start point.
///
/// Each subscription runs its own ticker task. Permission and unsubscribe
/// behavior come from the `[simulator]` settings.
#[derive(Debug)]
pub struct SimulatedLocationSource {
    settings: SimulatorSettings,
    next_handle: AtomicU64,
    subscriptions: Mutex<HashMap<SubscriptionHandle, JoinHandle<()>>>,
}

impl SimulatedLocationSource {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self {
            settings,
            next_handle: AtomicU64::new(1),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn period(&self, policy: &LocationPolicy) -> Duration {
        if self.settings.tick_ms > 0 {
            Duration::from_millis(self.settings.tick_ms)
        } else {
            policy.interval
        }
    }
}

impl LocationSource for SimulatedLocationSource {
    async fn subscribe(
        &self,
        policy: LocationPolicy,
        sink: FixSink,
    ) -> Result<SubscriptionHandle> {
        if self.settings.permission == SimulatedPermission::Denied {
            return Err(Error::permission_denied(
                "location permission has not been granted",
            ));
        }
        policy.validate()?;

        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let period = self.period(&policy);
        let walk = Walk {
            latitude: self.settings.start_latitude,
            longitude: self.settings.start_longitude,
            step: self.settings.step_degrees,
        };
        let task = tokio::spawn(run_walk(walk, period, sink));

        self.subscriptions
            .lock()
            .map_err(|_| Error::platform("subscription table poisoned"))?
            .insert(handle, task);

        info!(
            "Simulated subscription {} every {:?} ({})",
            handle, period, policy.priority
        );
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        if self.settings.unsubscribe_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.unsubscribe_delay_ms)).await;
        }

        if self.settings.fail_unsubscribe {
            return Err(Error::platform("simulated unsubscribe failure"));
        }

        let task = self
            .subscriptions
            .lock()
            .map_err(|_| Error::platform("subscription table poisoned"))?
            .remove(&handle)
            .ok_or_else(|| Error::platform(format!("unknown subscription {}", handle)))?;
        task.abort();

        info!("Simulated subscription {} removed", handle);
        Ok(())
    }
}

impl Drop for SimulatedLocationSource {
    fn drop(&mut self) {
        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            for (_, task) in subscriptions.drain() {
                task.abort();
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Walk {
    latitude: f64,
    longitude: f64,
    step: f64,
}

impl Walk {
    fn advance(&mut self) -> LocationFix {
        self.latitude = (self.latitude + jitter(self.step)).clamp(-90.0, 90.0);
        self.longitude += jitter(self.step);
        if self.longitude > 180.0 {
            self.longitude -= 360.0;
        } else if self.longitude < -180.0 {
            self.longitude += 360.0;
        }
        LocationFix::new(self.latitude, self.longitude)
    }
}

fn jitter(step: f64) -> f64 {
    (rand::random::<f64>() * 2.0 - 1.0) * step
}

async fn run_walk(mut walk: Walk, period: Duration, sink: FixSink) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if sink.is_closed() {
            break;
        }
        if let Err(e) = sink.deliver(walk.advance()).await {
            debug!("Stopping simulated walk: {}", e);
            break;
        }
    }
}
