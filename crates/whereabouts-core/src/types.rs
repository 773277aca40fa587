//! Domain types shared by the coordinator, its collaborators and hosts

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Tracking State
// ─────────────────────────────────────────────────────────────────────────────

/// Coordinator tracking state.
///
/// The location source is subscribed exactly when the state is not `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// Not tracking; no subscription held
    #[default]
    Idle,
    /// Tracking while a foreground consumer receives fixes directly
    ActiveForegroundBound,
    /// Tracking with no consumer attached; the persistent notification is up
    ActiveBackgroundPromoted,
}

impl TrackingState {
    pub fn is_active(&self) -> bool {
        !matches!(self, TrackingState::Idle)
    }

    pub fn is_promoted(&self) -> bool {
        matches!(self, TrackingState::ActiveBackgroundPromoted)
    }

    /// Short label for logs and headless output
    pub fn label(&self) -> &'static str {
        match self {
            TrackingState::Idle => "idle",
            TrackingState::ActiveForegroundBound => "active_foreground_bound",
            TrackingState::ActiveBackgroundPromoted => "active_background_promoted",
        }
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Location Fix
// ─────────────────────────────────────────────────────────────────────────────

/// A single location fix. Only the latest one is ever retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::at(latitude, longitude, Utc::now())
    }

    pub fn at(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Build a fix after range-checking the coordinates.
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self::new(latitude, longitude))
    }

    /// Human readable `(lat, lon)` text used in notifications and consumer output.
    pub fn to_text(&self) -> String {
        format!("({}, {})", self.latitude, self.longitude)
    }
}

impl fmt::Display for LocationFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Visibility / Preference
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a foreground consumer is attached, and whether the host is in the
/// middle of a configuration change (rotation and the like) during which a
/// detach must not be read as "the user left".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibilityFlag {
    pub attached: bool,
    pub in_config_change: bool,
}

/// Durable "is tracking enabled" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackingPreference {
    pub enabled: bool,
}

impl TrackingPreference {
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Location Policy
// ─────────────────────────────────────────────────────────────────────────────

/// Requested accuracy/power trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPriority {
    #[default]
    HighAccuracy,
    BalancedPowerAccuracy,
    LowPower,
    NoPower,
}

impl fmt::Display for LocationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationPriority::HighAccuracy => write!(f, "high_accuracy"),
            LocationPriority::BalancedPowerAccuracy => write!(f, "balanced_power_accuracy"),
            LocationPriority::LowPower => write!(f, "low_power"),
            LocationPriority::NoPower => write!(f, "no_power"),
        }
    }
}

/// How often, and how precisely, the location source should deliver fixes.
///
/// `interval` is a hint; `fastest_interval` is a hard floor between two
/// deliveries; `max_wait` bounds how long fixes may be batched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationPolicy {
    pub interval: Duration,
    pub fastest_interval: Duration,
    pub max_wait: Duration,
    pub priority: LocationPriority,
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            fastest_interval: Duration::from_secs(30),
            max_wait: Duration::from_secs(120),
            priority: LocationPriority::HighAccuracy,
        }
    }
}

impl LocationPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::invalid_policy("interval must be greater than zero"));
        }
        if self.fastest_interval.is_zero() {
            return Err(Error::invalid_policy(
                "fastest interval must be greater than zero",
            ));
        }
        if self.fastest_interval > self.interval {
            return Err(Error::invalid_policy(format!(
                "fastest interval ({:?}) exceeds interval ({:?})",
                self.fastest_interval, self.interval
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscription Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque identifier for a live location subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionHandle(pub u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
