//! # whereabouts-core - Core Domain Types
//!
//! Foundation crate for Whereabouts. Provides the tracking domain types,
//! notification content, error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, toml, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`TrackingState`] - Idle / foreground-bound / background-promoted
//! - [`LocationFix`] - A single latitude/longitude fix (last-fix-wins)
//! - [`VisibilityFlag`] - Consumer attachment and configuration-change flags
//! - [`TrackingPreference`] - The durable "tracking enabled" flag
//! - [`LocationPolicy`], [`LocationPriority`] - Subscription interval/priority
//! - [`SubscriptionHandle`] - Identifies a live platform subscription
//!
//! ### Notification (`notification`)
//! - [`Notification`] - Rendered content of the persistent notification
//! - [`NotificationTemplate`] - Configured id/channel/title/labels
//! - [`NotificationAction`] - Open app / stop tracking
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use whereabouts_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod notification;
pub mod prelude;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use notification::{
    Notification, NotificationAction, NotificationButton, NotificationTemplate,
    DEFAULT_CHANNEL_ID, DEFAULT_NOTIFICATION_ID, DEFAULT_PLACEHOLDER_TEXT,
};
pub use types::{
    LocationFix, LocationPolicy, LocationPriority, SubscriptionHandle, TrackingPreference,
    TrackingState, VisibilityFlag,
};
