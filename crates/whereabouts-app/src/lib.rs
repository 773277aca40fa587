//! whereabouts-app - Tracking coordinator state and orchestration
//!
//! This crate implements the TEA (The Elm Architecture) pattern for the
//! tracking coordinator, the Engine that drives it from a single message
//! queue, configuration loading, the durable tracking preference, visibility
//! tracking, and the location/notification collaborator traits.

pub mod actions;
pub mod config;
pub mod engine;
pub mod engine_event;
pub mod handler;
pub mod message;
pub mod notifier;
pub mod preferences;
pub mod process;
pub mod services;
pub mod signals;
pub mod state;
pub mod visibility;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Re-export primary types
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use handler::{UpdateAction, UpdateResult};
pub use message::{Message, NotificationCall};
pub use preferences::{PreferenceStore, TRACKING_PREFERENCE_KEY};
pub use state::{CoordinatorState, StatusSnapshot};
pub use visibility::VisibilityTracker;
