//! Collaborator boundaries for the coordinator
//!
//! The coordinator never talks to a platform directly. It issues
//! [`UpdateAction`](crate::handler::UpdateAction)s that the engine carries out
//! through these traits, and results come back as messages.
//!
//! ```text
//! ┌──────────────────┐  subscribe/unsubscribe  ┌────────────────┐
//! │      Engine      │────────────────────────▶│ LocationSource │
//! │ (message queue)  │◀──── FixSink ───────────│                │
//! └────────┬─────────┘                         └────────────────┘
//!          │ show/update/cancel
//!   ┌──────▼────────────────┐
//!   │ NotificationPresenter │
//!   └───────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`LocationSource`]: subscribe/unsubscribe under a [`LocationPolicy`](whereabouts_core::LocationPolicy)
//! - [`FixSink`]: marshals fixes onto the coordinator's queue
//! - [`NotificationPresenter`]: the single persistent notification
//! - [`SimulatedLocationSource`], [`LogNotificationPresenter`]: bundled
//!   implementations used by the headless runner

mod location_source;
mod notification_presenter;

pub use location_source::{
    FixSink, LocalLocationSource, LocationSource, SimulatedLocationSource,
};

pub use notification_presenter::{
    LocalNotificationPresenter, LogNotificationPresenter, NotificationPresenter,
};
