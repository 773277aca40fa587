//! Configuration file parsing for Whereabouts
//!
//! Supports:
//! - `<data_dir>/config.toml` - Global settings
//!
//! The tracking preference lives next to it in `preferences.toml`; see
//! [`crate::preferences`].

pub mod settings;
pub mod types;

pub use settings::{config_path, default_data_dir, init_data_dir, load_settings, save_settings};
pub use types::*;
