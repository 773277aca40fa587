//! Whereabouts Library
//!
//! Host side of the tracking coordinator: the headless runner that drives
//! the engine from stdin commands and prints its events as NDJSON.

pub mod headless;

// Re-export main entry point
pub use headless::runner::run_headless;
