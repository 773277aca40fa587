//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Location Platform Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Location permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Location platform error: {message}")]
    Platform { message: String },

    #[error("Unsubscribe did not complete within {timeout_ms}ms")]
    UnsubscribeTimeout { timeout_ms: u64 },

    #[error("Invalid location policy: {message}")]
    InvalidPolicy { message: String },

    // ─────────────────────────────────────────────────────────────
    // Notification Surface Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Notification error: {message}")]
    Notification { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration / Preference Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Preference store error: {message}")]
    Preference { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            message: message.into(),
        }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn preference(message: impl Into<String>) -> Self {
        Self::Preference {
            message: message.into(),
        }
    }

    /// True when the location platform refused access. This is the one
    /// failure the user has to act on (grant the permission, then retry).
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied { .. })
    }

    /// Transient platform-side failures the user can simply retry.
    /// Anything else points at a local problem (bad policy, broken disk).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PermissionDenied { .. }
                | Error::Platform { .. }
                | Error::UnsubscribeTimeout { .. }
                | Error::Notification { .. }
                | Error::Preference { .. }
        )
    }
}

// Results travel through the message queue, which requires `Clone`.
// Wrapped foreign errors are flattened into their display text.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
            Error::Json(e) => Error::config(e.to_string()),
            Error::TomlDe(e) => Error::config(e.to_string()),
            Error::TomlSer(e) => Error::config(e.to_string()),
            Error::PermissionDenied { reason } => Error::permission_denied(reason.clone()),
            Error::Platform { message } => Error::platform(message.clone()),
            Error::UnsubscribeTimeout { timeout_ms } => Error::UnsubscribeTimeout {
                timeout_ms: *timeout_ms,
            },
            Error::InvalidPolicy { message } => Error::invalid_policy(message.clone()),
            Error::Notification { message } => Error::notification(message.clone()),
            Error::Config { message } => Error::config(message.clone()),
            Error::Preference { message } => Error::preference(message.clone()),
            Error::ChannelClosed => Error::ChannelClosed,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
