//! Error types for green-dot.
//!
//! Cursor failures have their own enum so the bridge can carry them across
//! the process boundary unchanged. Everything else folds into `GreenDotError`.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Failure reported by a cursor service.
///
/// Serializable so the bridge helper can hand it back to the caller intact.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorError {
    /// The automation capability cannot be reached (no display, dead bridge).
    #[error("cursor device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The platform refused input automation.
    #[error("cursor access denied: {0}")]
    PermissionDenied(String),

    /// The requested target lies outside the main display.
    #[error("target ({x}, {y}) is outside the {width}x{height} display")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
}

impl CursorError {
    pub fn device_unavailable(message: impl Into<String>) -> Self {
        Self::DeviceUnavailable(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }
}

/// Main error type for green-dot operations.
#[derive(Error, Debug)]
pub enum GreenDotError {
    /// The cursor service failed; the toggle did not change state.
    #[error("cursor service failure: {0}")]
    Cursor(#[from] CursorError),

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Error registering or parsing the toggle hotkey.
    #[error("hotkey error: {0}")]
    Hotkey(String),

    /// The bridge helper could not be started or spoke nonsense.
    #[error("bridge error: {0}")]
    Bridge(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for green-dot operations.
pub type Result<T> = std::result::Result<T, GreenDotError>;

impl GreenDotError {
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey(message.into())
    }

    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge(message.into())
    }

    /// The cursor failure behind this error, if any.
    pub fn as_cursor(&self) -> Option<&CursorError> {
        match self {
            Self::Cursor(err) => Some(err),
            _ => None,
        }
    }
}
