//! The capability every input service implements.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::message::{Message, ReplyFields};

/// Identifier the daemon assigns to each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Host environment flags reported by the `init` request.
///
/// The daemon records these verbatim; only services interpret them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct HostEnvironment {
    /// Host runs on Windows 8 or later.
    #[serde(rename = "isWindows8Above", default)]
    pub windows8_above: bool,
    /// Host is a Metro (immersive) application.
    #[serde(rename = "isMetroApp", default)]
    pub metro_app: bool,
    /// Host renders no input-method UI of its own.
    #[serde(rename = "isUiLess", default)]
    pub ui_less: bool,
    /// Host is a console window.
    #[serde(rename = "isConsole", default)]
    pub console: bool,
}

/// Session facts handed to a service when it is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    /// Session that owns the service.
    pub session_id: SessionId,
    /// Flags from the most recent `init`, if the host sent one.
    pub host: Option<HostEnvironment>,
}

/// Result of a service handling one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceOutcome {
    /// Whether the request succeeded.
    pub success: bool,
    /// Value reported to the host under the reply's `return` key.
    pub return_value: Option<Value>,
}

impl ServiceOutcome {
    /// Success without a return value.
    #[must_use]
    pub const fn succeeded() -> Self {
        Self {
            success: true,
            return_value: None,
        }
    }

    /// Success carrying a return value.
    #[must_use]
    pub fn returning(value: impl Into<Value>) -> Self {
        Self {
            success: true,
            return_value: Some(value.into()),
        }
    }

    /// Failure; the daemon forwards it to the host unchanged.
    #[must_use]
    pub const fn failed() -> Self {
        Self {
            success: false,
            return_value: None,
        }
    }
}

/// A stateful input-method engine owned by exactly one session.
///
/// The daemon drives each instance through `activate`, any number of
/// `handle` calls, then `deactivate`. Calls never overlap: every request is
/// handled while the daemon's global lock is held, so implementations need no
/// internal locking.
pub trait Service: Send {
    /// Called once after creation when the host activates the profile.
    fn activate(&mut self, context: &SessionContext);

    /// Called once before the instance is discarded.
    fn deactivate(&mut self);

    /// Handles any request the daemon does not handle itself.
    fn handle(&mut self, method: &str, message: &Message) -> ServiceOutcome;

    /// Returns and clears the reply fields queued since the last drain.
    fn drain_reply_fields(&mut self) -> ReplyFields;
}
