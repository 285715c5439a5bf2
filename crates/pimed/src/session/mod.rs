//! Per-connection session state and request dispatch.
//!
//! A [`Session`] owns at most one active input service. Lifecycle requests
//! ([`LifecycleMethod`]) are handled by the session itself; every other
//! method is forwarded verbatim to the active service. Reply fields queued
//! while handling a request (by the session's own lifecycle steps or by the
//! service) accumulate in the session and are drained into the [`Reply`].
//!
//! ```text
//!            onLangProfileActivated(guid)
//!   Idle ───────────────────────────────▶ Active ──┐
//!    ▲                                      │      │ onLangProfileActivated(guid)
//!    └──────────── onDeactivate ────────────┘ ◀────┘ (deactivate, then activate)
//! ```

mod lifecycle;
mod reply;

use std::mem;
use std::sync::Arc;

use pime_service::{
    HostEnvironment, MalformedMessage, Message, ReplyFields, Service, ServiceRegistry,
    SessionContext, SessionId,
};
use serde_json::Value;
use tracing::{debug, info, warn};

pub use self::lifecycle::LifecycleMethod;
pub use self::reply::Reply;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Request key naming the language profile.
pub const GUID_KEY: &str = "guid";

/// Server-side state for one host connection.
pub struct Session {
    id: SessionId,
    registry: Arc<dyn ServiceRegistry>,
    service: Option<Box<dyn Service>>,
    host: Option<HostEnvironment>,
    pending: ReplyFields,
}

impl Session {
    /// Creates an idle session that resolves profiles through `registry`.
    #[must_use]
    pub fn new(id: SessionId, registry: Arc<dyn ServiceRegistry>) -> Self {
        Self {
            id,
            registry,
            service: None,
            host: None,
            pending: ReplyFields::new(),
        }
    }

    /// Identifier assigned when the connection was accepted.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Whether an input service is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.service.is_some()
    }

    /// Host flags recorded by the last `init`.
    #[must_use]
    pub const fn host(&self) -> Option<HostEnvironment> {
        self.host
    }

    /// Handles one request and builds its reply.
    ///
    /// The reply always echoes the request's `seqNum`, and the field
    /// accumulator is empty again once this returns.
    pub fn handle(&mut self, message: &Message) -> Reply {
        let (success, return_value) = match LifecycleMethod::parse(message.method()) {
            Some(method) => (self.handle_lifecycle(method, message), None),
            None => self.delegate(message),
        };
        let fields = mem::take(&mut self.pending);
        Reply::new(success, message.seq_num())
            .with_return(return_value)
            .with_fields(fields)
    }

    /// Answers a request that could not be decoded.
    ///
    /// Session state is left untouched.
    pub fn handle_malformed(&self, error: &MalformedMessage) -> Reply {
        warn!(
            target: SESSION_TARGET,
            session = %self.id,
            seq_num = error.seq_num,
            error = %error.source,
            "malformed request"
        );
        Reply::failure(error.seq_num)
    }

    /// Tears the session down, deactivating the active service.
    ///
    /// Fields queued by the final deactivation are discarded since no reply
    /// follows.
    pub fn close(&mut self) {
        self.deactivate_service();
        self.pending.clear();
        debug!(target: SESSION_TARGET, session = %self.id, "session closed");
    }

    fn handle_lifecycle(&mut self, method: LifecycleMethod, message: &Message) -> bool {
        let profile = message.str_field(GUID_KEY);
        if method.requires_profile() && profile.is_none() {
            warn!(
                target: SESSION_TARGET,
                session = %self.id,
                method = %method,
                "lifecycle request without a profile guid"
            );
            return false;
        }

        match (method, profile) {
            (LifecycleMethod::Init, _) => self.record_host(message),
            (LifecycleMethod::Deactivate, _) => {
                self.deactivate_service();
                true
            }
            (LifecycleMethod::LangProfileActivated, Some(profile_id)) => {
                self.deactivate_service();
                self.activate_profile(profile_id);
                true
            }
            (LifecycleMethod::LangProfileDeactivated, Some(profile_id)) => {
                debug!(
                    target: SESSION_TARGET,
                    session = %self.id,
                    profile = profile_id,
                    "language profile deactivated"
                );
                true
            }
            _ => true,
        }
    }

    fn record_host(&mut self, message: &Message) -> bool {
        match message.deserialize_fields::<HostEnvironment>() {
            Ok(host) => {
                debug!(
                    target: SESSION_TARGET,
                    session = %self.id,
                    windows8_above = host.windows8_above,
                    metro_app = host.metro_app,
                    ui_less = host.ui_less,
                    console = host.console,
                    "host environment recorded"
                );
                self.host = Some(host);
                true
            }
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    session = %self.id,
                    error = %error,
                    "invalid host environment flags"
                );
                false
            }
        }
    }

    fn activate_profile(&mut self, profile_id: &str) {
        let Some(factory) = self.registry.resolve(profile_id) else {
            warn!(
                target: SESSION_TARGET,
                session = %self.id,
                profile = profile_id,
                "no input service registered for profile"
            );
            return;
        };
        let mut service = factory.create();
        service.activate(&SessionContext {
            session_id: self.id,
            host: self.host,
        });
        self.pending.extend(service.drain_reply_fields());
        self.service = Some(service);
        info!(
            target: SESSION_TARGET,
            session = %self.id,
            profile = profile_id,
            "input service activated"
        );
    }

    fn deactivate_service(&mut self) {
        if let Some(mut service) = self.service.take() {
            service.deactivate();
            self.pending.extend(service.drain_reply_fields());
            info!(target: SESSION_TARGET, session = %self.id, "input service deactivated");
        }
    }

    fn delegate(&mut self, message: &Message) -> (bool, Option<Value>) {
        let Some(service) = self.service.as_mut() else {
            debug!(
                target: SESSION_TARGET,
                session = %self.id,
                method = message.method(),
                "no active input service"
            );
            return (false, None);
        };
        let outcome = service.handle(message.method(), message);
        if outcome.success {
            self.pending.extend(service.drain_reply_fields());
        }
        (outcome.success, outcome.return_value)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}
