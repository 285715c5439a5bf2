//! Live session bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use pime_service::{ServiceRegistry, SessionId};

use crate::session::Session;

/// Sessions keyed by the identifier assigned on accept.
#[derive(Debug, Default)]
pub(crate) struct SessionTable {
    sessions: HashMap<SessionId, Session>,
    last_id: u64,
}

impl SessionTable {
    /// Registers a new idle session and returns its identifier.
    pub(crate) fn open(&mut self, registry: Arc<dyn ServiceRegistry>) -> SessionId {
        self.last_id += 1;
        let id = SessionId::new(self.last_id);
        self.sessions.insert(id, Session::new(id, registry));
        id
    }

    pub(crate) fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }
}
