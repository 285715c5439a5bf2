//! Connection serving and the global request lock.
//!
//! Every accepted connection gets its own [`Session`](crate::session::Session)
//! in a shared table and is served on its own worker thread. Reading and
//! writing happen concurrently across connections, but every call into a
//! session's request handling runs while holding the one table lock, so
//! request handling is totally ordered across the whole daemon.

mod table;

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use pime_service::{Message, ServiceRegistry, SessionId};
use tracing::{debug, info, trace, warn};

use crate::framer::{FrameError, Framer};
use crate::session::Reply;
use crate::transport::{
    ConnectionHandler, ConnectionJob, ConnectionStream, StreamTransport, Transport,
};

use self::table::SessionTable;

pub(crate) const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Serves host connections against a shared session table.
#[derive(Clone)]
pub struct Server {
    table: Arc<Mutex<SessionTable>>,
    registry: Arc<dyn ServiceRegistry>,
    max_message_bytes: usize,
}

impl Server {
    /// Creates a server resolving profiles through `registry` and rejecting
    /// messages longer than `max_message_bytes`.
    #[must_use]
    pub fn new(registry: Arc<dyn ServiceRegistry>, max_message_bytes: usize) -> Self {
        Self {
            table: Arc::new(Mutex::new(SessionTable::default())),
            registry,
            max_message_bytes,
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Registers a session and serves `transport` on the calling thread.
    pub(crate) fn serve<T: Transport>(&self, transport: T) {
        self.serve_session(&SessionGuard::open(self), transport);
    }

    /// Runs the read, dispatch, write loop for an already registered session
    /// until the transport breaks.
    fn serve_session<T: Transport>(&self, session: &SessionGuard, transport: T) {
        let mut framer = Framer::new(transport, self.max_message_bytes);
        loop {
            let frame = match framer.read_message() {
                Ok(frame) => frame,
                Err(error) => {
                    log_frame_error(session.id, "read", &error);
                    break;
                }
            };
            if frame.is_empty() {
                trace!(target: SERVER_TARGET, session = %session.id, "skipping empty message");
                continue;
            }
            let Some(reply) = self.dispatch(session.id, &frame) else {
                warn!(target: SERVER_TARGET, session = %session.id, "session vanished from table");
                break;
            };
            if let Err(error) = framer.write_reply(&reply) {
                log_frame_error(session.id, "write", &error);
                break;
            }
        }
    }

    /// Decodes `frame` and handles it under the global lock.
    fn dispatch(&self, id: SessionId, frame: &[u8]) -> Option<Reply> {
        let parsed = Message::parse(frame);
        let mut table = self.lock();
        let session = table.get_mut(id)?;
        let reply = match parsed {
            Ok(message) => {
                trace!(
                    target: SERVER_TARGET,
                    session = %id,
                    method = message.method(),
                    seq_num = message.seq_num(),
                    "handling request"
                );
                session.handle(&message)
            }
            Err(error) => session.handle_malformed(&error),
        };
        Some(reply)
    }

    fn lock(&self) -> MutexGuard<'_, SessionTable> {
        self.table.lock().unwrap_or_else(|poisoned| {
            warn!(
                target: SERVER_TARGET,
                "session table lock poisoned by a panicking handler; recovering"
            );
            self.table.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Server")
            .field("max_message_bytes", &self.max_message_bytes)
            .finish_non_exhaustive()
    }
}

impl ConnectionHandler for Server {
    fn handle(&self, stream: ConnectionStream) {
        debug!(target: SERVER_TARGET, peer = %stream.peer(), "serving connection");
        self.serve(StreamTransport::new(stream));
    }

    /// Registers the session on the accept thread so it is visible before
    /// the worker starts.
    fn admit(self: Arc<Self>, stream: ConnectionStream) -> ConnectionJob {
        let session = SessionGuard::open(&self);
        Box::new(move || {
            debug!(
                target: SERVER_TARGET,
                session = %session.id,
                peer = %stream.peer(),
                "serving connection"
            );
            self.serve_session(&session, StreamTransport::new(stream));
        })
    }
}

/// Registers a session on creation and removes it again on drop, including
/// when the worker unwinds or never starts.
struct SessionGuard {
    server: Server,
    id: SessionId,
}

impl SessionGuard {
    fn open(server: &Server) -> Self {
        let mut table = server.lock();
        let id = table.open(Arc::clone(&server.registry));
        info!(
            target: SERVER_TARGET,
            session = %id,
            live = table.len(),
            "session opened"
        );
        drop(table);
        Self {
            server: server.clone(),
            id,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut table = self.server.lock();
        let Some(mut session) = table.remove(self.id) else {
            return;
        };
        if thread::panicking() {
            warn!(
                target: SERVER_TARGET,
                session = %self.id,
                "session dropped without deactivation after a panic"
            );
        } else {
            session.close();
        }
        info!(
            target: SERVER_TARGET,
            session = %self.id,
            live = table.len(),
            "session closed"
        );
    }
}

fn log_frame_error(id: SessionId, phase: &'static str, error: &FrameError) {
    match error {
        FrameError::Broken { source } if source.kind() == io::ErrorKind::UnexpectedEof => {
            debug!(target: SERVER_TARGET, session = %id, "host disconnected");
        }
        _ => warn!(
            target: SERVER_TARGET,
            session = %id,
            phase,
            error = %error,
            "connection failed"
        ),
    }
}
