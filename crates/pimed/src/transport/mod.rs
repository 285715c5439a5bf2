//! Socket transport for host connections.
//!
//! The listener binds the configured endpoint and accepts connections on a
//! background thread, handing every connection to a [`ConnectionHandler`] on
//! its own worker thread. [`StreamTransport`] adapts an accepted byte stream
//! to the message-oriented [`Transport`] contract the framer reads from.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
mod stream;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionJob, ConnectionStream};
pub(crate) use self::listener::SocketListener;
#[cfg(test)]
pub(crate) use self::listener::ListenerHandle;
pub(crate) use self::stream::{ReadStatus, StreamTransport, Transport};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
