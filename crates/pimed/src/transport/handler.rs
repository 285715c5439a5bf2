//! Accepted connection streams and the handler seam the listener calls.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types accepted by the daemon listener.
#[derive(Debug)]
pub enum ConnectionStream {
    /// Connection accepted on a TCP endpoint.
    Tcp(TcpStream),
    /// Connection accepted on a Unix endpoint.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Short description of the peer for log fields.
    #[must_use]
    pub fn peer(&self) -> String {
        match self {
            Self::Tcp(stream) => stream
                .peer_addr()
                .map_or_else(|_| "tcp:unknown".to_owned(), |addr| format!("tcp:{addr}")),
            #[cfg(unix)]
            Self::Unix(_) => "unix".to_owned(),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Work that serves one admitted connection on its worker thread.
pub type ConnectionJob = Box<dyn FnOnce() + Send + 'static>;

/// Handles accepted socket connections.
///
/// The listener calls `admit` on its accept thread and runs the returned job
/// on a dedicated worker thread per connection; the job owns the stream for
/// the connection's whole lifetime.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves one connection until it closes. Implementations should avoid
    /// panicking.
    fn handle(&self, stream: ConnectionStream);

    /// Prepares `stream` before its worker starts. Dropping the job without
    /// running it must release whatever `admit` acquired.
    fn admit(self: Arc<Self>, stream: ConnectionStream) -> ConnectionJob {
        Box::new(move || self.handle(stream))
    }
}
