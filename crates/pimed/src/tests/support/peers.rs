//! Connection handler that records which hosts reached the listener.

use std::sync::{Arc, Mutex};

use crate::transport::{ConnectionHandler, ConnectionStream};

/// Remembers the peer label of every served connection and closes it.
#[derive(Default)]
pub struct PeerRecorder {
    peers: Mutex<Vec<String>>,
}

impl PeerRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Peer labels in the order the connections were served.
    pub fn peers(&self) -> Vec<String> {
        self.peers.lock().map(|peers| peers.clone()).unwrap_or_default()
    }

    pub fn connections(&self) -> usize {
        self.peers().len()
    }
}

impl ConnectionHandler for PeerRecorder {
    fn handle(&self, stream: ConnectionStream) {
        if let Ok(mut peers) = self.peers.lock() {
            peers.push(stream.peer());
        }
    }
}
