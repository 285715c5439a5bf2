//! Reassembles whole messages from transport reads and writes replies.
//!
//! The framer issues bounded reads and keeps appending until the transport
//! reports that the current message is complete. Partial reads and retries
//! are invisible to callers: a message split across any number of reads
//! decodes exactly like one delivered in a single read.

mod errors;

use std::thread;

use tracing::{debug, trace};

use crate::session::Reply;
use crate::transport::{ReadStatus, Transport};

pub use self::errors::FrameError;

pub(crate) const FRAMER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::framer");

/// Size of each bounded transport read.
pub(crate) const READ_CHUNK_BYTES: usize = 512;

/// Reads framed messages from, and writes replies to, one transport.
#[derive(Debug)]
pub(crate) struct Framer<T> {
    transport: T,
    max_message_bytes: usize,
}

impl<T: Transport> Framer<T> {
    pub(crate) fn new(transport: T, max_message_bytes: usize) -> Self {
        Self {
            transport,
            max_message_bytes,
        }
    }

    /// Reads one complete message.
    ///
    /// The returned bytes may be empty when the peer sent an empty message.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Broken`] when the transport fails mid-message
    /// and [`FrameError::TooLarge`] when the message outgrows the limit. The
    /// partial message is discarded in both cases.
    pub(crate) fn read_message(&mut self) -> Result<Vec<u8>, FrameError> {
        let mut message = Vec::new();
        let mut chunk = [0_u8; READ_CHUNK_BYTES];
        loop {
            match self.transport.read(&mut chunk) {
                ReadStatus::Complete(count) => {
                    self.append(&mut message, &chunk, count)?;
                    trace!(target: FRAMER_TARGET, bytes = message.len(), "message complete");
                    return Ok(message);
                }
                ReadStatus::MoreData(count) => self.append(&mut message, &chunk, count)?,
                ReadStatus::WouldBlock => thread::yield_now(),
                ReadStatus::Broken(source) => {
                    if !message.is_empty() {
                        debug!(
                            target: FRAMER_TARGET,
                            discarded = message.len(),
                            "transport broke mid-message"
                        );
                    }
                    return Err(FrameError::Broken { source });
                }
            }
        }
    }

    /// Serializes `reply` and writes it with a single transport write.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Encode`] when serialization fails and
    /// [`FrameError::Broken`] when the write fails.
    pub(crate) fn write_reply(&mut self, reply: &Reply) -> Result<(), FrameError> {
        let encoded = serde_json::to_vec(reply)?;
        self.transport
            .write_message(&encoded)
            .map_err(|source| FrameError::Broken { source })
    }

    fn append(
        &self,
        message: &mut Vec<u8>,
        chunk: &[u8],
        count: usize,
    ) -> Result<(), FrameError> {
        let data = &chunk[..count.min(chunk.len())];
        if message.len() + data.len() > self.max_message_bytes {
            return Err(FrameError::TooLarge {
                limit: self.max_message_bytes,
            });
        }
        message.extend_from_slice(data);
        Ok(())
    }
}
