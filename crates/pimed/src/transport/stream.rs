//! Message-oriented reads over a byte stream.
//!
//! Hosts delimit each JSON message with a single newline. A read hands back
//! at most one message's bytes; when the caller's buffer is smaller than the
//! message, the remainder is reported as [`ReadStatus::MoreData`] and handed
//! out on following reads, mirroring how message-mode pipes behave.

use std::io::{self, Read, Write};

/// Byte terminating every message on the wire.
pub(crate) const MESSAGE_DELIMITER: u8 = b'\n';

const READ_CHUNK_BYTES: usize = 4096;

/// Outcome of a single transport read.
#[derive(Debug)]
pub(crate) enum ReadStatus {
    /// The last `n` bytes written into the buffer end the current message.
    Complete(usize),
    /// `n` bytes were written and the message continues.
    MoreData(usize),
    /// Nothing is available yet; retry.
    WouldBlock,
    /// The connection is unusable.
    Broken(io::Error),
}

/// Message-oriented byte channel between one host session and the daemon.
pub(crate) trait Transport {
    /// Reads up to `buf.len()` bytes of the current message.
    fn read(&mut self, buf: &mut [u8]) -> ReadStatus;

    /// Writes one complete message.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the write or flush fails.
    fn write_message(&mut self, message: &[u8]) -> io::Result<()>;
}

/// [`Transport`] over a newline-delimited byte stream.
#[derive(Debug)]
pub(crate) struct StreamTransport<S> {
    stream: S,
    pending: Vec<u8>,
    chunk: Box<[u8]>,
}

impl<S> StreamTransport<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::new(),
            chunk: vec![0; READ_CHUNK_BYTES].into_boxed_slice(),
        }
    }

    /// Bytes read from the stream but not yet handed out.
    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn deliver(&mut self, buf: &mut [u8]) -> ReadStatus {
        let delimiter = self
            .pending
            .iter()
            .position(|byte| *byte == MESSAGE_DELIMITER);
        match delimiter {
            Some(end) if end <= buf.len() => {
                buf[..end].copy_from_slice(&self.pending[..end]);
                self.pending.drain(..=end);
                ReadStatus::Complete(end)
            }
            _ => {
                let count = buf.len().min(self.pending.len());
                buf[..count].copy_from_slice(&self.pending[..count]);
                self.pending.drain(..count);
                ReadStatus::MoreData(count)
            }
        }
    }
}

impl<S: Read> StreamTransport<S> {
    fn fill(&mut self) -> Option<ReadStatus> {
        match self.stream.read(&mut self.chunk) {
            Ok(0) => Some(ReadStatus::Broken(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            ))),
            Ok(count) => {
                self.pending.extend_from_slice(&self.chunk[..count]);
                None
            }
            Err(error) if is_transient(&error) => Some(ReadStatus::WouldBlock),
            Err(error) => Some(ReadStatus::Broken(error)),
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn read(&mut self, buf: &mut [u8]) -> ReadStatus {
        // Buffered bytes are drained before the socket is read again, so
        // `pending` never holds more than one read chunk beyond `buf`.
        let starved =
            self.pending.len() < buf.len() && !self.pending.contains(&MESSAGE_DELIMITER);
        if starved && let Some(status) = self.fill() {
            return status;
        }
        self.deliver(buf)
    }

    fn write_message(&mut self, message: &[u8]) -> io::Result<()> {
        let mut framed = Vec::with_capacity(message.len() + 1);
        framed.extend_from_slice(message);
        framed.push(MESSAGE_DELIMITER);
        self.stream.write_all(&framed)?;
        self.stream.flush()
    }
}
