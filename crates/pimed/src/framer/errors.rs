//! Error types for message framing.

use std::io;

use thiserror::Error;

/// Failures that end a connection.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The transport reported a broken connection or a write failed.
    #[error("transport broken: {source}")]
    Broken {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A message grew past the configured size limit.
    #[error("message exceeds the {limit} byte limit")]
    TooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
    /// A reply could not be serialized.
    #[error("failed to encode reply: {0}")]
    Encode(#[from] serde_json::Error),
}
