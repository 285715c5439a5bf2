//! Errors raised by message decoding and registry operations.

use thiserror::Error;

/// Reasons a request could not be turned into a [`crate::Message`].
#[derive(Debug, Error)]
pub enum MessageError {
    /// The request bytes were not valid UTF-8.
    #[error("request is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The request text was not valid JSON.
    #[error("request is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The request parsed but was not a JSON object.
    #[error("request must be a JSON object")]
    NotAnObject,
    /// The `method` key was absent or not a string.
    #[error("request has no string `method` field")]
    MissingMethod,
    /// The `seqNum` key was present but not an integer.
    #[error("request `seqNum` must be an integer")]
    InvalidSeqNum,
}

/// A request that failed to decode.
///
/// Carries the sequence number salvaged from the request (or `0`) so the
/// daemon can still answer with a correlated failure reply.
#[derive(Debug, Error)]
#[error("malformed request (seqNum {seq_num}): {source}")]
pub struct MalformedMessage {
    /// Best-effort sequence number of the failed request.
    pub seq_num: i64,
    /// Why decoding failed.
    #[source]
    pub source: MessageError,
}

impl MalformedMessage {
    pub(crate) fn new(seq_num: i64, source: impl Into<MessageError>) -> Self {
        Self {
            seq_num,
            source: source.into(),
        }
    }
}

/// Errors raised while populating a [`crate::StaticRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The profile identifier was empty.
    #[error("profile identifier must not be empty")]
    EmptyProfileId,
    /// A factory was already registered for the identifier.
    #[error("profile '{profile_id}' is already registered")]
    Duplicate {
        /// Normalised identifier that collided.
        profile_id: String,
    },
}
