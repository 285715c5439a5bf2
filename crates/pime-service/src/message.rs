//! Request envelope shared by the daemon and input services.
//!
//! A request is one JSON object. `method` names the operation and `seqNum`
//! is the host's correlation identifier (`0` when omitted or `null`); every
//! other key is method specific and kept verbatim so services can read it.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{MalformedMessage, MessageError};

/// Reply fields queued by a session or service, keyed by field name.
pub type ReplyFields = Map<String, Value>;

/// JSON key carrying the operation name.
pub const METHOD_KEY: &str = "method";
/// JSON key carrying the correlation identifier.
pub const SEQ_NUM_KEY: &str = "seqNum";

/// A decoded host request.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    method: String,
    seq_num: i64,
    fields: Map<String, Value>,
}

impl Message {
    /// Builds a message from its parts; `fields` may include `method` and
    /// `seqNum`, which are overwritten with the supplied values.
    #[must_use]
    pub fn new(method: impl Into<String>, seq_num: i64, mut fields: Map<String, Value>) -> Self {
        let method = method.into();
        fields.insert(METHOD_KEY.to_owned(), Value::String(method.clone()));
        fields.insert(SEQ_NUM_KEY.to_owned(), Value::from(seq_num));
        Self {
            method,
            seq_num,
            fields,
        }
    }

    /// Decodes one framed request.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedMessage`] when the bytes are not UTF-8, not JSON,
    /// not an object, lack a string `method`, or carry a `seqNum` that is not
    /// an integer in the `i64` range. The error keeps whatever `seqNum` could be recovered.
    pub fn parse(bytes: &[u8]) -> Result<Self, MalformedMessage> {
        let text = std::str::from_utf8(bytes).map_err(|error| MalformedMessage::new(0, error))?;
        let value: Value =
            serde_json::from_str(text).map_err(|error| MalformedMessage::new(0, error))?;
        Self::from_value(value)
    }

    /// Builds a message from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// See [`Message::parse`].
    pub fn from_value(value: Value) -> Result<Self, MalformedMessage> {
        let Value::Object(fields) = value else {
            return Err(MalformedMessage::new(0, MessageError::NotAnObject));
        };

        let seq_num = match fields.get(SEQ_NUM_KEY) {
            None | Some(Value::Null) => 0,
            Some(raw) => raw
                .as_i64()
                .ok_or_else(|| MalformedMessage::new(0, MessageError::InvalidSeqNum))?,
        };

        let method = fields
            .get(METHOD_KEY)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| MalformedMessage::new(seq_num, MessageError::MissingMethod))?;

        Ok(Self {
            method,
            seq_num,
            fields,
        })
    }

    /// Operation name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Correlation identifier, `0` when the host omitted it.
    #[must_use]
    pub const fn seq_num(&self) -> i64 {
        self.seq_num
    }

    /// Raw value of a request field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A boolean request field, `None` when absent or not a boolean.
    #[must_use]
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.field(key).and_then(Value::as_bool)
    }

    /// A string request field, `None` when absent or not a string.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    /// Deserialises the whole request object into a typed view.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the fields do not match `T`.
    pub fn deserialize_fields<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}
