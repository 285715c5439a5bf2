//! Reply envelope sent back for every request.

use pime_service::ReplyFields;
use serde::Serialize;
use serde_json::Value;

const RESERVED_KEYS: [&str; 3] = ["success", "seqNum", "return"];

/// Response to one request.
///
/// Service-contributed fields are flattened next to the envelope keys.
/// Fields named like an envelope key are dropped when merged so they can
/// never override `success`, `seqNum` or `return`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    success: bool,
    #[serde(rename = "seqNum")]
    seq_num: i64,
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    return_value: Option<Value>,
    #[serde(flatten)]
    fields: ReplyFields,
}

impl Reply {
    /// Successful reply with no extra fields.
    #[must_use]
    pub fn success(seq_num: i64) -> Self {
        Self::new(true, seq_num)
    }

    /// Failed reply with no extra fields.
    #[must_use]
    pub fn failure(seq_num: i64) -> Self {
        Self::new(false, seq_num)
    }

    pub(crate) fn new(success: bool, seq_num: i64) -> Self {
        Self {
            success,
            seq_num,
            return_value: None,
            fields: ReplyFields::new(),
        }
    }

    pub(crate) fn with_return(mut self, value: Option<Value>) -> Self {
        self.return_value = value;
        self
    }

    pub(crate) fn with_fields(mut self, fields: ReplyFields) -> Self {
        self.fields = fields
            .into_iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        self
    }

    /// Whether the request succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Sequence number echoed from the request.
    #[must_use]
    pub const fn seq_num(&self) -> i64 {
        self.seq_num
    }

    /// Value returned by the service, if any.
    #[must_use]
    pub const fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Service-contributed UI state fields.
    #[must_use]
    pub const fn fields(&self) -> &ReplyFields {
        &self.fields
    }
}
