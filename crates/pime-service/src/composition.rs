//! Composition state shared by composing input services.
//!
//! Every setter updates the local state and queues the matching reply field,
//! so the host sees exactly the changes made while handling one request.

use serde_json::Value;

use crate::message::ReplyFields;

/// Reply field carrying the composition text.
pub const COMPOSITION_STRING: &str = "compositionString";
/// Reply field carrying the cursor position, in characters.
pub const COMPOSITION_CURSOR: &str = "compositionCursor";
/// Reply field carrying text to commit to the application.
pub const COMMIT_STRING: &str = "commitString";
/// Reply field carrying the candidate list.
pub const CANDIDATE_LIST: &str = "candidateList";
/// Reply field carrying candidate window visibility.
pub const SHOW_CANDIDATES: &str = "showCandidates";

/// Tracks composition text, cursor and candidates for one service instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionState {
    composition: String,
    cursor: usize,
    candidates: Vec<String>,
    show_candidates: bool,
    pending: ReplyFields,
}

impl CompositionState {
    /// Empty state with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current composition text.
    #[must_use]
    pub fn composition_string(&self) -> &str {
        &self.composition
    }

    /// Length of the composition in characters.
    #[must_use]
    pub fn composition_len(&self) -> usize {
        self.composition.chars().count()
    }

    /// Cursor position in characters.
    #[must_use]
    pub const fn composition_cursor(&self) -> usize {
        self.cursor
    }

    /// Whether any text is being composed.
    #[must_use]
    pub fn is_composing(&self) -> bool {
        !self.composition.is_empty()
    }

    /// Current candidates.
    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Whether the candidate window is shown.
    #[must_use]
    pub const fn showing_candidates(&self) -> bool {
        self.show_candidates
    }

    /// Replaces the composition text.
    pub fn set_composition_string(&mut self, text: impl Into<String>) {
        self.composition = text.into();
        self.queue(COMPOSITION_STRING, Value::String(self.composition.clone()));
    }

    /// Moves the cursor.
    pub fn set_composition_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.queue(COMPOSITION_CURSOR, Value::from(cursor));
    }

    /// Commits text to the application.
    pub fn set_commit_string(&mut self, text: impl Into<String>) {
        self.queue(COMMIT_STRING, Value::String(text.into()));
    }

    /// Replaces the candidate list.
    pub fn set_candidate_list<I, S>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        let list = self
            .candidates
            .iter()
            .cloned()
            .map(Value::String)
            .collect();
        self.queue(CANDIDATE_LIST, Value::Array(list));
    }

    /// Shows or hides the candidate window.
    pub fn set_show_candidates(&mut self, show: bool) {
        self.show_candidates = show;
        self.queue(SHOW_CANDIDATES, Value::Bool(show));
    }

    /// Returns and clears the queued reply fields.
    pub fn drain_reply_fields(&mut self) -> ReplyFields {
        std::mem::take(&mut self.pending)
    }

    fn queue(&mut self, key: &str, value: Value) {
        self.pending.insert(key.to_owned(), value);
    }
}
