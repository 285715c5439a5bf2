//! Demo input method that only ever types "喵".
//!
//! Every printable key appends 喵 to the composition. Down opens a list of
//! four homophones which keys `1`-`4` pick from, replacing the character
//! before the cursor. Enter (or a composition longer than ten characters)
//! commits the text.

use crate::composition::CompositionState;
use crate::keys::{KeyEvent, KeyEventHandler, dispatch_key_method, vk};
use crate::message::{Message, ReplyFields};
use crate::registry::ServiceFactory;
use crate::service::{Service, ServiceOutcome, SessionContext};

/// Profile identifier the demo service is registered under.
pub const MEOW_PROFILE_ID: &str = "meow";

const CANDIDATES: [&str; 4] = ["喵", "描", "秒", "妙"];
const MEOW: &str = "喵";
const COMMIT_THRESHOLD: usize = 10;

/// The demo service.
#[derive(Debug, Default)]
pub struct MeowService {
    state: CompositionState,
}

impl MeowService {
    /// Creates an idle instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Composition state, for inspection.
    #[must_use]
    pub const fn state(&self) -> &CompositionState {
        &self.state
    }

    fn handle_candidate_key(&mut self, key_code: u32) {
        if key_code == vk::UP || key_code == vk::ESCAPE {
            self.state.set_show_candidates(false);
            return;
        }
        let Some(candidate) = candidate_for(key_code) else {
            return;
        };
        let position = self.state.composition_cursor().saturating_sub(1);
        let current = self.state.composition_string();
        let prefix: String = current.chars().take(position).collect();
        let suffix: String = current.chars().skip(position + 1).collect();
        self.state
            .set_composition_string(format!("{prefix}{candidate}{suffix}"));
        self.state.set_show_candidates(false);
    }

    fn handle_editing_key(&mut self, key_code: u32) {
        let length = self.state.composition_len();
        let cursor = self.state.composition_cursor();
        if key_code == vk::RETURN || length > COMMIT_THRESHOLD {
            let text = self.state.composition_string().to_owned();
            self.state.set_commit_string(text);
            self.state.set_composition_string("");
        } else if key_code == vk::BACK && self.state.is_composing() {
            let mut text = self.state.composition_string().to_owned();
            text.pop();
            self.state.set_composition_string(text);
        } else if key_code == vk::LEFT {
            if let Some(previous) = cursor.checked_sub(1) {
                self.state.set_composition_cursor(previous);
            }
        } else if key_code == vk::RIGHT {
            if cursor < length {
                self.state.set_composition_cursor(cursor + 1);
            }
        } else {
            let text = format!("{}{MEOW}", self.state.composition_string());
            self.state.set_composition_string(text);
            self.state
                .set_composition_cursor(self.state.composition_len());
        }
    }
}

fn candidate_for(key_code: u32) -> Option<&'static str> {
    let index = key_code.checked_sub(u32::from('1'))?;
    CANDIDATES.get(usize::try_from(index).ok()?).copied()
}

fn passes_through(key_code: u32) -> bool {
    key_code == vk::RETURN || key_code == vk::BACK
}

impl KeyEventHandler for MeowService {
    fn filter_key_down(&mut self, event: &KeyEvent) -> bool {
        self.state.is_composing() || !passes_through(event.key_code)
    }

    fn on_key_down(&mut self, event: &KeyEvent) -> bool {
        if self.state.showing_candidates() {
            self.handle_candidate_key(event.key_code);
            return true;
        }

        self.state.set_candidate_list(CANDIDATES);
        if event.key_code == vk::DOWN {
            self.state.set_show_candidates(true);
            return true;
        }

        if !self.state.is_composing() && passes_through(event.key_code) {
            return false;
        }
        self.handle_editing_key(event.key_code);
        true
    }
}

impl Service for MeowService {
    fn activate(&mut self, _context: &SessionContext) {
        self.state.set_composition_string("");
    }

    fn deactivate(&mut self) {
        if self.state.showing_candidates() {
            self.state.set_show_candidates(false);
        }
        if self.state.is_composing() {
            self.state.set_composition_string("");
        }
    }

    fn handle(&mut self, method: &str, message: &Message) -> ServiceOutcome {
        dispatch_key_method(self, method, message).unwrap_or_else(ServiceOutcome::failed)
    }

    fn drain_reply_fields(&mut self) -> ReplyFields {
        self.state.drain_reply_fields()
    }
}

/// Factory registered under [`MEOW_PROFILE_ID`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MeowFactory;

impl ServiceFactory for MeowFactory {
    fn create(&self) -> Box<dyn Service> {
        Box::new(MeowService::new())
    }
}
