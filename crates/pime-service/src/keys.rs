//! Raw key-event methods.
//!
//! Hosts forward keyboard activity as ordinary requests named
//! `filterKeyDown`, `onKeyDown`, `filterKeyUp`, `onKeyUp` and
//! `onKeyboardStatusChanged`. A service that cares about keys implements
//! [`KeyEventHandler`] and calls [`dispatch_key_method`] from
//! [`crate::Service::handle`].

use serde::Deserialize;
use tracing::debug;

use crate::message::Message;
use crate::service::ServiceOutcome;

const KEYS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::keys");

/// Windows virtual-key codes used by bundled services.
pub mod vk {
    /// Backspace.
    pub const BACK: u32 = 0x08;
    /// Enter.
    pub const RETURN: u32 = 0x0D;
    /// Escape.
    pub const ESCAPE: u32 = 0x1B;
    /// Left arrow.
    pub const LEFT: u32 = 0x25;
    /// Up arrow.
    pub const UP: u32 = 0x26;
    /// Right arrow.
    pub const RIGHT: u32 = 0x27;
    /// Down arrow.
    pub const DOWN: u32 = 0x28;
}

/// A key event as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyEvent {
    /// Virtual-key code.
    pub key_code: u32,
    /// Character produced by the key, `0` when none.
    pub char_code: u32,
    /// Hardware scan code.
    pub scan_code: u32,
    /// Auto-repeat count.
    pub repeat_count: u32,
    /// Whether the key is an extended key.
    pub is_extended: bool,
    /// Snapshot of all 256 key states, as returned by `GetKeyboardState`.
    pub key_states: Vec<u8>,
}

impl KeyEvent {
    /// Reads the key event carried by a request.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when a key field has the wrong type.
    pub fn from_message(message: &Message) -> Result<Self, serde_json::Error> {
        message.deserialize_fields()
    }

    /// Whether `key_code` was held down when the event fired.
    #[must_use]
    pub fn is_key_down(&self, key_code: u32) -> bool {
        self.state_of(key_code).is_some_and(|state| state & 0x80 != 0)
    }

    /// Whether a toggle key (such as Caps Lock) was on.
    #[must_use]
    pub fn is_key_toggled(&self, key_code: u32) -> bool {
        self.state_of(key_code).is_some_and(|state| state & 0x01 != 0)
    }

    /// Whether the key produced the given character.
    #[must_use]
    pub fn is_char(&self, ch: char) -> bool {
        self.char_code == u32::from(ch)
    }

    fn state_of(&self, key_code: u32) -> Option<u8> {
        usize::try_from(key_code)
            .ok()
            .and_then(|index| self.key_states.get(index))
            .copied()
    }
}

/// Handlers for the raw key-event methods; every hook defaults to "not
/// handled".
pub trait KeyEventHandler {
    /// Whether the service wants the key-down event.
    fn filter_key_down(&mut self, _event: &KeyEvent) -> bool {
        false
    }

    /// Processes a key-down event the service asked for.
    fn on_key_down(&mut self, _event: &KeyEvent) -> bool {
        false
    }

    /// Whether the service wants the key-up event.
    fn filter_key_up(&mut self, _event: &KeyEvent) -> bool {
        false
    }

    /// Processes a key-up event the service asked for.
    fn on_key_up(&mut self, _event: &KeyEvent) -> bool {
        false
    }

    /// The host opened or closed the keyboard.
    fn on_keyboard_status_changed(&mut self, _opened: bool) {}
}

/// Key-event method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMethod {
    /// `filterKeyDown`
    FilterKeyDown,
    /// `onKeyDown`
    OnKeyDown,
    /// `filterKeyUp`
    FilterKeyUp,
    /// `onKeyUp`
    OnKeyUp,
    /// `onKeyboardStatusChanged`
    OnKeyboardStatusChanged,
}

impl KeyMethod {
    /// Maps a request method onto a key-event method.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "filterKeyDown" => Some(Self::FilterKeyDown),
            "onKeyDown" => Some(Self::OnKeyDown),
            "filterKeyUp" => Some(Self::FilterKeyUp),
            "onKeyUp" => Some(Self::OnKeyUp),
            "onKeyboardStatusChanged" => Some(Self::OnKeyboardStatusChanged),
            _ => None,
        }
    }

    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FilterKeyDown => "filterKeyDown",
            Self::OnKeyDown => "onKeyDown",
            Self::FilterKeyUp => "filterKeyUp",
            Self::OnKeyUp => "onKeyUp",
            Self::OnKeyboardStatusChanged => "onKeyboardStatusChanged",
        }
    }
}

/// Routes a key-event request to `handler`.
///
/// Returns `None` when `method` is not a key-event method so the caller can
/// try its own methods. Key hooks report their verdict as the reply's
/// `return` value; a request whose key fields fail to decode yields a failed
/// outcome.
pub fn dispatch_key_method<H>(
    handler: &mut H,
    method: &str,
    message: &Message,
) -> Option<ServiceOutcome>
where
    H: KeyEventHandler + ?Sized,
{
    let key_method = KeyMethod::parse(method)?;
    if key_method == KeyMethod::OnKeyboardStatusChanged {
        let opened = message.bool_field("opened").unwrap_or(false);
        handler.on_keyboard_status_changed(opened);
        return Some(ServiceOutcome::succeeded());
    }

    let event = match KeyEvent::from_message(message) {
        Ok(event) => event,
        Err(error) => {
            debug!(
                target: KEYS_TARGET,
                method = key_method.as_str(),
                %error,
                "key event fields did not decode"
            );
            return Some(ServiceOutcome::failed());
        }
    };

    let verdict = match key_method {
        KeyMethod::FilterKeyDown => handler.filter_key_down(&event),
        KeyMethod::OnKeyDown => handler.on_key_down(&event),
        KeyMethod::FilterKeyUp => handler.filter_key_up(&event),
        KeyMethod::OnKeyUp => handler.on_key_up(&event),
        KeyMethod::OnKeyboardStatusChanged => false,
    };
    Some(ServiceOutcome::returning(verdict))
}
