//! Input service contract for the PIME bridge.
//!
//! `pimed` owns the connections and the session lifecycle; everything that
//! turns key strokes into composed text lives behind the [`Service`] trait
//! defined here. A host activates a language profile by its identifier, the
//! daemon resolves that identifier through a [`ServiceRegistry`] to a
//! [`ServiceFactory`], and the resulting [`Service`] instance then receives
//! every request the daemon does not handle itself.
//!
//! Services report observable UI changes (composition text, cursor position,
//! candidate lists) by queuing reply fields which the daemon drains and merges
//! into the reply envelope. [`CompositionState`] implements the usual queue
//! for composing input methods, and [`dispatch_key_method`] routes the raw key
//! event methods to a [`KeyEventHandler`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use pime_service::meow::{MEOW_PROFILE_ID, MeowFactory};
//! use pime_service::{ServiceRegistry, StaticRegistry};
//!
//! let mut registry = StaticRegistry::new();
//! registry
//!     .register(MEOW_PROFILE_ID, Arc::new(MeowFactory))
//!     .expect("registration succeeds");
//! assert!(registry.resolve("MEOW").is_some());
//! ```

pub mod composition;
pub mod error;
pub mod keys;
pub mod message;
pub mod meow;
pub mod registry;
pub mod service;

pub use self::composition::CompositionState;
pub use self::error::{MalformedMessage, MessageError, RegistryError};
pub use self::keys::{KeyEvent, KeyEventHandler, KeyMethod, dispatch_key_method};
pub use self::message::{Message, ReplyFields};
pub use self::registry::{ServiceFactory, ServiceRegistry, StaticRegistry};
pub use self::service::{HostEnvironment, Service, ServiceOutcome, SessionContext, SessionId};
