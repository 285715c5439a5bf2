//! The PIME bridge daemon.
//!
//! A text-input host opens one connection per input session and exchanges
//! newline-delimited JSON requests and replies with the daemon. Each
//! connection gets a [`Session`] that handles the session lifecycle itself
//! and forwards every other request to the input service activated for the
//! session's language profile. Services come from a
//! [`ServiceRegistry`](pime_service::ServiceRegistry) injected at bootstrap.
//!
//! Connections are served concurrently, one worker thread each, but request
//! handling is serialized across the whole daemon by a single lock around
//! the session table (see [`Server`]). Services therefore never observe
//! concurrent calls.
//!
//! The bootstrap sequence loads configuration through [`ConfigLoader`],
//! installs structured telemetry, prepares the socket directory and builds
//! the [`Server`]; [`run_daemon`] then binds the listener and serves until a
//! termination signal arrives. Health reporting hooks emit structured events
//! at each stage.

mod bootstrap;
mod framer;
mod health;
mod process;
mod registry;
mod server;
pub mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use framer::FrameError;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use registry::default_registry;
pub use server::Server;
pub use session::{LifecycleMethod, Reply, Session};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionHandler, ConnectionJob, ConnectionStream, ListenerError};

#[cfg(test)]
mod tests;
