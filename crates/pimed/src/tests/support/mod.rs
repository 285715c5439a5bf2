//! Test harness utilities shared by the daemon suites.

mod config_loader;
mod peers;
#[cfg(unix)]
mod process_world;
mod reporter;
mod services;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
#[cfg(unix)]
pub use process_world::{ProcessTestWorld, StepResult};
pub use peers::PeerRecorder;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use services::{ConcurrencyProbe, EventLog, scripted_registry};
pub use world::{TestWorld, world};
