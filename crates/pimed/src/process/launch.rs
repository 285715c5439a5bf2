//! Wires bootstrap, the socket listener and shutdown handling together.

use std::sync::Arc;

use pime_service::ServiceRegistry;
use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::registry::default_registry;
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to run the daemon.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) registry: Arc<dyn ServiceRegistry>,
    pub(crate) shutdown: S,
}

/// Runs the daemon using the production collaborators.
///
/// Serves host connections until a termination signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, binding the socket or installing
/// the signal handlers fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        registry: Arc::new(default_registry()?),
        shutdown: SystemShutdownSignal::new(),
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        registry,
        shutdown,
    } = plan;

    let daemon = bootstrap_with(&loader, Arc::clone(&reporter), registry)?;
    let endpoint = daemon.config().daemon_socket().clone();
    info!(
        target: PROCESS_TARGET,
        socket = %endpoint,
        "starting daemon runtime"
    );
    let listener = SocketListener::bind(&endpoint)?;
    let listener_handle = listener.start(Arc::new(daemon.into_server()))?;
    reporter.listener_ready(&endpoint);

    let waited = shutdown.wait();
    listener_handle.shutdown();
    listener_handle.join()?;
    reporter.listener_stopped(&endpoint);
    waited?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
