//! Test configuration loaders for scenarios covering success and failure paths.
//!
use std::ffi::OsString;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig as _, OrthoError};
use pime_config::{Config, SocketEndpoint};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that provisions a Unix socket path under a temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    socket_dir: Arc<Mutex<TempDir>>,
    max_message_bytes: Option<usize>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for socket");
        Self {
            socket_dir: Arc::new(Mutex::new(dir)),
            max_message_bytes: None,
        }
    }

    /// Overrides the request size limit handed to the daemon.
    #[must_use]
    pub fn with_max_message_bytes(mut self, limit: usize) -> Self {
        self.max_message_bytes = Some(limit);
        self
    }

    /// Socket path the loaded configuration points at.
    pub fn socket_path(&self) -> Utf8PathBuf {
        let dir = self
            .socket_dir
            .lock()
            .expect("temporary directory mutex poisoned");
        let path = dir.path().join("run").join("pimed.sock");
        Utf8PathBuf::from_path_buf(path).expect("temporary socket path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let defaults = Config::default();
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(self.socket_path()),
            max_message_bytes: self
                .max_message_bytes
                .unwrap_or(defaults.max_message_bytes),
            ..defaults
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
#[derive(Clone, Copy)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("pimed"),
            OsString::from("--daemon-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
