/// Shared application state passed to axum handlers.

use std::sync::{Arc, Mutex};

use lanes_core::storage::local::LocalStorage;

use crate::config::ServerConfig;

/// Size limits applied to request bodies and uploads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: usize,
    pub max_files: usize,
}

impl UploadLimits {
    /// Body limit for a whole request: every allowed file plus room for
    /// multipart framing.
    pub fn body_limit(&self) -> usize {
        self.max_bytes
            .saturating_mul(self.max_files.max(1))
            .saturating_add(64 * 1024)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<LocalStorage>,
    pub port: u16,
    pub bind_address: String,
    /// Port actually bound, which differs from `port` when `port` is 0.
    pub live_port: Arc<Mutex<u16>>,
    pub limits: UploadLimits,
}

impl AppState {
    pub fn new(storage: LocalStorage, config: &ServerConfig) -> Self {
        Self {
            storage: Arc::new(storage),
            port: config.port,
            bind_address: config.bind_address.clone(),
            live_port: Arc::new(Mutex::new(config.port)),
            limits: UploadLimits {
                max_bytes: config.max_upload_bytes,
                max_files: config.max_upload_files,
            },
        }
    }
}
