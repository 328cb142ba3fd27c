//! Application state shared by all requests.
//!
//! Read-only after startup: per-call state lives inside each relay session.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::relay::{AudioSink, ObjectStoreSink, SinkError};

/// Shared application state.
pub struct AppState {
    pub config: ServerConfig,
    /// Capture storage; `None` when recording is disabled
    pub sink: Option<Arc<dyn AudioSink>>,
}

impl AppState {
    /// Build state from configuration, setting up capture storage.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, SinkError> {
        let sink = ObjectStoreSink::from_config(&config)?
            .map(|sink| Arc::new(sink) as Arc<dyn AudioSink>);
        Ok(Arc::new(Self { config, sink }))
    }

    /// Build state around an existing sink.
    pub fn with_sink(config: ServerConfig, sink: Option<Arc<dyn AudioSink>>) -> Arc<Self> {
        Arc::new(Self { config, sink })
    }
}
