//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::pipeline::RagPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// The pipeline, or why it could not be built
    pipeline: std::result::Result<Arc<RagPipeline>, String>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// A configuration problem does not prevent startup: every pipeline
    /// request is answered with the configuration error instead.
    pub fn new(config: RagConfig) -> Self {
        tracing::info!("Initializing application state (backend: {:?})...", config.backend);

        let pipeline = match RagPipeline::from_config(config.clone()) {
            Ok(pipeline) => Ok(Arc::new(pipeline)),
            Err(e) => {
                tracing::warn!("{}", e);
                tracing::warn!("/upload and /ask will report the configuration error until this is fixed");
                Err(match e {
                    Error::Config(message) => message,
                    other => other.to_string(),
                })
            }
        };

        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    /// Wrap an already built pipeline
    pub fn with_pipeline(pipeline: RagPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config: pipeline.config().clone(),
                pipeline: Ok(Arc::new(pipeline)),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// The pipeline, or the configuration error that prevented building it
    pub fn pipeline(&self) -> Result<Arc<RagPipeline>> {
        match &self.inner.pipeline {
            Ok(pipeline) => Ok(Arc::clone(pipeline)),
            Err(message) => Err(Error::Config(message.clone())),
        }
    }

    /// Check if the service can handle pipeline requests
    pub fn is_ready(&self) -> bool {
        self.inner.pipeline.is_ok()
    }
}
