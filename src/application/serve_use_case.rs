// ============================================================
// Layer 2 — ServeUseCase
// ============================================================
// Loads the trained model, then runs the web server on a tokio
// runtime until Ctrl-C. Refuses to start without a model, so a
// running server always has one loaded.

use anyhow::{Context, Result};

use crate::application::classify_use_case::load_classifier;
use crate::server::{self, ServeConfig};

pub struct ServeUseCase {
    config: ServeConfig,
}

impl ServeUseCase {
    pub fn new(config: ServeConfig) -> Self {
        Self { config }
    }

    pub fn execute(self) -> Result<()> {
        let classifier = load_classifier(&self.config.model_dir)?;
        tracing::info!("CIFAR-10 model loaded from '{}'", self.config.model_dir);

        let runtime = tokio::runtime::Runtime::new()
            .context("Cannot start the tokio runtime")?;
        runtime.block_on(server::serve(self.config, classifier))
    }
}
