// ============================================================
// Layer 7 — Web Server (warp)
// ============================================================
// Serves the upload page and a small JSON API around the
// trained classifier:
//
//   GET  /                     templates/index.html
//   GET  /static/...           static assets
//   GET  /api/model-info       class table + status
//   POST /api/upload           multipart "file" → predictions
//   GET  /api/test-prediction  random prediction (frontend testing)
//   GET  /health               liveness
//
//   routes.rs   — filter tree
//   handlers.rs — request handlers
//   error.rs    — UploadError + rejection → JSON
//
// The model is loaded once at startup and shared behind a
// mutex; forward passes run on tokio's blocking pool.

use anyhow::{anyhow, Context, Result};
use std::{
    net::IpAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::traits::ImageClassifier;

pub mod error;
pub mod handlers;
pub mod routes;

/// Default upload body limit (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub bind:             String,
    pub port:             u16,
    pub model_dir:        String,
    pub upload_dir:       PathBuf,
    pub static_dir:       PathBuf,
    pub templates_dir:    PathBuf,
    pub max_upload_bytes: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind:             "127.0.0.1".to_string(),
            port:             5000,
            model_dir:        "artifacts".to_string(),
            upload_dir:       PathBuf::from("uploads"),
            static_dir:       PathBuf::from("static"),
            templates_dir:    PathBuf::from("templates"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

pub type SharedClassifier = Arc<Mutex<Box<dyn ImageClassifier>>>;

/// State cloned into every request handler
#[derive(Clone)]
pub struct AppState {
    pub classifier:   SharedClassifier,
    pub preprocessor: Preprocessor,
    pub upload_dir:   PathBuf,
}

impl AppState {
    pub fn new(classifier: Box<dyn ImageClassifier>, upload_dir: impl Into<PathBuf>) -> Self {
        let preprocessor = Preprocessor::new(classifier.input_size());
        Self {
            classifier: Arc::new(Mutex::new(classifier)),
            preprocessor,
            upload_dir: upload_dir.into(),
        }
    }
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: ServeConfig, classifier: Box<dyn ImageClassifier>) -> Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| {
            format!("Cannot create upload directory '{}'", config.upload_dir.display())
        })?;

    let ip: IpAddr = config
        .bind
        .parse()
        .map_err(|e| anyhow!("Invalid bind address '{}': {}", config.bind, e))?;

    let state  = AppState::new(classifier, config.upload_dir.clone());
    let routes = routes::routes(&config, state);

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown((ip, config.port), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for Ctrl-C: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .with_context(|| format!("Cannot bind {}:{}", config.bind, config.port))?;

    tracing::info!("Listening on http://{}", addr);
    tracing::info!(
        "Uploads saved to '{}', static files from '{}'",
        config.upload_dir.display(),
        config.static_dir.display()
    );

    server.await;
    Ok(())
}
