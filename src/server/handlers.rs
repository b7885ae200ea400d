use bytes::BufMut;
use futures_util::TryStreamExt;
use rand::Rng;
use serde::Serialize;
use std::{collections::BTreeMap, convert::Infallible, path::Path};
use warp::{
    http::StatusCode,
    multipart::{FormData, Part},
    Reply,
};

use crate::domain::{
    classes::{ClassInfo, CIFAR10_CLASSES},
    prediction::{round2, PredictionReport, DEFAULT_TOP_K},
};
use crate::server::{error::UploadError, AppState};

const UPLOAD_FIELD: &str = "file";
const MODEL_STATUS: &str = "Warp + CIFAR10 Model Running ✅";
const API_ROUTES: [&str; 3] = ["/api/upload", "/api/model-info", "/api/test-prediction"];

// ─── Response bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub success:      bool,
    pub model_loaded: bool,
    /// Keyed by class name; sorted like Flask's jsonify output
    pub classes:      BTreeMap<&'static str, &'static ClassInfo>,
    pub status:       &'static str,
    pub routes:       [&'static str; 3],
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report:  PredictionReport,
}

#[derive(Debug, Serialize)]
pub struct TestPrediction {
    pub success:    bool,
    pub prediction: SamplePrediction,
}

#[derive(Debug, Serialize)]
pub struct SamplePrediction {
    #[serde(rename = "class")]
    pub class_name: &'static str,
    pub emoji:      &'static str,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status:  &'static str,
    pub version: &'static str,
}

// ─── Handlers ────────────────────────────────────────────────────────────────

pub fn model_info() -> impl Reply {
    let classes = CIFAR10_CLASSES.iter().map(|c| (c.name, c)).collect();
    warp::reply::json(&ModelInfo {
        success:      true,
        model_loaded: true,
        classes,
        status:       MODEL_STATUS,
        routes:       API_ROUTES,
    })
}

/// Random class with a confidence in [70, 100]; lets the frontend
/// be exercised without running the model.
pub fn test_prediction() -> impl Reply {
    let mut rng = rand::thread_rng();
    let cls = &CIFAR10_CLASSES[rng.gen_range(0..CIFAR10_CLASSES.len())];
    warp::reply::json(&TestPrediction {
        success:    true,
        prediction: SamplePrediction {
            class_name: cls.name,
            emoji:      cls.emoji,
            confidence: round2(rng.gen_range(70.0..=100.0)),
        },
    })
}

pub fn health() -> impl Reply {
    warp::reply::json(&Health { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

pub async fn upload(form: FormData, state: AppState) -> Result<warp::reply::Response, Infallible> {
    match classify_upload(form, &state).await {
        Ok(report) => {
            if let Some(best) = report.best() {
                tracing::info!("Predicted {} ({:.2}%)", best.class_name, best.confidence);
            }
            let body = UploadResponse { success: true, report };
            Ok(warp::reply::with_status(warp::reply::json(&body), StatusCode::OK).into_response())
        }
        Err(e) => {
            tracing::warn!("Upload rejected: {}", e);
            Ok(e.into_response())
        }
    }
}

async fn classify_upload(form: FormData, state: &AppState) -> Result<PredictionReport, UploadError> {
    let (client_name, bytes) = read_file_field(form).await?;
    if client_name.is_empty() {
        return Err(UploadError::EmptyFilename);
    }
    let filename = sanitize_filename(&client_name).ok_or(UploadError::EmptyFilename)?;

    let path = state.upload_dir.join(&filename);
    tokio::fs::write(&path, &bytes).await?;
    tracing::debug!("Saved upload '{}' ({} bytes)", path.display(), bytes.len());

    let classifier   = state.classifier.clone();
    let preprocessor = state.preprocessor;

    tokio::task::spawn_blocking(move || {
        let image = preprocessor
            .prepare_bytes(&bytes)
            .map_err(|e| UploadError::InvalidImage(format!("{e:#}")))?;

        let probs = classifier
            .lock()
            .map_err(|_| UploadError::Inference("model lock poisoned".to_string()))?
            .probabilities(&image)
            .map_err(|e| UploadError::Inference(format!("{e:#}")))?;

        PredictionReport::from_probabilities(&probs, DEFAULT_TOP_K)
            .map_err(|e| UploadError::Inference(e.to_string()))
    })
    .await
    .map_err(|e| UploadError::Inference(e.to_string()))?
}

/// Find the `file` field and read its contents.
/// Other fields are skipped; a `file` field without a filename
/// is not a file upload.
async fn read_file_field(mut form: FormData) -> Result<(String, Vec<u8>), UploadError> {
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        if part.name() != UPLOAD_FIELD {
            continue;
        }
        let Some(filename) = part.filename().map(str::to_owned) else {
            return Err(UploadError::MissingFile);
        };
        let bytes = read_part(part).await?;
        return Ok((filename, bytes));
    }
    Err(UploadError::MissingFile)
}

async fn read_part(part: Part) -> Result<Vec<u8>, UploadError> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, buf| async move {
            acc.put(buf);
            Ok(acc)
        })
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))
}

/// Keep only the final path component of a client-supplied name
/// ("../../x.png" → "x.png", "C:\\tmp\\x.png" → "x.png").
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        _ => Path::new(last).file_name().map(|n| n.to_string_lossy().into_owned()),
    }
}
