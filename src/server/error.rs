// ============================================================
// Layer 7 — HTTP Errors
// ============================================================
// Every failure the API reports is a JSON body of the form
//
//   {"success": false, "error": "<message>"}
//
// with a status code chosen by the error kind.

use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::{http::StatusCode, Rejection, Reply};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Empty filename")]
    EmptyFilename,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Could not save upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prediction failed: {0}")]
    Inference(String),

    #[error("Malformed upload: {0}")]
    Multipart(String),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::MissingFile
            | UploadError::EmptyFilename
            | UploadError::InvalidImage(_)
            | UploadError::Multipart(_) => StatusCode::BAD_REQUEST,
            UploadError::Io(_) | UploadError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> warp::reply::Response {
        error_response(self.status(), &self.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error:   &'a str,
}

pub fn error_response(status: StatusCode, message: &str) -> warp::reply::Response {
    let body = ErrorBody { success: false, error: message };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

/// Turn warp's built-in rejections into the same JSON error shape
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "File too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if err.find::<warp::reject::MissingHeader>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        // Only the upload route inspects headers: a request that
        // is not multipart/form-data carries no file.
        (StatusCode::BAD_REQUEST, UploadError::MissingFile.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        // `find` walks every combined rejection; a method mismatch
        // ranks below any other cause.
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(error_response(status, &message))
}
