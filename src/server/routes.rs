use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use crate::server::{error::handle_rejection, handlers, AppState, ServeConfig};

/// Build the complete route tree
pub fn routes(
    config: &ServeConfig,
    state:  AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // Every route matches its path before its method.
    let index = warp::path::end()
        .and(warp::get())
        .and(warp::fs::file(config.templates_dir.join("index.html")));

    let static_files = warp::path("static").and(warp::fs::dir(config.static_dir.clone()));

    let model_info = warp::path!("api" / "model-info")
        .and(warp::get())
        .map(handlers::model_info);

    let upload = warp::path!("api" / "upload")
        .and(warp::post())
        .and(warp::multipart::form().max_length(config.max_upload_bytes))
        .and(with_state(state))
        .and_then(handlers::upload);

    let test_prediction = warp::path!("api" / "test-prediction")
        .and(warp::get())
        .map(handlers::test_prediction);

    let health = warp::path!("health")
        .and(warp::get())
        .map(handlers::health);

    index
        .or(static_files)
        .or(model_info)
        .or(upload)
        .or(test_prediction)
        .or(health)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
