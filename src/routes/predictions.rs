use axum::{routing::get, Router};

use crate::handlers::predictions;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/results", get(predictions::get_prediction_results))
}

pub fn feed_routes() -> Router<AppState> {
    Router::new().route("/predictions", get(predictions::prediction_feed))
}
