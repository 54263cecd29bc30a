use axum::{
    routing::get,
    Router,
};

use crate::handlers::snapshots;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Observed state pushed by the enrichment cycle
        .route(
            "/:match_id",
            get(snapshots::get_match_snapshots).post(snapshots::record_snapshot),
        )
}
