use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::errors::Result;
use crate::models::prediction::LiveStats;
use crate::models::snapshot::ObservedState;
use crate::state::AppState;

// POST /api/snapshots/:match_id
pub async fn record_snapshot(
    State(state): State<AppState>,
    Path(match_id): Path<i64>,
    Json(payload): Json<ObservedState>,
) -> Result<Json<Value>> {
    payload.validate()?;

    let snapshot = state.collector.record_snapshot(match_id, payload);
    tracing::debug!(
        match_id,
        played_time = snapshot.played_time.as_deref().unwrap_or(""),
        "📝 Snapshot recorded"
    );

    Ok(Json(json!({
        "success": true,
        "snapshot_id": snapshot.id.to_hex(),
        "match_id": match_id,
        "timestamp": snapshot.timestamp.to_chrono().to_rfc3339(),
    })))
}

// GET /api/snapshots/:match_id
pub async fn get_match_snapshots(
    State(state): State<AppState>,
    Path(match_id): Path<i64>,
) -> Json<Vec<LiveStats>> {
    let rows = state
        .collector
        .snapshots_for(match_id)
        .iter()
        .map(LiveStats::from)
        .collect();
    Json(rows)
}
