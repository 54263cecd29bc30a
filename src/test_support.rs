// In-memory doubles for the store, cache and push seams.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bson::DateTime as BsonDateTime;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::database::snapshot_store::SnapshotStore;
use crate::errors::{AppError, Result};
use crate::models::snapshot::{MatchSnapshot, ObservedState, PredictionData, TeamStat};
use crate::services::push_service::PushPublisher;

pub fn observed(played_time: &str, score: &str) -> ObservedState {
    ObservedState {
        score: score.to_string(),
        played_time: Some(played_time.to_string()),
        ..Default::default()
    }
}

/// Snapshot stamped `offset_secs` after a kickoff three hours ago.
pub fn snapshot_at(match_id: i64, offset_secs: i64, played_time: &str, score: &str) -> MatchSnapshot {
    let kickoff = Utc::now().timestamp_millis() - 3 * 60 * 60 * 1000;
    let mut state = observed(played_time, score);
    state.match_details.corners = TeamStat::new(offset_secs as i32 / 600, 0);
    MatchSnapshot::from_observed(
        match_id,
        state,
        BsonDateTime::from_millis(kickoff + offset_secs * 1000),
    )
}

pub fn prediction(favorite: &str, expected_goals: f64) -> PredictionData {
    PredictionData {
        home_team: "Home FC".to_string(),
        away_team: "Away United".to_string(),
        favorite: favorite.to_string(),
        confidence: 0.62,
        expected_goals,
        home_win_probability: None,
        draw_probability: None,
        away_win_probability: None,
    }
}

/// Kickoff, half time and a finished final snapshot.
pub fn completed_match(match_id: i64, favorite: &str, expected_goals: f64, final_score: &str) -> Vec<MatchSnapshot> {
    let mut kickoff = snapshot_at(match_id, 0, "0:00", "0:0");
    kickoff.prediction_data = Some(prediction(favorite, expected_goals));
    let half_time = snapshot_at(match_id, 2700, "45:00", "1:0");
    let mut full_time = snapshot_at(match_id, 5700, "90+3:00", final_score);
    full_time.match_status = Some("Match Ended".to_string());
    vec![kickoff, half_time, full_time]
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<Vec<MatchSnapshot>>,
    insert_batches: Mutex<Vec<usize>>,
    match_queries: Mutex<HashMap<i64, usize>>,
    range_queries: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    insert_delay_ms: u64,
    failing_inserts: AtomicBool,
    failing_ranges: AtomicBool,
    failing_matches: Mutex<HashSet<i64>>,
    cancel_on_history_read: Mutex<Option<CancellationToken>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert_delay_ms(mut self, delay: u64) -> Self {
        self.insert_delay_ms = delay;
        self
    }

    pub fn seed(&self, snapshots: Vec<MatchSnapshot>) {
        self.snapshots.lock().extend(snapshots);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.failing_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_range_queries(&self, fail: bool) {
        self.failing_ranges.store(fail, Ordering::SeqCst);
    }

    pub fn fail_match(&self, match_id: i64) {
        self.failing_matches.lock().insert(match_id);
    }

    /// Cancels `token` as soon as any match history is read.
    pub fn cancel_on_history_read(&self, token: CancellationToken) {
        *self.cancel_on_history_read.lock() = Some(token);
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn insert_batch_sizes(&self) -> Vec<usize> {
        self.insert_batches.lock().clone()
    }

    pub fn max_concurrent_inserts(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn range_queries(&self) -> usize {
        self.range_queries.load(Ordering::SeqCst)
    }

    pub fn match_queries(&self) -> usize {
        self.match_queries.lock().values().sum()
    }

    pub fn match_queries_for(&self, match_id: i64) -> usize {
        self.match_queries.lock().get(&match_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn insert_many(&self, snapshots: &[MatchSnapshot]) -> Result<()> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if self.insert_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.insert_delay_ms)).await;
        }

        let outcome = if self.failing_inserts.load(Ordering::SeqCst) {
            Err(AppError::service("store unreachable"))
        } else {
            self.insert_batches.lock().push(snapshots.len());
            self.snapshots.lock().extend_from_slice(snapshots);
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn find_by_match_id(&self, match_id: i64) -> Result<Vec<MatchSnapshot>> {
        *self.match_queries.lock().entry(match_id).or_insert(0) += 1;
        if let Some(token) = self.cancel_on_history_read.lock().as_ref() {
            token.cancel();
        }
        if self.failing_matches.lock().contains(&match_id) {
            return Err(AppError::service(format!("history of match {} unavailable", match_id)));
        }

        let mut found: Vec<MatchSnapshot> = self
            .snapshots
            .lock()
            .iter()
            .filter(|s| s.match_id == match_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.timestamp);
        Ok(found)
    }

    async fn find_by_time_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<MatchSnapshot>> {
        self.range_queries.fetch_add(1, Ordering::SeqCst);
        if self.failing_ranges.load(Ordering::SeqCst) {
            return Err(AppError::service("store unreachable"));
        }

        let start = start.map(|s| s.timestamp_millis()).unwrap_or(i64::MIN);
        let end = end.map(|e| e.timestamp_millis()).unwrap_or(i64::MAX);
        let mut found: Vec<MatchSnapshot> = self
            .snapshots
            .lock()
            .iter()
            .filter(|s| (start..=end).contains(&s.timestamp.timestamp_millis()))
            .cloned()
            .collect();
        found.sort_by_key(|s| s.timestamp);
        Ok(found)
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Value)>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl PushPublisher for RecordingPublisher {
    async fn publish(&self, event_name: &str, payload: Value) -> Result<()> {
        if self.fail {
            return Err(AppError::external_api("push target offline"));
        }
        self.published.lock().push((event_name.to_string(), payload));
        Ok(())
    }
}

pub fn test_config() -> crate::config::AppConfig {
    crate::config::AppConfig {
        database_url: "mongodb://localhost:27017".to_string(),
        database_name: "match_telemetry_test".to_string(),
        redis_url: None,
        push_webhook_url: None,
        snapshot_retention_days: 30,
        flush_batch_size: 100,
        processing_chunk_size: 5,
        lookback_hours: 24,
        result_cache_ttl_secs: 300,
        processing_interval_secs: 600,
        port: 0,
        host: "127.0.0.1".to_string(),
    }
}

/// Application state wired to in-memory collaborators.
pub fn test_state() -> crate::state::AppState {
    use crate::services::orchestrator::{OrchestratorSettings, PredictionOrchestrator};
    use crate::services::push_service::BroadcastHub;
    use crate::services::result_cache::InMemoryResultCache;
    use crate::services::snapshot_collector::SnapshotCollector;
    use std::sync::Arc;

    let store = Arc::new(InMemorySnapshotStore::new());
    let hub = Arc::new(BroadcastHub::new());
    let collector = Arc::new(SnapshotCollector::new(store.clone(), 100));
    let orchestrator = Arc::new(PredictionOrchestrator::new(
        store,
        Arc::new(InMemoryResultCache::new()),
        hub.clone(),
        OrchestratorSettings::default(),
    ));
    crate::state::AppState::new(test_config(), collector, orchestrator, hub)
}
