// src/services/orchestrator.rs
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::database::snapshot_store::SnapshotStore;
use crate::errors::Result;
use crate::models::prediction::{PredictionResult, PredictionResultsPayload};
use crate::services::completion::is_completed;
use crate::services::prediction_scorer;
use crate::services::push_service::{PushPublisher, PREDICTION_RESULTS_EVENT};
use crate::services::result_cache::{self, ResultCache, PREDICTION_RESULTS_KEY};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub chunk_size: usize,
    pub lookback: Duration,
    pub cache_ttl: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            lookback: Duration::from_secs(24 * 60 * 60),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Outcome of one processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed_matches: usize,
    pub chunk_sizes: Vec<usize>,
    pub results: usize,
    pub cancelled: bool,
}

pub struct PredictionOrchestrator {
    store: Arc<dyn SnapshotStore>,
    cache: Arc<dyn ResultCache>,
    publisher: Arc<dyn PushPublisher>,
    settings: OrchestratorSettings,
}

impl PredictionOrchestrator {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        cache: Arc<dyn ResultCache>,
        publisher: Arc<dyn PushPublisher>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
            settings: OrchestratorSettings {
                chunk_size: settings.chunk_size.max(1),
                ..settings
            },
        }
    }

    /// Scores every match that completed inside the lookback window, caches
    /// the results and pushes them to subscribers. Never fails; problems are
    /// logged and the run degrades to whatever could be produced.
    pub async fn run_once(&self, lookback: Duration, cancel: &CancellationToken) -> RunSummary {
        let started = std::time::Instant::now();
        let mut summary = RunSummary::default();

        let match_ids = match self.completed_match_ids(lookback).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "❌ Failed to load recent snapshots");
                return summary;
            }
        };
        summary.completed_matches = match_ids.len();
        tracing::info!(completed = match_ids.len(), "🔍 Completed matches found in lookback window");

        let mut results: Vec<PredictionResult> = Vec::new();
        for (chunk_index, chunk) in match_ids.chunks(self.settings.chunk_size).enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(chunk = chunk_index, "Processing cancelled between chunks");
                summary.cancelled = true;
                break;
            }

            summary.chunk_sizes.push(chunk.len());
            results.extend(self.process_chunk(chunk_index, chunk).await);
        }
        summary.results = results.len();

        if !results.is_empty() {
            self.cache_and_publish(results).await;
        }

        tracing::info!(
            results = summary.results,
            chunks = summary.chunk_sizes.len(),
            elapsed = ?started.elapsed(),
            "✅ Prediction processing run finished"
        );
        summary
    }

    /// Cached results, or the outcome of a fresh run when nothing is cached.
    pub async fn get_results(&self) -> Vec<PredictionResult> {
        if let Some(cached) = self.cached_results().await {
            if !cached.is_empty() {
                return cached;
            }
        }

        self.run_once(self.settings.lookback, &CancellationToken::new()).await;
        self.cached_results().await.unwrap_or_default()
    }

    /// Runs `run_once` on a fixed interval until `cancel` fires.
    pub fn spawn_scheduler(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Prediction scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.run_once(self.settings.lookback, &cancel).await;
                    }
                }
            }
        })
    }

    async fn completed_match_ids(&self, lookback: Duration) -> Result<Vec<i64>> {
        let now = Utc::now();
        let window = chrono::Duration::from_std(lookback).unwrap_or_else(|_| chrono::Duration::days(1));
        let recent = self.store.find_by_time_range(Some(now - window), Some(now)).await?;

        let ids: BTreeSet<i64> = recent
            .iter()
            .filter(|snapshot| is_completed(snapshot))
            .map(|snapshot| snapshot.match_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn process_chunk(&self, chunk_index: usize, chunk: &[i64]) -> Vec<PredictionResult> {
        let tasks: Vec<(i64, JoinHandle<Option<PredictionResult>>)> = chunk
            .iter()
            .map(|&match_id| {
                let store = Arc::clone(&self.store);
                (match_id, tokio::spawn(score_match(store, match_id)))
            })
            .collect();

        let mut results = Vec::with_capacity(chunk.len());
        for (match_id, task) in tasks {
            match task.await {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(chunk = chunk_index, match_id, error = %e, "❌ Match processing task failed");
                }
            }
        }

        tracing::debug!(chunk = chunk_index, size = chunk.len(), scored = results.len(), "Chunk processed");
        results
    }

    async fn cache_and_publish(&self, results: Vec<PredictionResult>) {
        if let Err(e) = result_cache::set_json(
            self.cache.as_ref(),
            PREDICTION_RESULTS_KEY,
            &results,
            self.settings.cache_ttl,
        )
        .await
        {
            tracing::error!(error = %e, "❌ Failed to cache prediction results");
        }

        let payload = PredictionResultsPayload {
            results,
            last_updated_timestamp: Utc::now(),
        };
        let payload = match serde_json::to_value(&payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "❌ Failed to encode prediction results");
                return;
            }
        };

        if let Err(e) = self.publisher.publish(PREDICTION_RESULTS_EVENT, payload).await {
            tracing::error!(error = %e, "❌ Failed to publish prediction results");
        }
    }

    async fn cached_results(&self) -> Option<Vec<PredictionResult>> {
        match result_cache::get_json(self.cache.as_ref(), PREDICTION_RESULTS_KEY).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached prediction results");
                None
            }
        }
    }
}

async fn score_match(store: Arc<dyn SnapshotStore>, match_id: i64) -> Option<PredictionResult> {
    // Full history: a match may have started before the lookback window
    match store.find_by_match_id(match_id).await {
        Ok(snapshots) => prediction_scorer::score(&snapshots),
        Err(e) => {
            tracing::error!(match_id, error = %e, "❌ Failed to load match history");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::result_cache::InMemoryResultCache;
    use crate::test_support::{completed_match, InMemorySnapshotStore, RecordingPublisher};

    struct Harness {
        store: Arc<InMemorySnapshotStore>,
        cache: Arc<InMemoryResultCache>,
        publisher: Arc<RecordingPublisher>,
        orchestrator: PredictionOrchestrator,
    }

    fn harness(store: InMemorySnapshotStore, publisher: RecordingPublisher) -> Harness {
        let store = Arc::new(store);
        let cache = Arc::new(InMemoryResultCache::new());
        let publisher = Arc::new(publisher);
        let orchestrator = PredictionOrchestrator::new(
            store.clone(),
            cache.clone(),
            publisher.clone(),
            OrchestratorSettings::default(),
        );
        Harness {
            store,
            cache,
            publisher,
            orchestrator,
        }
    }

    fn store_with_matches(count: i64) -> InMemorySnapshotStore {
        let store = InMemorySnapshotStore::new();
        for match_id in 1..=count {
            store.seed(completed_match(match_id, "home", 2.4, "2:1"));
        }
        store
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[tokio::test]
    async fn thirteen_matches_run_in_chunks_of_five() {
        let h = harness(store_with_matches(13), RecordingPublisher::new());

        let summary = h.orchestrator.run_once(DAY, &CancellationToken::new()).await;

        assert_eq!(summary.completed_matches, 13);
        assert_eq!(summary.chunk_sizes, vec![5, 5, 3]);
        assert_eq!(summary.results, 13);
        assert_eq!(h.store.range_queries(), 1);
        assert_eq!(h.store.match_queries(), 13);
        for match_id in 1..=13 {
            assert_eq!(h.store.match_queries_for(match_id), 1);
        }
    }

    #[tokio::test]
    async fn results_are_cached_and_published() {
        let h = harness(store_with_matches(2), RecordingPublisher::new());

        h.orchestrator.run_once(DAY, &CancellationToken::new()).await;

        let cached: Vec<PredictionResult> = result_cache::get_json(h.cache.as_ref(), PREDICTION_RESULTS_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.len(), 2);

        let published = h.publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, PREDICTION_RESULTS_EVENT);
        assert_eq!(published[0].1["results"].as_array().unwrap().len(), 2);
        assert!(published[0].1.get("lastUpdatedTimestamp").is_some());
    }

    #[tokio::test]
    async fn publish_failure_keeps_cache_write() {
        let h = harness(store_with_matches(1), RecordingPublisher::failing());

        let summary = h.orchestrator.run_once(DAY, &CancellationToken::new()).await;

        assert_eq!(summary.results, 1);
        assert!(h.cache.try_get(PREDICTION_RESULTS_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failing_match_does_not_sink_its_chunk() {
        let store = store_with_matches(4);
        store.fail_match(2);
        let h = harness(store, RecordingPublisher::new());

        let summary = h.orchestrator.run_once(DAY, &CancellationToken::new()).await;

        assert_eq!(summary.completed_matches, 4);
        assert_eq!(summary.results, 3);
    }

    #[tokio::test]
    async fn unscorable_matches_are_skipped() {
        let store = store_with_matches(1);
        store.seed(completed_match(50, "home", 1.0, "abc"));
        let h = harness(store, RecordingPublisher::new());

        let summary = h.orchestrator.run_once(DAY, &CancellationToken::new()).await;

        assert_eq!(summary.completed_matches, 2);
        assert_eq!(summary.results, 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_next_chunk() {
        let h = harness(store_with_matches(7), RecordingPublisher::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = h.orchestrator.run_once(DAY, &cancel).await;

        assert!(summary.cancelled);
        assert!(summary.chunk_sizes.is_empty());
        assert_eq!(h.store.match_queries(), 0);
        assert!(h.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn cancellation_mid_run_finishes_current_chunk_only() {
        let store = store_with_matches(13);
        let cancel = CancellationToken::new();
        store.cancel_on_history_read(cancel.clone());
        let h = harness(store, RecordingPublisher::new());

        let summary = h.orchestrator.run_once(DAY, &cancel).await;

        assert!(summary.cancelled);
        assert_eq!(summary.completed_matches, 13);
        assert_eq!(summary.chunk_sizes, vec![5]);
        assert_eq!(summary.results, 5);
        assert_eq!(h.store.match_queries(), 5);

        let published = h.publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1["results"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn no_completed_matches_leaves_cache_untouched() {
        let h = harness(InMemorySnapshotStore::new(), RecordingPublisher::new());

        let summary = h.orchestrator.run_once(DAY, &CancellationToken::new()).await;

        assert_eq!(summary, RunSummary::default());
        assert!(h.cache.try_get(PREDICTION_RESULTS_KEY).await.unwrap().is_none());
        assert!(h.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn store_outage_is_contained() {
        let store = store_with_matches(3);
        store.fail_range_queries(true);
        let h = harness(store, RecordingPublisher::new());

        let summary = h.orchestrator.run_once(DAY, &CancellationToken::new()).await;
        assert_eq!(summary.completed_matches, 0);
    }

    #[tokio::test]
    async fn get_results_runs_once_when_cache_is_empty() {
        let h = harness(store_with_matches(3), RecordingPublisher::new());

        let first = h.orchestrator.get_results().await;
        assert_eq!(first.len(), 3);
        assert_eq!(h.store.range_queries(), 1);

        let second = h.orchestrator.get_results().await;
        assert_eq!(second.len(), 3);
        assert_eq!(h.store.range_queries(), 1);
    }

    #[tokio::test]
    async fn get_results_with_nothing_to_score_is_empty() {
        let h = harness(InMemorySnapshotStore::new(), RecordingPublisher::new());
        assert!(h.orchestrator.get_results().await.is_empty());
    }

    #[tokio::test]
    async fn scheduler_stops_on_cancellation() {
        let h = harness(store_with_matches(1), RecordingPublisher::new());
        let orchestrator = Arc::new(h.orchestrator);
        let cancel = CancellationToken::new();

        let handle = orchestrator
            .clone()
            .spawn_scheduler(Duration::from_secs(3600), cancel.clone());
        // The first tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(h.store.range_queries(), 1);
    }
}
