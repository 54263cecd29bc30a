// src/services/snapshot_collector.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bson::DateTime as BsonDateTime;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::database::snapshot_store::{SnapshotStore, MAX_INSERT_BATCH};
use crate::models::snapshot::{MatchSnapshot, ObservedState};
use crate::services::completion::is_completed;

type MatchSeries = Arc<Mutex<Vec<MatchSnapshot>>>;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CollectorStats {
    pub recorded: u64,
    pub flushed: u64,
    pub failed: u64,
    pub tracked_matches: usize,
}

#[derive(Default)]
struct Counters {
    recorded: AtomicU64,
    flushed: AtomicU64,
    failed: AtomicU64,
}

/// Accumulates live snapshots per match and persists them in the background.
///
/// Each match owns an append-only series behind its own lock. Every recorded
/// snapshot is also pushed onto one shared persistence queue, held only for
/// the push, and the queue is drained by one flush at a time.
pub struct SnapshotCollector {
    store: Arc<dyn SnapshotStore>,
    series: DashMap<i64, MatchSeries>,
    pending: Mutex<Vec<MatchSnapshot>>,
    flush_gate: tokio::sync::Mutex<()>,
    batch_size: usize,
    counters: Counters,
}

impl SnapshotCollector {
    pub fn new(store: Arc<dyn SnapshotStore>, batch_size: usize) -> Self {
        Self {
            store,
            series: DashMap::new(),
            pending: Mutex::new(Vec::new()),
            flush_gate: tokio::sync::Mutex::new(()),
            batch_size: batch_size.clamp(1, MAX_INSERT_BATCH),
            counters: Counters::default(),
        }
    }

    /// Records the observed state of a match and schedules a background flush.
    pub fn record_snapshot(self: &Arc<Self>, match_id: i64, observed: ObservedState) -> MatchSnapshot {
        self.record_at(match_id, observed, BsonDateTime::now())
    }

    pub(crate) fn record_at(
        self: &Arc<Self>,
        match_id: i64,
        observed: ObservedState,
        timestamp: BsonDateTime,
    ) -> MatchSnapshot {
        let snapshot = MatchSnapshot::from_observed(match_id, observed, timestamp);

        let series = self.series.entry(match_id).or_default().value().clone();
        series.lock().push(snapshot.clone());
        self.pending.lock().push(snapshot.clone());
        self.counters.recorded.fetch_add(1, Ordering::Relaxed);

        if is_completed(&snapshot) {
            tracing::info!(match_id, "Match completed, releasing in-memory snapshots");
            self.release_match(match_id);
        }

        self.schedule_flush();
        snapshot
    }

    fn schedule_flush(self: &Arc<Self>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let collector = Arc::clone(self);
                handle.spawn(async move {
                    collector.flush_pending().await;
                });
            }
            Err(_) => {
                tracing::warn!("No async runtime available, snapshots stay queued until the next flush");
            }
        }
    }

    /// Drains queued snapshots into the store. Returns how many were persisted.
    ///
    /// Only one flush runs at a time; a failed batch is logged and dropped.
    pub async fn flush_pending(&self) -> usize {
        let _gate = self.flush_gate.lock().await;

        let queued = std::mem::take(&mut *self.pending.lock());
        if queued.is_empty() {
            return 0;
        }

        let mut persisted = 0;
        for (index, batch) in queued.chunks(self.batch_size).enumerate() {
            match self.store.insert_many(batch).await {
                Ok(()) => {
                    persisted += batch.len();
                    self.counters.flushed.fetch_add(batch.len() as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.failed.fetch_add(batch.len() as u64, Ordering::Relaxed);
                    tracing::error!(batch = index, size = batch.len(), error = %e, "❌ Snapshot flush failed, batch dropped");
                }
            }
        }

        tracing::debug!(persisted, queued = queued.len(), "Snapshot flush finished");
        persisted
    }

    /// Point-in-time copy of a match's snapshots, oldest first.
    pub fn snapshots_for(&self, match_id: i64) -> Vec<MatchSnapshot> {
        let Some(series) = self.series.get(&match_id).map(|entry| entry.value().clone()) else {
            return Vec::new();
        };
        let mut copy = series.lock().clone();
        copy.sort_by_key(|s| s.timestamp);
        copy
    }

    pub fn tracked_matches(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.series.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn release_match(&self, match_id: i64) {
        self.series.remove(&match_id);
    }

    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            recorded: self.counters.recorded.load(Ordering::Relaxed),
            flushed: self.counters.flushed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            tracked_matches: self.series.len(),
        }
    }
}
