// src/database/snapshot_store.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::IndexOptions,
    Collection, Database, IndexModel,
};

use crate::errors::Result;
use crate::models::snapshot::MatchSnapshot;

pub const SNAPSHOT_COLLECTION: &str = "match_snapshots";

/// Maximum number of documents sent in one insert call.
pub const MAX_INSERT_BATCH: usize = 100;

/// Durable, append-only home of match snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn insert_many(&self, snapshots: &[MatchSnapshot]) -> Result<()>;

    /// All snapshots of a match, oldest first.
    async fn find_by_match_id(&self, match_id: i64) -> Result<Vec<MatchSnapshot>>;

    /// Snapshots whose timestamp lies within the (optionally open) range.
    async fn find_by_time_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<MatchSnapshot>>;
}

#[derive(Clone)]
pub struct MongoSnapshotStore {
    collection: Collection<MatchSnapshot>,
}

impl MongoSnapshotStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(SNAPSHOT_COLLECTION),
        }
    }

    /// Creates the retention (TTL) index on `timestamp` and the lookup index.
    pub async fn ensure_indexes(&self, retention: Duration) -> Result<()> {
        let ttl_index = IndexModel::builder()
            .keys(doc! { "timestamp": 1 })
            .options(
                IndexOptions::builder()
                    .name("timestamp_ttl".to_string())
                    .expire_after(retention)
                    .build(),
            )
            .build();

        let lookup_index = IndexModel::builder()
            .keys(doc! { "matchId": 1, "timestamp": 1 })
            .options(
                IndexOptions::builder()
                    .name("match_id_timestamp".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(ttl_index).await?;
        self.collection.create_index(lookup_index).await?;

        tracing::info!(
            collection = SNAPSHOT_COLLECTION,
            retention_secs = retention.as_secs(),
            "Snapshot indexes ensured"
        );
        Ok(())
    }

    async fn find_sorted(&self, filter: Document) -> Result<Vec<MatchSnapshot>> {
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "timestamp": 1 })
            .await?;
        let snapshots: Vec<MatchSnapshot> = cursor.try_collect().await?;
        Ok(snapshots)
    }
}

#[async_trait]
impl SnapshotStore for MongoSnapshotStore {
    async fn insert_many(&self, snapshots: &[MatchSnapshot]) -> Result<()> {
        for batch in snapshots.chunks(MAX_INSERT_BATCH) {
            let result = self.collection.insert_many(batch).await?;
            tracing::debug!(inserted = result.inserted_ids.len(), "Inserted snapshot batch");
        }
        Ok(())
    }

    async fn find_by_match_id(&self, match_id: i64) -> Result<Vec<MatchSnapshot>> {
        self.find_sorted(doc! { "matchId": match_id }).await
    }

    async fn find_by_time_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<MatchSnapshot>> {
        self.find_sorted(time_range_filter(start, end)).await
    }
}

fn time_range_filter(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Document {
    let mut range = doc! {};
    if let Some(start) = start {
        range.insert("$gte", BsonDateTime::from_chrono(start));
    }
    if let Some(end) = end {
        range.insert("$lte", BsonDateTime::from_chrono(end));
    }

    if range.is_empty() {
        doc! {}
    } else {
        doc! { "timestamp": range }
    }
}
