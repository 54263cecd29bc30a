use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::orchestrator::PredictionOrchestrator;
use crate::services::push_service::BroadcastHub;
use crate::services::snapshot_collector::SnapshotCollector;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub collector: Arc<SnapshotCollector>,
    pub orchestrator: Arc<PredictionOrchestrator>,
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        collector: Arc<SnapshotCollector>,
        orchestrator: Arc<PredictionOrchestrator>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        AppState {
            config: Arc::new(config),
            collector,
            orchestrator,
            hub,
        }
    }
}
