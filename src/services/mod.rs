pub mod completion;
pub mod orchestrator;
pub mod prediction_scorer;
pub mod push_service;
pub mod result_cache;
pub mod snapshot_collector;
pub mod timeline;
