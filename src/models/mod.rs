pub mod prediction;
pub mod snapshot;
