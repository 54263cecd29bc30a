pub mod predictions;
pub mod snapshots;
