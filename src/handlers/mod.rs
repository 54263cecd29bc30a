pub(crate) mod predictions;
pub(crate) mod snapshots;
