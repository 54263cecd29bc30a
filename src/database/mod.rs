pub mod connection;
pub mod snapshot_store;
