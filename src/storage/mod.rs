// Storage module - PERSISTENCE
// Snapshots of the deployed chain in a sled key-value store

mod store;

pub use store::{ChainStore, StorageStats, StoreError};
