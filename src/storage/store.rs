// ChainStore - Persistent key-value storage using sled
//
// Provides typed access for storing:
// - The chain snapshot (ledgers, crowdsale, event log)
// - The deployment config

use crate::chain::Chain;
use crate::config::ChainConfig;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Key names for organizing data
mod keys {
    pub const CHAIN: &[u8] = b"chain:snapshot";
    pub const CONFIG: &[u8] = b"config:chain";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of keys in the database
    pub key_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Persistent store for the deployed chain
///
/// Uses sled for crash-safe, embedded storage. Each save replaces the whole
/// snapshot in a single insert, so a reader never sees half an operation.
#[derive(Clone)]
pub struct ChainStore {
    db: sled::Db,
}

impl ChainStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Open a throwaway store that lives only in memory
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }

    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    // ========================================================================
    // CHAIN PERSISTENCE
    // ========================================================================

    /// Check whether a chain has been deployed into this store
    pub fn has_chain(&self) -> Result<bool, StoreError> {
        Ok(self.db.contains_key(keys::CHAIN)?)
    }

    /// Save the chain snapshot
    pub fn save_chain(&self, chain: &Chain) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(chain)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        debug!(bytes = bytes.len(), events = chain.events().len(), "saving chain snapshot");
        self.put_raw(keys::CHAIN, &bytes)
    }

    /// Load the chain snapshot
    pub fn load_chain(&self) -> Result<Option<Chain>, StoreError> {
        match self.get_raw(keys::CHAIN)? {
            Some(bytes) => {
                let chain = postcard::from_bytes(&bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(chain))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // CONFIG PERSISTENCE
    // ========================================================================

    /// Save the config the chain was deployed with
    pub fn save_config(&self, config: &ChainConfig) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(config)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.put_raw(keys::CONFIG, &bytes)
    }

    /// Load the deployment config
    pub fn load_config(&self) -> Result<Option<ChainConfig>, StoreError> {
        match self.get_raw(keys::CONFIG)? {
            Some(bytes) => {
                let config = postcard::from_bytes(&bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }
}
