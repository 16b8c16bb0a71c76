// Service module - SERIALIZED ACCESS
// A single task owns the chain; callers queue operations through a handle

mod actor;

pub use actor::{ChainHandle, ChainService, ServiceError, SnapshotSink};
