// Chain module - THE TRANSACTIONAL BOUNDARY
// Owns both ledgers and the crowdsale; every call is applied all-or-nothing

mod events;
mod native;
mod runtime;

pub use events::{Contract, Event, EventRecord};
pub use native::{NativeError, NativeLedger};
pub use runtime::{Chain, ChainError};
