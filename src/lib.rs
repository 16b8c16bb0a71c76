// SpaceCoin - staged crowdsale with a transfer-taxed token
//
// account   - addresses and base-unit amounts
// token     - fixed-supply token ledger with an optional treasury tax
// crowdsale - stage machine, caps, whitelist, claims and withdrawals
// chain     - the transactional boundary composing both ledgers
// config    - deployment parameters
// storage   - sled-backed snapshots
// service   - single-writer actor for concurrent callers

pub mod account;
pub mod chain;
pub mod config;
pub mod crowdsale;
pub mod service;
pub mod storage;
pub mod token;
