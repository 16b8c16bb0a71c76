// Chain Service Tests
// Serialized access through cloned handles, persistence and shutdown

use spacecoin::account::units::whole;
use spacecoin::account::Address;
use spacecoin::chain::{Chain, ChainError};
use spacecoin::config::ChainConfig;
use spacecoin::crowdsale::{CrowdsaleError, Stage};
use spacecoin::service::{ChainService, ServiceError, SnapshotSink};
use spacecoin::storage::{ChainStore, StoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn deployer() -> Address {
    Address::from_label("deployer")
}

fn new_chain() -> Chain {
    Chain::deploy(deployer(), Address::from_label("treasury"), Vec::new(), &ChainConfig::default()).unwrap()
}

// ============================================================================
// BASIC OPERATIONS
// ============================================================================

#[tokio::test]
async fn test_mutate_and_query() {
    let handle = ChainService::spawn(new_chain(), None);
    let addr1 = Address::from_label("addr1");

    assert_eq!(handle.fund(addr1, whole(10)).await.unwrap(), whole(10));
    handle.advance_stage(deployer(), Stage::General).await.unwrap();
    handle.buy_tokens(addr1, whole(4)).await.unwrap();

    let (stage, raised) = handle
        .query(|chain| (chain.crowdsale().stage(), chain.crowdsale().total_raised()))
        .await
        .unwrap();
    assert_eq!(stage, Stage::General);
    assert_eq!(raised, whole(4));

    let chain = handle.shutdown().await.unwrap();
    assert_eq!(chain.native_balance(&addr1), whole(6));
}

#[tokio::test]
async fn test_errors_come_back_as_chain_errors() {
    let handle = ChainService::spawn(new_chain(), None);
    let stranger = Address::from_label("stranger");

    let err = handle.advance_stage(stranger, Stage::Open).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Chain(ChainError::Crowdsale(CrowdsaleError::NotOwner))
    ));

    let err = handle.claim_token(stranger).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Chain(ChainError::Crowdsale(CrowdsaleError::WrongStageForClaim { .. }))
    ));

    // The service keeps running after a rejected call
    handle.advance_stage(deployer(), Stage::Open).await.unwrap();
}

#[tokio::test]
async fn test_handle_fails_after_shutdown() {
    let handle = ChainService::spawn(new_chain(), None);
    let other = handle.clone();

    handle.shutdown().await.unwrap();

    let err = other.query(|chain| chain.events().len()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Closed));
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_concurrent_buys_respect_aggregate_cap() {
    let handle = ChainService::spawn(new_chain(), None);
    handle.advance_stage(deployer(), Stage::General).await.unwrap();

    // 40 buyers at the general cap: only 30 fit under the 30,000 limit
    let buyers: Vec<Address> = (0..40).map(|i| Address::from_label(&format!("buyer-{}", i))).collect();
    for buyer in &buyers {
        handle.fund(*buyer, whole(1_000)).await.unwrap();
    }

    let mut tasks = Vec::new();
    for buyer in buyers.clone() {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move { handle.buy_tokens(buyer, whole(1_000)).await }));
    }

    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 30);

    let chain = handle.shutdown().await.unwrap();
    let sale = chain.crowdsale();
    assert_eq!(sale.total_raised(), whole(30_000));

    let sum: u128 = buyers.iter().map(|b| sale.contributions(b)).sum();
    assert_eq!(sum, sale.total_raised());
    assert_eq!(chain.native_balance(&chain.crowdsale_address()), whole(30_000));
}

#[tokio::test]
async fn test_concurrent_claims_each_pay_once() {
    let handle = ChainService::spawn(new_chain(), None);
    handle.advance_stage(deployer(), Stage::Open).await.unwrap();

    let addr1 = Address::from_label("addr1");
    handle.fund(addr1, whole(10)).await.unwrap();
    handle.buy_tokens(addr1, whole(10)).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move { handle.claim_token(addr1).await }));
    }

    let mut paid = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            paid += 1;
        }
    }
    assert_eq!(paid, 1);

    let balance = handle.query(move |chain| chain.token_balance(&addr1)).await.unwrap();
    assert_eq!(balance, whole(50));
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[tokio::test]
async fn test_successful_mutations_are_snapshotted() {
    let store = ChainStore::temporary().unwrap();
    let handle = ChainService::spawn(new_chain(), Some(store.clone()));
    let addr1 = Address::from_label("addr1");

    handle.fund(addr1, whole(3)).await.unwrap();

    let saved = store.load_chain().unwrap().unwrap();
    assert_eq!(saved.native_balance(&addr1), whole(3));

    // A rejected call does not write a new snapshot
    let events_saved = saved.events().len();
    handle
        .mutate(move |chain| chain.toggle_take_fee(addr1))
        .await
        .unwrap_err();
    assert_eq!(store.load_chain().unwrap().unwrap().events().len(), events_saved);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queries_do_not_write() {
    let store = ChainStore::temporary().unwrap();
    let handle = ChainService::spawn(new_chain(), Some(store.clone()));

    handle.query(|chain| chain.events().len()).await.unwrap();
    assert!(!store.has_chain().unwrap());

    handle.shutdown().await.unwrap();
}

/// Sink whose writes fail while `failing` is set
struct FlakySink {
    failing: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl SnapshotSink for FlakySink {
    fn save(&self, _chain: &Chain) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::DatabaseError("disk full".into()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_snapshot_rolls_back_mutation() {
    let failing = Arc::new(AtomicBool::new(false));
    let saves = Arc::new(AtomicUsize::new(0));
    let sink = FlakySink {
        failing: failing.clone(),
        saves: saves.clone(),
    };
    let handle = ChainService::spawn_with_sink(new_chain(), sink);
    let addr1 = Address::from_label("addr1");

    handle.fund(addr1, whole(10)).await.unwrap();
    handle.advance_stage(deployer(), Stage::General).await.unwrap();
    assert_eq!(saves.load(Ordering::SeqCst), 2);

    failing.store(true, Ordering::SeqCst);
    let events_before = handle.query(|chain| chain.events().len()).await.unwrap();

    let err = handle.buy_tokens(addr1, whole(4)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::DatabaseError(_))));

    let (raised, native, custody, events) = handle
        .query(move |chain| {
            (
                chain.crowdsale().total_raised(),
                chain.native_balance(&addr1),
                chain.native_balance(&chain.crowdsale_address()),
                chain.events().len(),
            )
        })
        .await
        .unwrap();
    assert_eq!(raised, 0);
    assert_eq!(native, whole(10));
    assert_eq!(custody, 0);
    assert_eq!(events, events_before);

    // Once writes recover the same purchase goes through
    failing.store(false, Ordering::SeqCst);
    assert_eq!(handle.buy_tokens(addr1, whole(4)).await.unwrap(), whole(4));

    let chain = handle.shutdown().await.unwrap();
    assert_eq!(chain.crowdsale().total_raised(), whole(4));
}
