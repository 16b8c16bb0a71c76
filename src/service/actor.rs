// Chain actor
//
// The chain lives inside one tokio task. Every call is sent over an mpsc
// channel and executed to completion before the next one starts, giving
// concurrent callers the same total order a single writer would.

use crate::account::{Address, Amount};
use crate::chain::{Chain, ChainError};
use crate::crowdsale::{Claim, Stage};
use crate::storage::{ChainStore, StoreError};
use crate::token::TaxSplit;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Errors returned through a [`ChainHandle`]
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Snapshot failed, operation rolled back: {0}")]
    Store(#[from] StoreError),

    #[error("Chain service has stopped")]
    Closed,
}

/// Where the service writes the chain after each accepted mutation
pub trait SnapshotSink: Send + 'static {
    fn save(&self, chain: &Chain) -> Result<(), StoreError>;

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl SnapshotSink for ChainStore {
    fn save(&self, chain: &Chain) -> Result<(), StoreError> {
        self.save_chain(chain)
    }

    fn flush(&self) -> Result<(), StoreError> {
        ChainStore::flush(self)
    }
}

type Sink = Box<dyn SnapshotSink>;
type Job = Box<dyn FnOnce(&mut Chain, Option<&dyn SnapshotSink>) + Send>;

enum Command {
    Run(Job),
    Shutdown(oneshot::Sender<Chain>),
}

/// Owns the chain and applies queued operations one at a time
pub struct ChainService {
    chain: Chain,
    sink: Option<Sink>,
    commands: mpsc::Receiver<Command>,
}

impl ChainService {
    /// Start the service on the current tokio runtime
    ///
    /// With a store attached, every successful mutation is snapshotted before
    /// its caller is answered.
    pub fn spawn(chain: Chain, store: Option<ChainStore>) -> ChainHandle {
        Self::start(chain, store.map(|store| Box::new(store) as Sink))
    }

    /// Start the service with a custom snapshot destination
    pub fn spawn_with_sink<S: SnapshotSink>(chain: Chain, sink: S) -> ChainHandle {
        Self::start(chain, Some(Box::new(sink)))
    }

    fn start(chain: Chain, sink: Option<Sink>) -> ChainHandle {
        let (tx, rx) = mpsc::channel(256);
        let service = ChainService {
            chain,
            sink,
            commands: rx,
        };

        tokio::spawn(service.run());
        ChainHandle { commands: tx }
    }

    async fn run(mut self) {
        info!(persistent = self.sink.is_some(), "chain service started");

        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Run(job) => job(&mut self.chain, self.sink.as_deref()),
                Command::Shutdown(reply) => {
                    if let Some(sink) = &self.sink {
                        if let Err(e) = sink.flush() {
                            error!(error = %e, "flush on shutdown failed");
                        }
                    }
                    let _ = reply.send(self.chain);
                    info!("chain service stopped");
                    return;
                }
            }
        }

        debug!("all chain handles dropped");
    }
}

/// Cloneable handle for submitting operations to a [`ChainService`]
#[derive(Clone)]
pub struct ChainHandle {
    commands: mpsc::Sender<Command>,
}

impl ChainHandle {
    /// Apply a mutation; snapshot the chain afterwards if it succeeded
    ///
    /// If the snapshot cannot be written the mutation is undone, so an error
    /// from this call always means the chain is unchanged.
    pub async fn mutate<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Chain) -> Result<T, ChainError> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |chain: &mut Chain, sink: Option<&dyn SnapshotSink>| {
            let result = match sink {
                None => op(chain).map_err(ServiceError::from),
                Some(sink) => {
                    let before = chain.clone();
                    match op(chain) {
                        Ok(value) => match sink.save(&*chain) {
                            Ok(()) => Ok(value),
                            Err(e) => {
                                warn!(error = %e, "snapshot failed, rolling back");
                                *chain = before;
                                Err(ServiceError::from(e))
                            }
                        },
                        Err(e) => Err(ServiceError::from(e)),
                    }
                }
            };
            let _ = reply_tx.send(result);
        });

        self.submit(job).await?;
        reply_rx.await.map_err(|_| ServiceError::Closed)?
    }

    /// Read from the chain without changing it
    pub async fn query<T, F>(&self, read: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Chain) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |chain: &mut Chain, _: Option<&dyn SnapshotSink>| {
            let _ = reply_tx.send(read(&*chain));
        });

        self.submit(job).await?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }

    /// Stop the service and take back the chain
    pub async fn shutdown(self) -> Result<Chain, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Shutdown(reply_tx))
            .await
            .map_err(|_| ServiceError::Closed)?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }

    async fn submit(&self, job: Job) -> Result<(), ServiceError> {
        self.commands
            .send(Command::Run(job))
            .await
            .map_err(|_| ServiceError::Closed)
    }

    // ========================================================================
    // CONVENIENCE WRAPPERS
    // ========================================================================

    pub async fn fund(&self, account: Address, amount: Amount) -> Result<Amount, ServiceError> {
        self.mutate(move |chain| chain.fund(account, amount)).await
    }

    pub async fn buy_tokens(&self, sender: Address, value: Amount) -> Result<Amount, ServiceError> {
        self.mutate(move |chain| chain.buy_tokens(sender, value)).await
    }

    pub async fn claim_token(&self, sender: Address) -> Result<Claim, ServiceError> {
        self.mutate(move |chain| chain.claim_token(sender)).await
    }

    pub async fn withdraw_funds(&self, sender: Address) -> Result<Amount, ServiceError> {
        self.mutate(move |chain| chain.withdraw_funds(sender)).await
    }

    pub async fn advance_stage(&self, sender: Address, target: Stage) -> Result<(), ServiceError> {
        self.mutate(move |chain| chain.advance_stage(sender, target)).await
    }

    pub async fn transfer(&self, sender: Address, to: Address, amount: Amount) -> Result<TaxSplit, ServiceError> {
        self.mutate(move |chain| chain.transfer(sender, to, amount)).await
    }
}
