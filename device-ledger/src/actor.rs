//! Actor-based concurrency for the ledger
//!
//! Every submit transaction goes through a single Tokio task:
//! - One logical writer eliminates check-then-act races between transactions
//! - Each transaction commits atomically before its reply is sent
//! - Bounded mailbox gives backpressure to callers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Gateway (HTTP handlers)                  │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ submit(function, args)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │  reader ─▶ DeviceContract::invoke ─▶ WriteSet         │
//! │                       │                               │
//! │                       ▼                               │
//! │            WorldState::apply (atomic)                 │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Evaluate transactions bypass the actor and read a consistent snapshot.

use crate::{
    context::{TxContext, TxMode},
    contract::{DeviceContract, Function},
    error::{Error, ErrorKind, Result},
    metrics::Metrics,
    storage::WorldState,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Execute and commit a transaction
    Submit {
        function: Function,
        args: Vec<String>,
        response: oneshot::Sender<Result<Vec<u8>>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Run one transaction against `state`
///
/// On the submit path the write set is committed only when the contract
/// succeeds. On the evaluate path nothing is ever committed.
pub fn execute_transaction(
    state: &dyn WorldState,
    contract: &DeviceContract,
    metrics: &Metrics,
    function: Function,
    args: &[String],
    mode: TxMode,
) -> Result<Vec<u8>> {
    let start = Instant::now();
    let result = run_in_context(state, contract, function, args, mode);

    metrics.record_transaction(function, mode, start.elapsed().as_secs_f64());
    if let Err(ref e) = result {
        metrics.record_failure(e.kind());
        tracing::debug!(function = %function, mode = %mode, error = %e, "Transaction failed");
    }

    result
}

fn run_in_context(
    state: &dyn WorldState,
    contract: &DeviceContract,
    function: Function,
    args: &[String],
    mode: TxMode,
) -> Result<Vec<u8>> {
    let mut ctx = TxContext::new(state.reader()?, mode);
    let output = contract.invoke(&mut ctx, function, args);

    // Releases the reader before committing
    let writes = ctx.into_write_set();
    let output = output?;

    if mode == TxMode::Submit && !writes.is_empty() {
        state.apply(&writes)?;
    }
    Ok(output)
}

/// Actor that processes submit transactions
pub struct LedgerActor {
    /// World state
    state: Arc<dyn WorldState>,

    /// Contract logic
    contract: DeviceContract,

    /// Metrics
    metrics: Metrics,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Transactions processed so far
    sequence: u64,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        state: Arc<dyn WorldState>,
        contract: DeviceContract,
        metrics: Metrics,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            state,
            contract,
            metrics,
            mailbox,
            sequence: 0,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Submit {
                    function,
                    args,
                    response,
                } => {
                    self.sequence += 1;
                    let result = execute_transaction(
                        self.state.as_ref(),
                        &self.contract,
                        &self.metrics,
                        function,
                        &args,
                        TxMode::Submit,
                    );

                    if let Err(ref e) = result {
                        if e.kind() == ErrorKind::Infrastructure {
                            tracing::error!(sequence = self.sequence, function = %function, error = %e, "Submit transaction aborted");
                        }
                    }

                    tracing::debug!(
                        sequence = self.sequence,
                        function = %function,
                        ok = result.is_ok(),
                        "Submit transaction processed"
                    );

                    if response.send(result).is_err() {
                        tracing::warn!(function = %function, "Submitter dropped before reply");
                    }
                }
                LedgerMessage::Shutdown => break,
            }
        }

        tracing::info!(transactions = self.sequence, "Ledger actor stopped");
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Submit a transaction and wait for its commit
    pub async fn submit(&self, function: Function, args: Vec<String>) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Submit {
                function,
                args,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    state: Arc<dyn WorldState>,
    contract: DeviceContract,
    metrics: Metrics,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let actor = LedgerActor::new(state, contract, metrics, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryState;

    fn spawn() -> (Arc<MemoryState>, LedgerHandle) {
        let state = Arc::new(MemoryState::new());
        let handle = spawn_ledger_actor(
            state.clone(),
            DeviceContract::new(),
            Metrics::new().unwrap(),
            16,
        );
        (state, handle)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (_state, handle) = spawn();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_submit_commits() {
        let (state, handle) = spawn();

        handle
            .submit(Function::RegisterDevice, vec!["D1".into(), "Active".into()])
            .await
            .unwrap();

        let stored = state.reader().unwrap().get_state("D1").unwrap();
        assert_eq!(stored, Some(br#"{"ID":"D1","Status":"Active"}"#.to_vec()));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_registrations_single_winner() {
        let (_state, handle) = spawn();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .submit(Function::RegisterDevice, vec!["D1".into(), format!("S{}", i)])
                    .await
            }));
        }

        let mut ok = 0;
        let mut exists = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(Error::AlreadyExists(_)) => exists += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(exists, 7);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_after_shutdown() {
        let (_state, handle) = spawn();
        handle.shutdown().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let err = handle.submit(Function::InitLedger, vec![]).await.unwrap_err();
        assert!(matches!(err, Error::Concurrency(_)));
    }
}
