//! Main ledger orchestration layer
//!
//! This module ties together storage, the contract and the actor into the
//! two invocation paths clients use:
//!
//! - [`Ledger::submit`] - state-mutating, serialized through the actor, committed
//! - [`Ledger::evaluate`] - read-only, runs against a consistent snapshot, never committed
//!
//! # Example
//!
//! ```no_run
//! use device_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> device_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::in_memory()).await?;
//!
//!     ledger.register_device("D1", "Active").await?;
//!     let record = ledger.authenticate_device("D1").await?;
//!     assert_eq!(record, r#"{"ID":"D1","Status":"Active"}"#);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{execute_transaction, spawn_ledger_actor, LedgerHandle},
    config::StorageBackend,
    context::TxMode,
    contract::{DeviceContract, Function},
    error::{Error, Result},
    metrics::Metrics,
    storage::{MemoryState, RocksState, WorldState},
    Config,
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for submit transactions
    handle: LedgerHandle,

    /// Direct world-state access (for evaluate transactions)
    state: Arc<dyn WorldState>,

    /// Contract logic
    contract: DeviceContract,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let state: Arc<dyn WorldState> = match config.backend {
            StorageBackend::RocksDb => Arc::new(RocksState::open(&config)?),
            StorageBackend::Memory => Arc::new(MemoryState::new()),
        };
        tracing::info!(backend = ?config.backend, service = %config.service_name, "Ledger opened");
        Self::with_state(state, config)
    }

    /// Open ledger over an existing world state
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_state(state: Arc<dyn WorldState>, config: Config) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;
        let contract = DeviceContract::new();

        let handle = spawn_ledger_actor(
            state.clone(),
            contract,
            metrics.clone(),
            config.actor.mailbox_capacity,
        );

        Ok(Self {
            handle,
            state,
            contract,
            metrics,
            config,
        })
    }

    /// Submit a state-mutating transaction by name
    pub async fn submit(&self, function: &str, args: &[&str]) -> Result<Vec<u8>> {
        let function: Function = function.parse()?;
        tracing::info!(function = %function, "Submit transaction");
        self.handle.submit(function, to_owned_args(args)).await
    }

    /// Evaluate a read-only transaction by name
    pub async fn evaluate(&self, function: &str, args: &[&str]) -> Result<Vec<u8>> {
        let function: Function = function.parse()?;
        tracing::info!(function = %function, "Evaluate transaction");

        // Snapshot reads block on RocksDB, keep them off the async workers
        let state = self.state.clone();
        let contract = self.contract;
        let metrics = self.metrics.clone();
        let args = to_owned_args(args);
        tokio::task::spawn_blocking(move || {
            execute_transaction(
                state.as_ref(),
                &contract,
                &metrics,
                function,
                &args,
                TxMode::Evaluate,
            )
        })
        .await
        .map_err(|e| Error::Concurrency(format!("Evaluate task failed: {}", e)))?
    }

    /// Write the initialization placeholder
    pub async fn init_ledger(&self) -> Result<()> {
        self.submit(Function::InitLedger.name(), &[]).await?;
        Ok(())
    }

    /// Register a new device; returns its encoded record
    pub async fn register_device(&self, id: &str, status: &str) -> Result<String> {
        let out = self.submit(Function::RegisterDevice.name(), &[id, status]).await?;
        into_text(out)
    }

    /// Overwrite a device record
    pub async fn update_device(&self, id: &str, status: &str) -> Result<()> {
        self.submit(Function::UpdateDevice.name(), &[id, status]).await?;
        Ok(())
    }

    /// Stored record of an active device
    pub async fn authenticate_device(&self, id: &str) -> Result<String> {
        let out = self.evaluate(Function::AuthenticateDevice.name(), &[id]).await?;
        into_text(out)
    }

    /// Remove a device
    pub async fn delete_device(&self, id: &str) -> Result<()> {
        self.submit(Function::DeleteDevice.name(), &[id]).await?;
        Ok(())
    }

    /// Canonical JSON array of every stored value
    pub async fn list_all_devices_raw(&self) -> Result<String> {
        let out = self.evaluate(Function::ListAllDevices.name(), &[]).await?;
        into_text(out)
    }

    /// Every stored value, decoded
    pub async fn list_all_devices(&self) -> Result<Vec<Value>> {
        let out = self.evaluate(Function::ListAllDevices.name(), &[]).await?;
        Ok(serde_json::from_slice(&out)?)
    }

    /// True iff a non-empty value is stored at `id`
    pub async fn device_exists(&self, id: &str) -> Result<bool> {
        let out = self.evaluate(Function::DeviceExists.name(), &[id]).await?;
        Ok(out == b"true")
    }

    /// SHA-256 over every `(key, value)` pair in key order, hex encoded
    ///
    /// Replicas that applied the same writes report the same digest.
    /// Scans the whole world state; async callers should run it on a
    /// blocking thread.
    pub fn state_digest(&self) -> Result<String> {
        let reader = self.state.reader()?;
        let mut hasher = Sha256::new();

        for (key, value) in reader.get_state_by_range("", "")? {
            hasher.update((key.len() as u64).to_be_bytes());
            hasher.update(key.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(&value);
        }

        Ok(hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect())
    }

    /// Prometheus metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }
}

fn to_owned_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn into_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| Error::Storage(format!("Stored value is not UTF-8: {}", e)))
}
