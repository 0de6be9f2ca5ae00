//! Device Registry Ledger
//!
//! Key/value world state with a device-registry contract on top.
//!
//! # Architecture
//!
//! - **Contract**: deterministic create/update/authenticate/delete/list rules
//! - **Single Writer**: one actor task serializes every submit transaction
//! - **Snapshot Reads**: evaluate transactions never wait for the writer
//! - **Canonical Encoding**: key-sorted compact JSON for every stored value
//!
//! # Invariants
//!
//! - A device ID is present iff a non-empty value is stored under it
//! - Same writes → byte-identical world state on every replica
//! - A failed transaction commits nothing
//! - Evaluate transactions never write

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all
)]

pub mod types;
pub mod canonical;
pub mod storage;
pub mod context;
pub mod contract;
pub mod error;
pub mod actor;
pub mod ledger;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, ErrorKind, Result};
pub use types::{DeviceRecord, BLACKLISTED_STATUS, DOC_TYPE_DEVICE};
pub use storage::{MemoryState, RocksState, StateReader, WorldState, WriteSet};
pub use context::{TxContext, TxMode};
pub use contract::{DeviceContract, Function};
pub use ledger::Ledger;
pub use config::{Config, StorageBackend};
pub use metrics::Metrics;
