//! Per-transaction stub over the world state
//!
//! A [`TxContext`] wraps one consistent [`StateReader`] and buffers every
//! write in a [`WriteSet`]. Reads observe the transaction's own earlier
//! writes. Nothing reaches storage until the caller commits the write set
//! returned by [`TxContext::into_write_set`].

use crate::{
    error::{Error, Result},
    storage::{KeyValues, StateReader, WriteOp, WriteSet},
};
use std::collections::BTreeMap;
use std::fmt;

/// Which path a transaction runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// State-mutating, committed through the single writer
    Submit,
    /// Read-only query, never committed
    Evaluate,
}

impl TxMode {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            TxMode::Submit => "submit",
            TxMode::Evaluate => "evaluate",
        }
    }
}

impl fmt::Display for TxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction context handed to contract functions
pub struct TxContext<'a> {
    reader: Box<dyn StateReader + 'a>,
    writes: WriteSet,
    mode: TxMode,
}

impl<'a> TxContext<'a> {
    /// Start a transaction over `reader`
    pub fn new(reader: Box<dyn StateReader + 'a>, mode: TxMode) -> Self {
        Self {
            reader,
            writes: WriteSet::new(),
            mode,
        }
    }

    /// Transaction mode
    pub fn mode(&self) -> TxMode {
        self.mode
    }

    /// Read a key, seeing this transaction's own writes first
    pub fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(WriteOp::Put(value)) => Ok(Some(value.clone())),
            Some(WriteOp::Delete) => Ok(None),
            None => self.reader.get_state(key),
        }
    }

    /// Buffer a put
    pub fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.ensure_writable(key)?;
        self.writes.put(key, value);
        Ok(())
    }

    /// Buffer a delete
    pub fn delete_state(&mut self, key: &str) -> Result<()> {
        self.ensure_writable(key)?;
        self.writes.delete(key);
        Ok(())
    }

    /// Range scan `[start, end)` merged with buffered writes
    pub fn get_state_by_range(&self, start: &str, end: &str) -> Result<KeyValues> {
        let committed = self.reader.get_state_by_range(start, end)?;
        if self.writes.is_empty() {
            return Ok(committed);
        }

        let mut merged: BTreeMap<String, Vec<u8>> = committed.into_iter().collect();
        for (key, op) in self.writes.range(start, end) {
            match op {
                WriteOp::Put(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                WriteOp::Delete => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Finish the transaction, releasing the reader
    pub fn into_write_set(self) -> WriteSet {
        self.writes
    }

    fn ensure_writable(&self, key: &str) -> Result<()> {
        match self.mode {
            TxMode::Submit => Ok(()),
            TxMode::Evaluate => Err(Error::ReadOnlyTransaction(key.to_string())),
        }
    }
}
