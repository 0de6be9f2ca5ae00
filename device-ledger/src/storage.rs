//! World-state storage engines
//!
//! The contract only ever sees the four key/value primitives: point get,
//! range scan, put and delete. Reads go through a [`StateReader`], which is a
//! point-in-time view; writes are collected in a [`WriteSet`] and committed
//! with [`WorldState::apply`] in one atomic step.
//!
//! # Backends
//!
//! - [`RocksState`] - column family `world_state`, snapshot reads, `WriteBatch` commits
//! - [`MemoryState`] - `BTreeMap` behind a `parking_lot::RwLock`
//!
//! Keys are ordered by their UTF-8 bytes in both backends.

use crate::{
    config::RocksDBConfig,
    error::{Error, Result},
    Config,
};
use parking_lot::{RwLock, RwLockReadGuard};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, SnapshotWithThreadMode,
    WriteBatch, WriteOptions, DB,
};
use std::collections::btree_map::{self, BTreeMap};
use std::ops::Bound;
use std::sync::Arc;

/// Column family holding current device records
const CF_WORLD_STATE: &str = "world_state";

/// Ordered `(key, value)` pairs returned by a range scan
pub type KeyValues = Vec<(String, Vec<u8>)>;

/// Point-in-time read view of the world state
pub trait StateReader {
    /// Get the value stored at `key`
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Scan `[start, end)` in key order
    ///
    /// An empty `end` scans to the last key; an empty `start` begins at the first.
    fn get_state_by_range(&self, start: &str, end: &str) -> Result<KeyValues>;
}

/// Storage engine that can hand out readers and commit write sets
pub trait WorldState: Send + Sync + 'static {
    /// Consistent view; no write committed after this call is visible through it
    fn reader(&self) -> Result<Box<dyn StateReader + '_>>;

    /// Commit all writes atomically
    fn apply(&self, writes: &WriteSet) -> Result<()>;
}

/// A single buffered write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Store bytes at the key
    Put(Vec<u8>),
    /// Remove the key
    Delete,
}

/// Writes produced by one transaction, last write per key wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    entries: BTreeMap<String, WriteOp>,
}

impl WriteSet {
    /// Empty write set
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a put
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.insert(key.into(), WriteOp::Put(value));
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: impl Into<String>) {
        self.entries.insert(key.into(), WriteOp::Delete);
    }

    /// Buffered write for `key`, if any
    pub fn get(&self, key: &str) -> Option<&WriteOp> {
        self.entries.get(key)
    }

    /// Buffered writes with keys in `[start, end)`
    pub fn range<'a>(&'a self, start: &'a str, end: &'a str) -> btree_map::Range<'a, String, WriteOp> {
        self.entries.range::<str, _>(range_bounds(start, end))
    }

    /// Number of buffered keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was written
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &WriteOp)> {
        self.entries.iter()
    }
}

/// Range bounds for `[start, end)` where empty `end` means unbounded
///
/// An inverted range collapses to `[start, start)` so `BTreeMap::range` never panics.
pub(crate) fn range_bounds<'a>(start: &'a str, end: &'a str) -> (Bound<&'a str>, Bound<&'a str>) {
    let upper = if end.is_empty() {
        Bound::Unbounded
    } else if end < start {
        Bound::Excluded(start)
    } else {
        Bound::Excluded(end)
    };
    (Bound::Included(start), upper)
}

fn past_end(key: &[u8], end: &str) -> bool {
    !end.is_empty() && key >= end.as_bytes()
}

// In-memory backend

/// Volatile world state
#[derive(Debug, Default)]
pub struct MemoryState {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryReader<'a> {
    guard: RwLockReadGuard<'a, BTreeMap<String, Vec<u8>>>,
}

impl StateReader for MemoryReader<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.guard.get(key).cloned())
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> Result<KeyValues> {
        Ok(self
            .guard
            .range::<str, _>(range_bounds(start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl WorldState for MemoryState {
    fn reader(&self) -> Result<Box<dyn StateReader + '_>> {
        Ok(Box::new(MemoryReader {
            guard: self.entries.read(),
        }))
    }

    fn apply(&self, writes: &WriteSet) -> Result<()> {
        let mut entries = self.entries.write();
        for (key, op) in writes.iter() {
            match op {
                WriteOp::Put(value) => {
                    entries.insert(key.clone(), value.clone());
                }
                WriteOp::Delete => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

// RocksDB backend

/// Persistent world state backed by RocksDB
pub struct RocksState {
    db: Arc<DB>,
    sync_writes: bool,
}

impl RocksState {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let db_opts = Self::db_options(&config.rocksdb);
        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_WORLD_STATE,
            Self::cf_options_world_state(),
        )];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB world state");

        Ok(Self {
            db: Arc::new(db),
            sync_writes: config.rocksdb.sync_writes,
        })
    }

    fn db_options(rocks: &RocksDBConfig) -> Options {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(rocks.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(rocks.max_write_buffer_number);
        db_opts.set_max_background_jobs(rocks.max_background_jobs);

        if rocks.enable_statistics {
            db_opts.enable_statistics();
        }
        db_opts
    }

    fn cf_options_world_state() -> Options {
        let mut opts = Options::default();
        // Point lookups dominate (existence checks), use LZ4 and bloom filters
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self) -> Result<&ColumnFamily> {
        cf_handle(&self.db)
    }
}

fn cf_handle(db: &DB) -> Result<&ColumnFamily> {
    db.cf_handle(CF_WORLD_STATE)
        .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_WORLD_STATE)))
}

struct RocksReader<'a> {
    db: &'a DB,
    snapshot: SnapshotWithThreadMode<'a, DB>,
}

impl StateReader for RocksReader<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = cf_handle(self.db)?;
        Ok(self.snapshot.get_cf(cf, key.as_bytes())?)
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> Result<KeyValues> {
        let cf = cf_handle(self.db)?;
        let iter = self
            .snapshot
            .iterator_cf(cf, IteratorMode::From(start.as_bytes(), Direction::Forward));

        let mut results = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if past_end(&key, end) {
                break;
            }
            let key = String::from_utf8(key.into_vec())
                .map_err(|e| Error::Storage(format!("Non UTF-8 key in world state: {}", e)))?;
            results.push((key, value.into_vec()));
        }
        Ok(results)
    }
}

impl WorldState for RocksState {
    fn reader(&self) -> Result<Box<dyn StateReader + '_>> {
        let db: &DB = &self.db;
        Ok(Box::new(RocksReader {
            db,
            snapshot: db.snapshot(),
        }))
    }

    fn apply(&self, writes: &WriteSet) -> Result<()> {
        let cf = self.cf_handle()?;
        let mut batch = WriteBatch::default();

        for (key, op) in writes.iter() {
            match op {
                WriteOp::Put(value) => batch.put_cf(cf, key.as_bytes(), value),
                WriteOp::Delete => batch.delete_cf(cf, key.as_bytes()),
            }
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);

        // Atomic commit
        self.db.write_opt(batch, &write_opts)?;

        tracing::debug!(writes = writes.len(), "World state committed");
        Ok(())
    }
}
