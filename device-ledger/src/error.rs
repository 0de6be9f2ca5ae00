//! Error types for the device ledger

use std::fmt;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// The first three variants are the business-rule failures raised by the
/// contract. Their messages are relayed verbatim to gateway clients.
#[derive(Error, Debug)]
pub enum Error {
    /// Registration attempted for an ID already present
    #[error("The device {0} already exists")]
    AlreadyExists(String),

    /// Update, authenticate or delete attempted for an absent ID
    #[error("The device {0} does not exist")]
    NotFound(String),

    /// Authentication attempted against an `Inactive` device
    #[error("The device {0} is blacklisted")]
    Blacklisted(String),

    /// Bad positional arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No contract function with this name
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Write attempted on the evaluate path
    #[error("Read-only transaction cannot write key {0:?}")]
    ReadOnlyTransaction(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tag for each error variant, used for status mapping and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::AlreadyExists`]
    AlreadyExists,
    /// See [`Error::NotFound`]
    NotFound,
    /// See [`Error::Blacklisted`]
    Blacklisted,
    /// See [`Error::InvalidArgument`] and [`Error::UnknownFunction`]
    InvalidArgument,
    /// See [`Error::ReadOnlyTransaction`]
    ReadOnly,
    /// See [`Error::Serialization`]
    Decode,
    /// Storage, IO, config and concurrency failures
    Infrastructure,
}

impl ErrorKind {
    /// Stable label
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Blacklisted => "blacklisted",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::ReadOnly => "read_only",
            ErrorKind::Decode => "decode",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Blacklisted(_) => ErrorKind::Blacklisted,
            Error::InvalidArgument(_) | Error::UnknownFunction(_) => ErrorKind::InvalidArgument,
            Error::ReadOnlyTransaction(_) => ErrorKind::ReadOnly,
            Error::Serialization(_) => ErrorKind::Decode,
            Error::Storage(_) | Error::Concurrency(_) | Error::Config(_) | Error::Io(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
