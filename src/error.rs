//! Error types shared by the store, the codec and the transports

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by any stage of a cached request
///
/// Every stage reports to the immediate caller. Nothing is retried and
/// nothing is logged and then dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// The cache directory or file could not be prepared
    #[error("unable to prepare cache location {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing store could not be opened or initialised
    #[error("unable to open cache store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The request target has no canonical absolute form
    #[error("cannot derive cache key from `{uri}`: {source}")]
    KeyDerivation {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// A read transaction failed during lookup
    #[error("cache lookup failed: {0}")]
    StoreRead(#[source] rusqlite::Error),

    /// A write transaction failed while persisting a response
    #[error("unable to store response: {0}")]
    StoreWrite(#[source] rusqlite::Error),

    /// Stored bytes do not form a valid record
    #[error("unable to decode cached response: {0}")]
    Decode(#[from] DecodeError),

    /// A blocking store task panicked or was cancelled
    #[error("cache store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A captured response could not be encoded
    #[error("unable to encode cached response: {0}")]
    Encode(#[source] bincode::Error),

    /// The HTTP client failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other upstream transport failure
    #[error("upstream transport failed: {0}")]
    Upstream(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an arbitrary failure from a custom upstream transport
    pub fn upstream<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Upstream(err.into())
    }
}

/// Reasons a stored record fails to decode
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record is empty")]
    Empty,

    #[error("unsupported record version {0}")]
    UnsupportedVersion(u8),

    #[error("malformed record: {0}")]
    Malformed(#[source] bincode::Error),

    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("unknown protocol {proto} ({major}.{minor})")]
    UnknownProtocol { proto: String, major: u8, minor: u8 },

    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    #[error("invalid request in record: {0}")]
    InvalidRequest(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
