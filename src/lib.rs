//! Remember: a transparent, persistent response cache for HTTP clients
//!
//! Wrap any [`Transport`] in a [`CachingTransport`] and every response it
//! fetches is written to an embedded store keyed by the request target. Later
//! requests for the same target are answered from the store without touching
//! the network.
//!
//! ```no_run
//! use std::sync::Arc;
//! use remember::{CachingTransport, Store, StoreConfig, Transport};
//!
//! # async fn run() -> remember::Result<()> {
//! let store = Arc::new(Store::open(&StoreConfig::default())?);
//! let transport = CachingTransport::new(store)?;
//! let request = http::Request::get("https://example.test/").body(bytes::Bytes::new()).unwrap();
//! let response = transport.execute(request).await?;
//! println!("{}", response.text().await?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod transport;

pub use cache::{CacheKey, CachedResponse, Store};
pub use config::StoreConfig;
pub use error::{DecodeError, Error, Result};
pub use transport::{Body, CachingTransport, Request, RequestHead, ReqwestTransport, Response, Transport};
