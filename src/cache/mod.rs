//! Persistence layer for remembered responses
//!
//! This module provides the durable key-value [`Store`], the [`CacheKey`]
//! derived from a request target, and the versioned record [`codec`] that
//! turns a drained response into bytes and back. Entries never expire: once
//! a response is stored it is replayed for its key until the store is purged
//! or its file deleted.

pub mod codec;
mod key;
mod store;

pub use codec::{CachedRequest, CachedResponse, HeaderField};
pub use key::CacheKey;
pub use store::Store;
