//! Transport that remembers every response it has seen
//!
//! On each request the target's [`CacheKey`] is looked up in the [`Store`].
//! A hit is decoded and replayed without touching the network. A miss is
//! delegated to the upstream transport, drained, persisted and returned.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;
use tracing::debug;

use super::{Request, ReqwestTransport, Response, Transport};
use crate::cache::{codec, CacheKey, CachedResponse, Store};
use crate::error::Result;

/// Persistent, never-expiring cache in front of an upstream [`Transport`]
///
/// Concurrent misses for the same key are not coalesced: each calls upstream
/// and the last write wins.
#[derive(Debug)]
pub struct CachingTransport<T = ReqwestTransport> {
    store: Arc<Store>,
    upstream: T,
}

impl CachingTransport<ReqwestTransport> {
    /// Wraps the default network transport
    pub fn new(store: Arc<Store>) -> Result<Self> {
        Ok(Self::with_upstream(store, ReqwestTransport::new()?))
    }
}

impl<T: Transport> CachingTransport<T> {
    pub fn with_upstream(store: Arc<Store>, upstream: T) -> Self {
        Self { store, upstream }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn upstream(&self) -> &T {
        &self.upstream
    }

    /// Returns the stored response for `key`, or `None` on a miss
    ///
    /// A stored entry that fails to decode is an error, not a miss.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>> {
        let store = Arc::clone(&self.store);
        let lookup_key = key.as_bytes().to_vec();
        let found = task::spawn_blocking(move || store.get(&lookup_key)).await??;
        let Some(bytes) = found else {
            debug!(%key, "not found in cache");
            return Ok(None);
        };
        let mut response = codec::decode(&bytes)?.into_response()?;
        response.from_cache = true;
        Ok(Some(response))
    }

    /// Drains `response`, persists it under `key` and hands it back replayable
    async fn remember(&self, key: &CacheKey, mut response: Response) -> Result<Response> {
        let body = response.buffer().await?;
        let record = CachedResponse::capture(&response, &body);
        let bytes = codec::encode(&record)?;
        let store = Arc::clone(&self.store);
        let store_key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.put(&store_key, &bytes)).await??;
        debug!(%key, status = %response.status, size = body.len(), "stored response");
        Ok(response)
    }
}

#[async_trait]
impl<T: Transport> Transport for CachingTransport<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        let key = CacheKey::for_request(&request)?;

        if let Some(response) = self.lookup(&key).await? {
            debug!(%key, "serving from cache");
            return Ok(response);
        }

        debug!(%key, "cache miss, using upstream transport");
        let response = self.upstream.execute(request).await?;
        self.remember(&key, response).await
    }
}
