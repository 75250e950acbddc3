//! Network transport backed by `reqwest`

use async_trait::async_trait;
use futures::TryStreamExt;
use http::header::TRANSFER_ENCODING;
use http::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::Client;

use super::{Body, Request, RequestHead, Response, Transport};
use crate::error::{Error, Result};

/// Executes requests over the network with a `reqwest::Client`
///
/// This is the upstream a `CachingTransport` uses when none is supplied. Like
/// a bare connection-level transport it returns redirects as they are, so the
/// client above the cache applies its own redirect policy.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// HTTP client for making requests
    http_client: Client,
}

impl ReqwestTransport {
    /// Creates a transport whose client never follows redirects
    pub fn new() -> Result<Self> {
        let http_client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { http_client })
    }

    /// Creates a transport around an existing, preconfigured client
    ///
    /// A client that follows redirects changes what gets cached: the final
    /// response of the chain is stored under the first request's target.
    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let head = RequestHead::of(&request);
        let request = reqwest::Request::try_from(request)?;
        let upstream = self.http_client.execute(request).await?;

        let mut response = Response::new(upstream.status(), head);
        response.version = upstream.version();
        response.headers = upstream.headers().clone();
        response.transfer_encoding = transfer_codings(upstream.headers());
        response.content_length = upstream.content_length();

        let chunks = upstream.bytes_stream().map_err(Error::from);
        Ok(response.with_body(Body::from_stream(chunks)))
    }
}

/// Lists the codings named by every `Transfer-Encoding` header, in order
fn transfer_codings(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|coding| coding.trim().to_ascii_lowercase())
        .filter(|coding| !coding.is_empty())
        .collect()
}
