//! Transport capability and the request/response types it moves
//!
//! A [`Transport`] turns a [`Request`] into a [`Response`] or fails. The
//! network-backed [`ReqwestTransport`] and the persistent
//! [`CachingTransport`] both implement it, so code holding "a transport" can
//! hold either.

mod caching;
mod upstream;

pub use caching::CachingTransport;
pub use upstream::ReqwestTransport;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use http::{HeaderMap, Method, StatusCode, Uri, Version};

use crate::error::Result;

/// An outbound request; the body is sent as-is
pub type Request = http::Request<Bytes>;

/// Executes requests
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }
}

/// The parts of the originating request a response keeps a reference to
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn of(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        }
    }
}

/// A response body, either still streaming from upstream or fully buffered
///
/// Buffered bodies are replayable: cloning the underlying `Bytes` is cheap
/// and every clone reads from the start.
pub struct Body {
    inner: Inner,
}

enum Inner {
    Full(Bytes),
    Streaming(BoxStream<'static, Result<Bytes>>),
}

impl Body {
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    /// Wraps a stream of chunks
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Inner::Streaming(stream.boxed()),
        }
    }

    /// Returns the buffered content, or `None` while the body is still a stream
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.inner {
            Inner::Full(bytes) => Some(bytes),
            Inner::Streaming(_) => None,
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.inner, Inner::Full(_))
    }

    /// Reads the whole body into memory
    pub async fn collect(self) -> Result<Bytes> {
        match self.inner {
            Inner::Full(bytes) => Ok(bytes),
            Inner::Streaming(mut chunks) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = chunks.try_next().await? {
                    buf.extend_from_slice(&chunk);
                }
                Ok(buf.freeze())
            }
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        match self.inner {
            Inner::Full(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Inner::Streaming(chunks) => chunks,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            inner: Inner::Full(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Inner::Streaming(_) => f.write_str("Body::Streaming"),
        }
    }
}

/// A response as produced by a [`Transport`]
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    /// Reason phrase sent with the status, e.g. `"OK"`
    pub status_text: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub trailers: HeaderMap,
    /// Transfer codings applied by the sender, outermost last
    pub transfer_encoding: Vec<String>,
    pub content_length: Option<u64>,
    /// Set when the body is already decoded and any content or transfer
    /// encodings are informational only
    pub uncompressed: bool,
    /// Set when the response was replayed from the store
    pub from_cache: bool,
    pub request: RequestHead,
    body: Body,
}

impl Response {
    /// Creates an empty HTTP/1.1 response to `request`
    pub fn new(status: StatusCode, request: RequestHead) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            trailers: HeaderMap::new(),
            transfer_encoding: Vec::new(),
            content_length: None,
            uncompressed: false,
            from_cache: false,
            request,
            body: Body::empty(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        if let Some(bytes) = self.body.as_bytes() {
            self.content_length = Some(bytes.len() as u64);
        }
        self
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Protocol name and version numbers, e.g. `("HTTP/1.1", 1, 1)`
    pub fn protocol(&self) -> (&'static str, u8, u8) {
        protocol(self.version)
    }

    /// Drains the body into memory and replaces it with a replayable copy
    ///
    /// Returns the drained bytes. Calling it on a buffered body is free.
    pub async fn buffer(&mut self) -> Result<Bytes> {
        let body = std::mem::take(&mut self.body);
        let bytes = body.collect().await?;
        self.body = Body::from(bytes.clone());
        Ok(bytes)
    }

    /// Consumes the response and returns its whole body
    pub async fn bytes(self) -> Result<Bytes> {
        self.body.collect().await
    }

    /// Consumes the response and returns its body as text, replacing invalid UTF-8
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub(crate) fn protocol(version: Version) -> (&'static str, u8, u8) {
    match version {
        Version::HTTP_09 => ("HTTP/0.9", 0, 9),
        Version::HTTP_10 => ("HTTP/1.0", 1, 0),
        Version::HTTP_2 => ("HTTP/2.0", 2, 0),
        Version::HTTP_3 => ("HTTP/3.0", 3, 0),
        _ => ("HTTP/1.1", 1, 1),
    }
}

pub(crate) fn version_from_parts(major: u8, minor: u8) -> Option<Version> {
    match (major, minor) {
        (0, 9) => Some(Version::HTTP_09),
        (1, 0) => Some(Version::HTTP_10),
        (1, 1) => Some(Version::HTTP_11),
        (2, 0) => Some(Version::HTTP_2),
        (3, 0) => Some(Version::HTTP_3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn head() -> RequestHead {
        RequestHead {
            method: Method::GET,
            uri: Uri::from_static("https://example.test/a"),
            headers: HeaderMap::new(),
        }
    }

    #[tokio::test]
    async fn test_buffer_replaces_stream_with_replayable_bytes() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"hel")),
            Ok(Bytes::from_static(b"lo")),
        ]);
        let mut response = Response::new(StatusCode::OK, head()).with_body(Body::from_stream(chunks));
        assert!(!response.body().is_buffered());

        let drained = response.buffer().await.expect("Buffering should succeed");

        assert_eq!(drained, Bytes::from_static(b"hello"));
        assert_eq!(response.body().as_bytes(), Some(&drained));
        assert_eq!(response.text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_collect_propagates_stream_errors() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(Error::upstream("connection reset")),
        ]);

        let result = Body::from_stream(chunks).collect().await;

        assert!(matches!(result, Err(Error::Upstream(_))));
    }

    #[test]
    fn test_new_response_defaults() {
        let response = Response::new(StatusCode::NOT_FOUND, head()).with_body("missing");

        assert_eq!(response.status_text, "Not Found");
        assert_eq!(response.protocol(), ("HTTP/1.1", 1, 1));
        assert_eq!(response.content_length, Some(7));
        assert!(!response.from_cache);
    }

    #[test]
    fn test_protocol_parts_invert() {
        for version in [
            Version::HTTP_09,
            Version::HTTP_10,
            Version::HTTP_11,
            Version::HTTP_2,
            Version::HTTP_3,
        ] {
            let (_, major, minor) = protocol(version);
            assert_eq!(version_from_parts(major, minor), Some(version));
        }
        assert_eq!(version_from_parts(4, 2), None);
    }
}
