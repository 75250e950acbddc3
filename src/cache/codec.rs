//! Record format for cached responses
//!
//! A record is one schema version byte followed by the `bincode` encoding of
//! [`CachedResponse`]. The version byte lets a later format refuse old
//! records instead of misreading them.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Error, Result};
use crate::transport::{version_from_parts, RequestHead, Response};

/// Version byte written in front of every record
pub const RECORD_VERSION: u8 = 1;

/// A single header line; values are raw bytes since HTTP allows non-UTF-8
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderField {
    pub name: String,
    pub value: Vec<u8>,
}

/// The request a cached response answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<HeaderField>,
}

/// Everything needed to replay a response as if freshly fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status_text: String,
    pub status_code: u16,
    pub proto: String,
    pub proto_major: u8,
    pub proto_minor: u8,
    pub headers: Vec<HeaderField>,
    pub trailers: Vec<HeaderField>,
    pub transfer_encoding: Vec<String>,
    pub body: Vec<u8>,
    pub request: CachedRequest,
    /// When the entry was captured; informational, never used for freshness
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Snapshots `response` together with its fully drained `body`
    pub fn capture(response: &Response, body: &Bytes) -> Self {
        let (proto, proto_major, proto_minor) = response.protocol();
        Self {
            status_text: response.status_text.clone(),
            status_code: response.status.as_u16(),
            proto: proto.to_string(),
            proto_major,
            proto_minor,
            headers: fields(&response.headers),
            trailers: fields(&response.trailers),
            transfer_encoding: response.transfer_encoding.clone(),
            body: body.to_vec(),
            request: CachedRequest {
                method: response.request.method.to_string(),
                url: response.request.uri.to_string(),
                headers: fields(&response.request.headers),
            },
            stored_at: Utc::now(),
        }
    }

    /// Rebuilds a response whose body is a fresh in-memory copy
    ///
    /// The body is stored decoded, so the result is marked `uncompressed` and
    /// its content length is the stored body's length.
    pub fn into_response(self) -> Result<Response, DecodeError> {
        let status = StatusCode::from_u16(self.status_code)
            .map_err(|_| DecodeError::InvalidStatus(self.status_code))?;
        let version = version_from_parts(self.proto_major, self.proto_minor).ok_or_else(|| {
            DecodeError::UnknownProtocol {
                proto: self.proto.clone(),
                major: self.proto_major,
                minor: self.proto_minor,
            }
        })?;
        let request = RequestHead {
            method: Method::from_bytes(self.request.method.as_bytes())
                .map_err(|_| DecodeError::InvalidRequest(self.request.method.clone()))?,
            uri: self
                .request
                .url
                .parse::<Uri>()
                .map_err(|_| DecodeError::InvalidRequest(self.request.url.clone()))?,
            headers: header_map(&self.request.headers)?,
        };

        let mut response = Response::new(status, request).with_body(self.body);
        response.status_text = self.status_text;
        response.version = version;
        response.headers = header_map(&self.headers)?;
        response.trailers = header_map(&self.trailers)?;
        response.transfer_encoding = self.transfer_encoding;
        response.uncompressed = true;
        Ok(response)
    }
}

/// Serializes a record, prefixed with [`RECORD_VERSION`]
pub fn encode(record: &CachedResponse) -> Result<Vec<u8>> {
    let mut out = vec![RECORD_VERSION];
    bincode::serialize_into(&mut out, record).map_err(Error::Encode)?;
    Ok(out)
}

/// Parses a record produced by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<CachedResponse, DecodeError> {
    let (&version, payload) = bytes.split_first().ok_or(DecodeError::Empty)?;
    if version != RECORD_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    bincode::deserialize(payload).map_err(DecodeError::Malformed)
}

fn fields(headers: &HeaderMap) -> Vec<HeaderField> {
    headers
        .iter()
        .map(|(name, value)| HeaderField {
            name: name.as_str().to_string(),
            value: value.as_bytes().to_vec(),
        })
        .collect()
}

fn header_map(fields: &[HeaderField]) -> Result<HeaderMap, DecodeError> {
    let mut headers = HeaderMap::with_capacity(fields.len());
    for field in fields {
        let name = HeaderName::from_bytes(field.name.as_bytes())
            .map_err(|_| DecodeError::InvalidHeader(field.name.clone()))?;
        let value = HeaderValue::from_bytes(&field.value)
            .map_err(|_| DecodeError::InvalidHeader(field.name.clone()))?;
        headers.append(name, value);
    }
    Ok(headers)
}
