//! Cache keys derived from request targets

use std::fmt;

use http::Uri;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::Request;

/// Canonical byte form of a request's target locator
///
/// The key is the serialization `url` produces for the target, so every
/// component that serialization keeps (scheme, credentials, host, port,
/// path, query) is part of the key, and equivalent spellings such as an
/// uppercase host or an explicit default port collapse onto one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<u8>);

impl CacheKey {
    /// Derives the key for `uri`; relative and authority-form targets have no
    /// canonical form
    pub fn from_uri(uri: &Uri) -> Result<Self> {
        let raw = uri.to_string();
        // "host:port" would otherwise parse with "host" as its scheme.
        if uri.scheme().is_none() {
            return Err(Error::KeyDerivation {
                uri: raw,
                source: url::ParseError::RelativeUrlWithoutBase,
            });
        }
        let url = Url::parse(&raw).map_err(|source| Error::KeyDerivation { uri: raw, source })?;
        Ok(Self(url.as_str().as_bytes().to_vec()))
    }

    pub fn for_request(request: &Request) -> Result<Self> {
        Self::from_uri(request.uri())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CacheKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(uri: &'static str) -> CacheKey {
        CacheKey::from_uri(&Uri::from_static(uri)).expect("Key derivation should succeed")
    }

    #[test]
    fn test_identical_locators_give_identical_keys() {
        assert_eq!(
            key("https://example.test/a?x=1").as_bytes(),
            key("https://example.test/a?x=1").as_bytes()
        );
    }

    #[test]
    fn test_differing_path_or_query_give_different_keys() {
        assert_ne!(key("https://example.test/a"), key("https://example.test/b"));
        assert_ne!(key("https://example.test/a?x=1"), key("https://example.test/a?x=2"));
        assert_ne!(key("https://example.test/a"), key("http://example.test/a"));
        assert_ne!(key("https://example.test:8443/a"), key("https://example.test/a"));
    }

    #[test]
    fn test_key_is_canonical_serialization() {
        assert_eq!(key("https://EXAMPLE.test:443/a").to_string(), "https://example.test/a");
        assert_eq!(key("https://example.test").to_string(), "https://example.test/");
    }

    #[test]
    fn test_relative_target_fails() {
        let result = CacheKey::from_uri(&Uri::from_static("/only/a/path"));

        match result {
            Err(Error::KeyDerivation { uri, .. }) => assert_eq!(uri, "/only/a/path"),
            other => panic!("expected key derivation error, got {:?}", other),
        }
    }

    #[test]
    fn test_authority_form_target_fails() {
        let result = CacheKey::from_uri(&Uri::from_static("example.test:443"));

        assert!(matches!(result, Err(Error::KeyDerivation { .. })));
    }

    #[test]
    fn test_for_request_uses_target() {
        let request = http::Request::get("https://example.test/a")
            .body(bytes::Bytes::new())
            .unwrap();

        assert_eq!(CacheKey::for_request(&request).unwrap(), key("https://example.test/a"));
    }
}
