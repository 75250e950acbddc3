//! Command-line interface parsing for the `remember` binary
//!
//! Handles the global store options (`--db`, `--bucket`, `--log-format`) and
//! the `fetch`, `stats` and `purge` subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use http::Uri;
use serde::Serialize;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::logging::LogFormat;
use crate::transport::Response;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The argument is not a URL at all
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// The URL parsed but cannot be fetched
    #[error("Unsupported URL '{0}': expected an absolute http:// or https:// URL")]
    UnsupportedUrl(String),
}

/// Remember - fetch URLs through a persistent response cache
#[derive(Parser, Debug)]
#[command(name = "remember")]
#[command(about = "Fetch URLs through a persistent, never-expiring response cache")]
#[command(version)]
pub struct Cli {
    /// Path of the cache database (defaults to the XDG cache directory)
    #[arg(long, env = "REMEMBER_DB", value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Bucket entries are stored in
    #[arg(long, env = "REMEMBER_BUCKET", value_name = "NAME", global = true)]
    pub bucket: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// GET a URL, answering from the cache when possible, and print the body
    Fetch {
        #[arg(value_parser = parse_url_arg)]
        url: Uri,

        /// Print the status line and headers before the body
        #[arg(short, long)]
        include: bool,

        /// Print a JSON summary of the response instead of the body
        #[arg(long, conflicts_with = "include")]
        meta: bool,
    },
    /// Show how many responses the cache holds
    Stats,
    /// Delete every response in the bucket
    Purge,
}

impl Cli {
    /// Resolves the store location from the flags, falling back to the defaults
    pub fn store_config(&self) -> StoreConfig {
        let mut config = match &self.db {
            Some(path) => StoreConfig::at(path),
            None => StoreConfig::default(),
        };
        if let Some(bucket) = &self.bucket {
            config = config.with_bucket(bucket);
        }
        config
    }
}

/// Parses a URL argument, accepting only absolute http(s) URLs
pub fn parse_url_arg(s: &str) -> Result<Uri, CliError> {
    let uri: Uri = s.parse().map_err(|_| CliError::InvalidUrl(s.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") if uri.host().is_some() => Ok(uri),
        _ => Err(CliError::UnsupportedUrl(s.to_string())),
    }
}

/// JSON summary printed by `fetch --meta`
#[derive(Debug, Serialize)]
pub struct FetchSummary {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub protocol: &'static str,
    pub from_cache: bool,
    pub content_length: Option<u64>,
    pub headers: Vec<(String, String)>,
}

impl FetchSummary {
    pub fn from_response(response: &Response) -> Self {
        Self {
            url: response.request.uri.to_string(),
            status: response.status.as_u16(),
            status_text: response.status_text.clone(),
            protocol: response.protocol().0,
            from_cache: response.from_cache,
            content_length: response.content_length,
            headers: response
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RequestHead;
    use http::{HeaderMap, HeaderValue, Method, StatusCode};

    #[test]
    fn test_parse_url_arg_accepts_http_and_https() {
        assert_eq!(
            parse_url_arg("https://example.test/a").unwrap(),
            Uri::from_static("https://example.test/a")
        );
        assert!(parse_url_arg("http://localhost:8080/").is_ok());
    }

    #[test]
    fn test_parse_url_arg_invalid() {
        let err = parse_url_arg("not a url").unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_parse_url_arg_rejects_relative_and_other_schemes() {
        assert!(matches!(
            parse_url_arg("/just/a/path"),
            Err(CliError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            parse_url_arg("ftp://example.test/file"),
            Err(CliError::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn test_cli_parse_fetch() {
        let cli = Cli::parse_from(["remember", "fetch", "https://example.test/a", "--include"]);
        match cli.command {
            Command::Fetch { url, include, meta } => {
                assert_eq!(url, Uri::from_static("https://example.test/a"));
                assert!(include);
                assert!(!meta);
            }
            other => panic!("expected fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_include_with_meta() {
        let result = Cli::try_parse_from([
            "remember",
            "fetch",
            "https://example.test/a",
            "--include",
            "--meta",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_store_config_from_flags() {
        let cli = Cli::parse_from(["remember", "--db", "/tmp/r.db", "--bucket", "pages", "stats"]);
        let config = cli.store_config();
        assert_eq!(config.path, PathBuf::from("/tmp/r.db"));
        assert_eq!(config.bucket, "pages");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["remember", "purge", "--db", "/tmp/r.db", "--log-format", "json"]);
        assert!(matches!(cli.command, Command::Purge));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/r.db")));
    }

    #[test]
    fn test_fetch_summary_from_response() {
        let head = RequestHead {
            method: Method::GET,
            uri: Uri::from_static("https://example.test/a"),
            headers: HeaderMap::new(),
        };
        let mut response = Response::new(StatusCode::OK, head).with_body("hello");
        response
            .headers
            .insert("content-type", HeaderValue::from_static("text/plain"));
        response.from_cache = true;

        let summary = FetchSummary::from_response(&response);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["status"], 200);
        assert_eq!(json["from_cache"], true);
        assert_eq!(json["protocol"], "HTTP/1.1");
        assert_eq!(json["content_length"], 5);
        assert_eq!(json["headers"][0][0], "content-type");
        assert_eq!(json["headers"][0][1], "text/plain");
    }
}
