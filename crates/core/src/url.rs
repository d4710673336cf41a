//! Validated source URLs.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Why an inbound URL was rejected at the ingest boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("url is not syntactically valid: {0}")]
    Malformed(String),

    #[error("unsupported scheme `{0}`: only http and https sources are fetched")]
    UnsupportedScheme(String),
}

/// An absolute `http`/`https` URL accepted for fetching.
///
/// Validation happens exactly once, at ingest; everything downstream of the
/// queue relies on the invariant and never re-checks. Non-web schemes
/// (`file`, `ftp`, `data`, ...) are rejected here so the worker can never be
/// pointed at local or internal resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceUrl(Url);

impl SourceUrl {
    /// Parse and validate a raw URL string.
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let url = Url::parse(raw.trim()).map_err(|e| UrlError::Malformed(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(UrlError::UnsupportedScheme(other.to_string())),
        }

        // `Url` never yields a hostless http/https URL; spellings like
        // "http://" already fail to parse above.
        Ok(Self(url))
    }

    /// The normalized textual form.
    ///
    /// `Url` parsing already lowercases the scheme and host and drops default
    /// ports, so two spellings of the same source compare equal here. Key
    /// derivation hashes exactly this string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(SourceUrl::parse("http://example.com/image.jpg").is_ok());
        assert!(SourceUrl::parse("https://example.com/a/b?c=d").is_ok());
    }

    #[test]
    fn rejects_non_web_schemes() {
        for raw in [
            "file:///etc/passwd",
            "ftp://example.com/pub/file",
            "data:text/plain,hello",
            "javascript:alert(1)",
        ] {
            let err = SourceUrl::parse(raw).unwrap_err();
            assert!(matches!(err, UrlError::UnsupportedScheme(_)), "{raw} gave {err:?}");
        }
    }

    #[test]
    fn rejects_malformed_and_relative() {
        // "http://" lands here too: for web schemes the parser itself
        // refuses an empty host.
        for raw in ["", "not a url", "/relative/path", "example.com/no-scheme", "http://"] {
            let err = SourceUrl::parse(raw).unwrap_err();
            assert!(matches!(err, UrlError::Malformed(_)), "{raw:?} gave {err:?}");
        }
    }

    #[test]
    fn normalizes_host_case_and_default_port() {
        let a = SourceUrl::parse("HTTP://Example.COM:80/x").unwrap();
        let b = SourceUrl::parse("http://example.com/x").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "http://example.com/x");
    }

    #[test]
    fn serializes_as_plain_string() {
        let url = SourceUrl::parse("https://example.com/cat.png").unwrap();
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, "\"https://example.com/cat.png\"");
    }
}
