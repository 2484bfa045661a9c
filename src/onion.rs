//! Hidden-service URL validation and fingerprinting
//!
//! Only URLs whose host lives under the `.onion` pseudo-TLD are eligible for
//! scheduling. Every accepted URL is reduced to a [`Fingerprint`], the exact-match
//! key used when asking the resource index whether the URL was already crawled.
//!
//! # Normalization
//!
//! The fingerprint is computed over the WHATWG serialization produced by the
//! `url` crate:
//!
//! - scheme and host are lowercased
//! - default ports (`:80`, `:443`) are dropped
//! - an empty path becomes `/`
//! - percent-encoding is normalized
//! - the fragment is removed (it never reaches the server)
//!
//! Trailing slashes on non-empty paths and the order of query parameters are
//! preserved: `/a` and `/a/` are distinct resources, as are `?x=1&y=2` and
//! `?y=2&x=1`.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use std::fmt;
use url::Url;

use crate::utils::error::ParseError;

/// Suffix marking a hidden-service host
pub const ONION_SUFFIX: &str = ".onion";

/// A syntactically valid URL pointing at a hidden service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnionUrl {
    inner: Url,
}

impl OnionUrl {
    /// Parse and validate a raw URL string
    ///
    /// # Errors
    ///
    /// - [`ParseError::InvalidUrl`] if the string is not an absolute URL
    /// - [`ParseError::UnsupportedScheme`] for anything but http/https
    /// - [`ParseError::NotHiddenService`] if the host is not a `.onion` host
    ///
    /// # Examples
    ///
    /// ```
    /// use hsched::onion::OnionUrl;
    ///
    /// assert!(OnionUrl::parse("http://example.onion/page").is_ok());
    /// assert!(OnionUrl::parse("http://example.com/page").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mut parsed =
            Url::parse(raw.trim()).map_err(|e| ParseError::InvalidUrl(e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(ParseError::UnsupportedScheme(other.to_string())),
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| ParseError::InvalidUrl(format!("no host in {raw}")))?;

        if !is_onion_host(host) {
            return Err(ParseError::NotHiddenService(host.to_string()));
        }

        parsed.set_fragment(None);

        Ok(Self { inner: parsed })
    }

    /// Host part of the URL
    pub fn host(&self) -> &str {
        self.inner.host_str().unwrap_or_default()
    }

    /// Normalized serialization
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    /// Compute the index fingerprint of this URL
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

impl fmt::Display for OnionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether a host belongs to a hidden service
///
/// Accepts the bare suffix as the last label (`abc.onion`) as well as
/// `.onion` hosts written with a trailing root dot (`abc.onion.`).
pub fn is_onion_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host.len() > ONION_SUFFIX.len() && host.ends_with(ONION_SUFFIX)
}

/// Exact-match index key of a normalized URL
///
/// URL-safe base64 (padded) of the normalized serialization. The encoding is
/// reversible, see [`Fingerprint::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a validated URL
    pub fn of(url: &OnionUrl) -> Self {
        Self(URL_SAFE.encode(url.as_str().as_bytes()))
    }

    /// Wrap an already-encoded fingerprint
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encoded form, as sent to the index
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the normalized URL string
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidFingerprint`] if the value is not valid
    /// URL-safe base64 or does not decode to UTF-8.
    pub fn decode(&self) -> Result<String, ParseError> {
        let bytes = URL_SAFE
            .decode(self.0.as_bytes())
            .map_err(|e| ParseError::InvalidFingerprint(e.to_string()))?;

        String::from_utf8(bytes).map_err(|e| ParseError::InvalidFingerprint(e.to_string()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
